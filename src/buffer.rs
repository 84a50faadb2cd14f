//! Encoded output owned by the caller.

use std::ops::Deref;

use crate::error::{Error, Result};

/// A freshly allocated encoded image whose ownership passes to the caller.
///
/// Dropping the buffer (or passing it to [`crate::api::free_buffer`]) releases it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer(Box<[u8]>);

impl OutputBuffer {
    /// Copy `bytes` into a new allocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the memory cannot be reserved.
    pub fn copy_from(bytes: &[u8]) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|_| Error::Allocation { size: bytes.len() })?;
        data.extend_from_slice(bytes);

        Ok(Self(data.into_boxed_slice()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_boxed_slice(self) -> Box<[u8]> {
        self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_vec()
    }
}

impl Deref for OutputBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for OutputBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
