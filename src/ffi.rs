//! C ABI exports.
//!
//! Handles and output buffers are allocated by this library and must be released
//! with [`colornet_release_model`] and [`colornet_free_buffer`]. Unloading a handle
//! only drops its graph, so inference through an unloaded handle returns null.
//! Failures return null and are reported through `tracing`.
#![allow(unsafe_code)]

use std::ffi::{c_char, CStr};
use std::path::Path;
use std::ptr;

use crate::api;
use crate::model::ModelHandle;

/// Byte buffer crossing the C boundary.
#[repr(C)]
#[derive(Debug)]
pub struct Buffer {
    pub data: *const u8,
    pub size: usize,
}

/// Borrow a C string as UTF-8, treating null and invalid UTF-8 as absent.
unsafe fn opt_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    match CStr::from_ptr(s).to_str() {
        Ok(s) => Some(s),
        Err(err) => {
            tracing::error!("string argument is not UTF-8: {err}");
            None
        }
    }
}

/// Load a model from a graph definition and its weights.
///
/// Returns null on failure.
///
/// # Safety
///
/// Both arguments must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn colornet_load_model(
    model_definition_path: *const c_char,
    weights_path: *const c_char,
) -> *mut ModelHandle {
    let (Some(definition), Some(weights)) = (opt_str(model_definition_path), opt_str(weights_path))
    else {
        tracing::error!("model definition and weights paths are required");
        return ptr::null_mut();
    };

    api::load_model(Path::new(definition), Path::new(weights))
        .map_or(ptr::null_mut(), |model| Box::into_raw(Box::new(model)))
}

/// Drop the graph held by `model`. Null and already unloaded handles are ignored.
///
/// The handle stays allocated; later inference through it returns null. Release it
/// with [`colornet_release_model`].
///
/// # Safety
///
/// `model` must be null or a pointer from [`colornet_load_model`] that has not been
/// released yet.
#[no_mangle]
pub unsafe extern "C" fn colornet_unload_model(model: *mut ModelHandle) {
    if let Some(model) = model.as_mut() {
        api::unload_model(model);
    }
}

/// Free a handle returned by [`colornet_load_model`], unloading it first if needed.
/// Null is ignored.
///
/// # Safety
///
/// `model` must be null or a pointer from [`colornet_load_model`] that has not been
/// released yet. It must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn colornet_release_model(model: *mut ModelHandle) {
    if model.is_null() {
        return;
    }
    let mut model = Box::from_raw(model);
    api::unload_model(&mut model);
}

/// Colorize the encoded image in `input` and encode the result as `format`.
///
/// Returns null on failure; release a non-null result with [`colornet_free_buffer`].
///
/// # Safety
///
/// `input` must be null or point to a `Buffer` whose `data` is valid for `size` bytes.
/// `model` must be null or a pointer from [`colornet_load_model`] that has not been
/// released yet. `format` must
/// be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn colornet_infer(
    input: *const Buffer,
    model: *const ModelHandle,
    format: *const c_char,
) -> *mut Buffer {
    let bytes: &[u8] = match input.as_ref() {
        Some(buffer) if !buffer.data.is_null() => std::slice::from_raw_parts(buffer.data, buffer.size),
        _ => &[],
    };

    let Some(output) = api::infer(bytes, model.as_ref(), opt_str(format)) else {
        return ptr::null_mut();
    };

    let data = output.into_boxed_slice();
    let size = data.len();
    Box::into_raw(Box::new(Buffer {
        data: Box::into_raw(data).cast::<u8>().cast_const(),
        size,
    }))
}

/// Release a buffer returned by [`colornet_infer`]. Null is ignored.
///
/// # Safety
///
/// `buffer` must be null or a pointer from [`colornet_infer`] that has not been
/// released yet.
#[no_mangle]
pub unsafe extern "C" fn colornet_free_buffer(buffer: *mut Buffer) {
    if buffer.is_null() {
        return;
    }
    let buffer = Box::from_raw(buffer);
    let data = ptr::slice_from_raw_parts_mut(buffer.data.cast_mut(), buffer.size);
    drop(Box::from_raw(data));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stub::{ModelFiles, StubBackend};
    use std::ffi::CString;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([90, 90, 90]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Box a stub-backed handle the way [`colornet_load_model`] hands it out.
    fn boxed_model(files: &ModelFiles) -> *mut ModelHandle {
        let model = files.load(&StubBackend::default()).unwrap();
        Box::into_raw(Box::new(model))
    }

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert!(colornet_load_model(ptr::null(), ptr::null()).is_null());
            assert!(colornet_infer(ptr::null(), ptr::null(), ptr::null()).is_null());
            colornet_unload_model(ptr::null_mut());
            colornet_release_model(ptr::null_mut());
            colornet_free_buffer(ptr::null_mut());
        }
    }

    #[test]
    fn test_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let definition = CString::new(dir.path().join("net.onnx").to_str().unwrap()).unwrap();
        let weights = CString::new(dir.path().join("net.bin").to_str().unwrap()).unwrap();

        let model = unsafe { colornet_load_model(definition.as_ptr(), weights.as_ptr()) };
        assert!(model.is_null());
    }

    #[test]
    fn test_infer_without_model() {
        let bytes = b"not an image";
        let input = Buffer {
            data: bytes.as_ptr(),
            size: bytes.len(),
        };
        let format = CString::new("png").unwrap();

        let output = unsafe { colornet_infer(&input, ptr::null(), format.as_ptr()) };
        assert!(output.is_null());
    }

    #[test]
    fn test_infer_and_free_buffer() {
        let files = ModelFiles::colorization(0.0);
        let model = boxed_model(&files);
        let bytes = png_bytes();
        let input = Buffer {
            data: bytes.as_ptr(),
            size: bytes.len(),
        };
        let format = CString::new("png").unwrap();

        unsafe {
            let output = colornet_infer(&input, model, format.as_ptr());
            assert!(!output.is_null());

            let encoded = std::slice::from_raw_parts((*output).data, (*output).size);
            let decoded = image::load_from_memory(encoded).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (3, 2));

            colornet_free_buffer(output);
            colornet_unload_model(model);
            colornet_release_model(model);
        }
    }

    #[test]
    fn test_infer_after_unload_returns_null() {
        let files = ModelFiles::colorization(0.0);
        let model = boxed_model(&files);
        let bytes = png_bytes();
        let input = Buffer {
            data: bytes.as_ptr(),
            size: bytes.len(),
        };
        let format = CString::new("png").unwrap();

        unsafe {
            colornet_unload_model(model);
            colornet_unload_model(model);
            assert!(!(*model).is_loaded());
            assert!(colornet_infer(&input, model, format.as_ptr()).is_null());

            colornet_release_model(model);
        }
    }
}
