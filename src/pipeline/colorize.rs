//! The colorization pipeline.

use ndarray::{Axis, Ix4};

use crate::buffer::OutputBuffer;
use crate::error::{Error, Result};
use crate::image::{self as img, BgrImage, Interpolation, OutputFormat, AB_CHANNELS, NET_INPUT_SIZE};
use crate::model::{ModelHandle, DEFAULT_INPUT_NAME, DEFAULT_OUTPUT_NAME};

/// Configuration for the colorization pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the network's luminance input.
    pub input_name: String,

    /// Name of the network's chrominance output.
    pub output_name: String,

    /// Filter used for both the down-resize to network geometry and the up-resize back.
    pub interpolation: Interpolation,

    /// Output JPEG quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            interpolation: Interpolation::Bilinear,
            jpeg_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.input_name.is_empty() {
            return Err(Error::InvalidParameter {
                name: "input_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.output_name.is_empty() {
            return Err(Error::InvalidParameter {
                name: "output_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidParameter {
                name: "jpeg_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        Ok(())
    }
}

/// Colorizes encoded images with a loaded network.
///
/// Holds no state between calls; one `Colorizer` can serve any number of models
/// and threads.
#[derive(Debug, Clone, Default)]
pub struct Colorizer {
    config: Config,
}

impl Colorizer {
    /// Create a colorizer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Colorize an encoded image and encode the result as `format`.
    ///
    /// Checks, in order and before any decoding or inference, that `model` is loaded
    /// and that `format` is present. The output has the input's width and height.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`], [`Error::InvalidFormat`] or [`Error::Decode`]
    /// when a precondition fails, and the error of the failing stage otherwise.
    pub fn infer(
        &self,
        input: &[u8],
        model: Option<&ModelHandle>,
        format: Option<&str>,
    ) -> Result<OutputBuffer> {
        let model = model
            .filter(|m| m.is_loaded())
            .ok_or(Error::ModelNotLoaded)?;
        let format = OutputFormat::parse(format)?;

        let decoded = img::decode(input)?;
        let (height, width, _) = decoded.dim();
        tracing::debug!("Decoded {width}x{height} image from {} bytes", input.len());

        let colored = self.colorize(&decoded, model)?;

        let encoded = img::encode(&colored, &format, self.config.jpeg_quality)?;
        tracing::debug!("Encoded {format} output: {} bytes", encoded.len());

        OutputBuffer::copy_from(&encoded)
    }

    /// Colorize a decoded BGR image at its native resolution.
    ///
    /// The luminance of the input is kept at full resolution; only the predicted
    /// chrominance passes through the network's fixed geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or produces an unusable tensor.
    pub fn colorize(&self, image: &BgrImage, model: &ModelHandle) -> Result<BgrImage> {
        let (height, width, _) = image.dim();
        let interpolation = self.config.interpolation;

        let normalized = img::to_normalized_float(image);
        let lab = img::bgr_to_lab(&normalized)?;
        let luminance = img::extract_channel(&lab, 0)?;

        let net_input = img::resize(&luminance, NET_INPUT_SIZE, NET_INPUT_SIZE, interpolation)?
            .insert_axis(Axis(0))
            .insert_axis(Axis(0));

        tracing::debug!("Running forward pass on {:?} tensor", net_input.shape());
        let output = model.run_forward(
            net_input.into_dyn(),
            &self.config.input_name,
            &self.config.output_name,
        )?;

        if output.is_empty() {
            return Err(Error::EmptyInferenceOutput);
        }

        let shape = output.shape().to_vec();
        let output = output
            .into_dimensionality::<Ix4>()
            .ok()
            .filter(|o| o.len_of(Axis(0)) == 1 && o.len_of(Axis(1)) >= AB_CHANNELS)
            .ok_or_else(|| {
                Error::inference(format!(
                    "expected (1, {AB_CHANNELS}, H, W) chrominance output, got {shape:?}"
                ))
            })?;

        let planes = output.index_axis(Axis(0), 0);
        let a = img::resize(&planes.index_axis(Axis(0), 0).to_owned(), width, height, interpolation)?;
        let b = img::resize(&planes.index_axis(Axis(0), 1).to_owned(), width, height, interpolation)?;

        let merged = img::merge_channels(&[luminance, a, b])?;
        let colored = img::to_u8(&img::lab_to_bgr(&merged)?);

        if colored.is_empty() {
            return Err(Error::ReconstructionEmpty);
        }

        Ok(colored)
    }
}
