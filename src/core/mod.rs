// pixconv/src/core/mod.rs
pub mod format;
pub mod processor;

use thiserror::Error;

pub use format::{Capabilities, Format};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos3,
}

/// Background flattening request.
///
/// `--flatten` alone means `Default` (white); `--flatten <color>` carries
/// the color string, parsed when the pipeline is planned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Flatten {
    #[default]
    Unset,
    Default,
    Color(String),
}

/// Where the input comes from, as the user typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec(pub String);

impl SourceSpec {
    pub fn is_url(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated, immutable configuration for one run.
///
/// `format` is always a registry member. Numeric values (compression,
/// resize, blur, ROI, subsampling) stay in their textual form and are
/// checked when each item's pipeline is planned, so that a bad value is
/// reported per item.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input: SourceSpec,
    pub output: std::path::PathBuf,
    pub format: Format,
    pub compression: Option<String>,
    pub resize: Option<String>,
    pub preserve_aspect_ratio: bool,
    pub algorithm: ResizeAlgorithm,
    pub flatten: Flatten,
    pub sharpen: bool,
    pub denoise: bool,
    pub grayscale: bool,
    pub blur: Option<String>,
    pub auto_optimize: bool,
    pub lossless: bool,
    pub progressive: bool,
    pub subsample: Option<String>,
    pub adaptive_quantization: bool,
    pub roi_compression: Option<String>,
}

impl ConversionRequest {
    /// Minimal request: input, output and format, every option unset.
    pub fn new(input: impl Into<String>, output: impl Into<std::path::PathBuf>, format: Format) -> Self {
        Self {
            input: SourceSpec(input.into()),
            output: output.into(),
            format,
            compression: None,
            resize: None,
            preserve_aspect_ratio: false,
            algorithm: ResizeAlgorithm::default(),
            flatten: Flatten::Unset,
            sharpen: false,
            denoise: false,
            grayscale: false,
            blur: None,
            auto_optimize: false,
            lossless: false,
            progressive: false,
            subsample: None,
            adaptive_quantization: false,
            roi_compression: None,
        }
    }
}

/// Raw flag bag as it comes off the command line.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub input: Option<String>,
    pub output: Option<std::path::PathBuf>,
    pub format: Option<String>,
    pub compression: Option<String>,
    pub resize: Option<String>,
    pub preserve_aspect_ratio: bool,
    pub algorithm: ResizeAlgorithm,
    pub flatten: Flatten,
    pub sharpen: bool,
    pub denoise: bool,
    pub grayscale: bool,
    pub blur: Option<String>,
    pub auto_optimize: bool,
    pub lossless: bool,
    pub progressive: bool,
    pub subsample: Option<String>,
    pub adaptive_quantization: bool,
    pub roi_compression: Option<String>,
}

impl RawOptions {
    pub fn validate(self) -> Result<ConversionRequest> {
        let (input, output, format) = match (self.input, self.output, self.format) {
            (Some(i), Some(o), Some(f))
                if !i.trim().is_empty() && !o.as_os_str().is_empty() && !f.trim().is_empty() =>
            {
                (i, o, f)
            }
            _ => {
                return Err(ConvertError::Configuration(
                    "Please specify input, output, and format.".to_string(),
                ))
            }
        };

        let format: Format = format
            .parse()
            .map_err(|_| ConvertError::Configuration("Unsupported format specified.".to_string()))?;

        Ok(ConversionRequest {
            input: SourceSpec(input),
            output,
            format,
            compression: self.compression,
            resize: self.resize,
            preserve_aspect_ratio: self.preserve_aspect_ratio,
            algorithm: self.algorithm,
            flatten: self.flatten,
            sharpen: self.sharpen,
            denoise: self.denoise,
            grayscale: self.grayscale,
            blur: self.blur,
            auto_optimize: self.auto_optimize,
            lossless: self.lossless,
            progressive: self.progressive,
            subsample: self.subsample,
            adaptive_quantization: self.adaptive_quantization,
            roi_compression: self.roi_compression,
        })
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("{0}")]
    Configuration(String),

    #[error("Input path does not exist.")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0} is not a valid image.")]
    InvalidImage(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Errors that stop the whole run before any item is processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConvertError::Configuration(_) | ConvertError::NotFound(_))
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(e: image::ImageError) -> Self {
        ConvertError::Codec(e.to_string())
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(e: reqwest::Error) -> Self {
        ConvertError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

pub fn validate_options(options: RawOptions) -> Result<ConversionRequest> {
    options.validate()
}
