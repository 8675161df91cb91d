// pixconv/src/cli.rs
use crate::core::{Flatten, RawOptions, ResizeAlgorithm};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pixconv",
    author,
    version,
    about = "Convert images between formats with optional compression, resizing and optimization",
    disable_version_flag = true
)]
pub struct Cli {
    /// Input file, URL or directory of images
    #[arg(short, long, value_name = "PATH|URL|DIR")]
    pub input: Option<String>,

    /// Output file or directory
    #[arg(short, long, value_name = "PATH|DIR")]
    pub output: Option<PathBuf>,

    /// Target format (heic, heif, avif, jpeg, jpg, png, raw, tiff, tif, webp, gif, jp2, jpx, j2k, j2c, svg)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Compression level (0-100)
    #[arg(short, long, value_name = "0-100", allow_hyphen_values = true)]
    pub compression: Option<String>,

    /// Resize to WIDTHxHEIGHT
    #[arg(short, long, value_name = "WxH")]
    pub resize: Option<String>,

    /// Fit inside the resize box instead of forcing exact dimensions
    #[arg(long)]
    pub preserve_aspect_ratio: bool,

    /// Resampling filter used when resizing
    #[arg(long, value_enum, default_value_t = Algorithm::Lanczos3)]
    pub filter: Algorithm,

    /// Flatten transparency onto a background color (default white)
    #[arg(long, value_name = "COLOR", num_args = 0..=1)]
    pub flatten: Option<Option<String>>,

    /// Sharpen the image
    #[arg(long)]
    pub sharpen: bool,

    /// Reduce noise with a median filter
    #[arg(long)]
    pub denoise: bool,

    /// Convert to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Gaussian blur with the given sigma
    #[arg(long, value_name = "SIGMA", allow_hyphen_values = true)]
    pub blur: Option<String>,

    /// Apply sharpen and denoise, ignoring the individual optimization flags
    #[arg(long = "autoOptimize")]
    pub auto_optimize: bool,

    /// Encode losslessly where the format allows it
    #[arg(long)]
    pub lossless: bool,

    /// Progressive JPEG encoding
    #[arg(long)]
    pub progressive: bool,

    /// JPEG chroma subsampling rate, e.g. 4:2:0
    #[arg(long, value_name = "RATE")]
    pub subsample: Option<String>,

    /// Use a fixed custom JPEG quantization table
    #[arg(long)]
    pub adaptive_quantization: bool,

    /// Per-region compression, x:y:w:h:q separated by commas
    #[arg(long, value_name = "x:y:w:h:q,...")]
    pub roi_compression: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

impl Cli {
    pub fn into_options(self) -> RawOptions {
        let flatten = match self.flatten {
            None => Flatten::Unset,
            Some(None) => Flatten::Default,
            Some(Some(color)) if color.trim().is_empty() => Flatten::Default,
            Some(Some(color)) => Flatten::Color(color),
        };

        RawOptions {
            input: self.input,
            output: self.output,
            format: self.format,
            compression: self.compression,
            resize: self.resize,
            preserve_aspect_ratio: self.preserve_aspect_ratio,
            algorithm: self.filter.into(),
            flatten,
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
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pixconv").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flatten_is_tri_state() {
        assert_eq!(parse(&[]).into_options().flatten, Flatten::Unset);
        assert_eq!(parse(&["--flatten"]).into_options().flatten, Flatten::Default);
        assert_eq!(
            parse(&["--flatten", "#000"]).into_options().flatten,
            Flatten::Color("#000".to_string())
        );
    }

    #[test]
    fn short_flags() {
        let options = parse(&["-i", "in.png", "-o", "out", "-f", "jpg", "-c", "80", "-r", "300x200"]).into_options();
        assert_eq!(options.input.as_deref(), Some("in.png"));
        assert_eq!(options.format.as_deref(), Some("jpg"));
        assert_eq!(options.compression.as_deref(), Some("80"));
        assert_eq!(options.resize.as_deref(), Some("300x200"));
    }

    #[test]
    fn long_flags() {
        let options = parse(&[
            "--autoOptimize",
            "--preserve-aspect-ratio",
            "--adaptive-quantization",
            "--roi-compression",
            "0:0:10:10:30",
            "--subsample",
            "4:2:0",
            "--blur",
            "-1",
            "--filter",
            "nearest",
        ])
        .into_options();
        assert!(options.auto_optimize);
        assert!(options.preserve_aspect_ratio);
        assert!(options.adaptive_quantization);
        assert_eq!(options.roi_compression.as_deref(), Some("0:0:10:10:30"));
        assert_eq!(options.blur.as_deref(), Some("-1"));
        assert_eq!(options.algorithm, ResizeAlgorithm::Nearest);
    }

    #[test]
    fn version_flag_is_lowercase_v() {
        let err = Cli::try_parse_from(["pixconv", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
