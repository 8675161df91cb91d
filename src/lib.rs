mod cli;
mod core;
mod processors;
mod utils;

pub use crate::cli::{Algorithm, Cli};
pub use crate::core::format::{canonicalize, is_supported_format};
pub use crate::core::processor::ImageProcessor;
pub use crate::core::{
    validate_options, Capabilities, ConversionRequest, ConvertError, Flatten, Format, RawOptions,
    ResizeAlgorithm, Result, SourceSpec,
};
pub use crate::processors::{
    run, BatchProcessor, BatchReport, ChromaSubsampling, Compressor, EncodeSettings, ImageAsset,
    ItemOutcome, Loader, ResizeFit, Resizer, RunMode, Source, TransformPlan, TransformStep,
};
pub use crate::utils::{
    format_file_size, parse_blur, parse_color, parse_compression, parse_regions, parse_resize,
    unique_output_path, Region,
};

pub mod prelude {
    pub use crate::{
        BatchProcessor, Compressor, ConversionRequest, Format, ImageProcessor, Loader, Resizer,
        TransformPlan,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
