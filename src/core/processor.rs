// pixconv/src/core/processor.rs
use super::{ConversionRequest, Result};
use crate::processors::{Compressor, ImageAsset, TransformPlan};
use crate::utils::{base_name, format_file_size, unique_output_path};
use std::path::{Path, PathBuf};

/// Converts one image: plan, transform, encode, write.
pub struct ImageProcessor<'a> {
    request: &'a ConversionRequest,
}

impl<'a> ImageProcessor<'a> {
    pub fn new(request: &'a ConversionRequest) -> Self {
        Self { request }
    }

    /// Decodes `asset`, runs the transform plan and returns the encoded bytes.
    pub fn convert(&self, asset: ImageAsset) -> Result<Vec<u8>> {
        let plan = TransformPlan::build(self.request)?;
        let image = asset.decode()?;
        let (image, settings) = plan.apply(image)?;
        Compressor::new(plan.format(), settings).compress_to_bytes(&image)
    }

    /// Converts `asset` and writes it to a fresh file named after `base`
    /// inside `directory`. Returns the path written.
    pub fn process(&self, asset: ImageAsset, directory: &Path, base: &str) -> Result<PathBuf> {
        let name = asset.name().to_string();
        let original_size = asset.len();

        let bytes = self.convert(asset)?;

        let output_path = unique_output_path(directory, base, self.request.format.name())?;
        std::fs::write(&output_path, &bytes)?;

        log::info!(
            "Converted {} -> {} ({} -> {})",
            name,
            output_path.display(),
            format_file_size(original_size as u64),
            format_file_size(bytes.len() as u64)
        );

        Ok(output_path)
    }

    /// Destination directory and base name for a single-item run.
    ///
    /// An output with an extension that is neither an existing directory nor
    /// ends in a path separator names the file itself (its extension is
    /// replaced by the target format's); anything else is a directory and the
    /// base comes from the input name.
    pub fn single_destination(&self, item_name: &str) -> (PathBuf, String) {
        let output = &self.request.output;

        let names_directory = output.is_dir()
            || output
                .as_os_str()
                .to_string_lossy()
                .ends_with(std::path::is_separator);

        if !names_directory && output.extension().is_some() {
            let directory = output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (directory, base_name(&output.to_string_lossy()))
        } else {
            (output.clone(), base_name(item_name))
        }
    }
}
