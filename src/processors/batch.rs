// pixconv/src/processors/batch.rs
use crate::core::processor::ImageProcessor;
use crate::core::{ConversionRequest, Result};
use crate::processors::loader::{Loader, Source};
use crate::utils::{base_name, item_name};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Result of one item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub name: String,
    pub result: Result<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Directory,
}

/// Every item's outcome, in processing order.
#[derive(Debug)]
pub struct BatchReport {
    pub mode: RunMode,
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.items.iter().filter_map(|item| item.result.as_ref().ok())
    }

    /// A single-item run fails with its item; a directory run never does.
    pub fn is_failure(&self) -> bool {
        self.mode == RunMode::Single && self.failed() > 0
    }

    pub fn bytes_written(&self) -> u64 {
        self.outputs()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum()
    }
}

/// Drives resolve, transform and write over one input or a whole directory,
/// one item at a time.
pub struct BatchProcessor<'a> {
    request: &'a ConversionRequest,
    loader: Loader,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(request: &'a ConversionRequest) -> Self {
        Self {
            request,
            loader: Loader::new(),
        }
    }

    /// Fails only when the input cannot be resolved at all; per-item errors
    /// are logged and collected in the report.
    pub fn run(&self) -> Result<BatchReport> {
        match self.loader.resolve(&self.request.input)? {
            Source::Directory(dir) => self.process_directory(&dir),
            source => Ok(self.process_single(&source)),
        }
    }

    fn process_single(&self, source: &Source) -> BatchReport {
        let name = match source {
            Source::File(path) => item_name(&path.to_string_lossy()),
            Source::Url(url) => item_name(url),
            Source::Directory(dir) => item_name(&dir.to_string_lossy()),
        };

        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Converting {}", name));

        let processor = ImageProcessor::new(self.request);
        let (directory, base) = processor.single_destination(&name);

        let result = self
            .loader
            .load(source)
            .and_then(|asset| processor.process(asset, &directory, &base));

        // Reported once by the caller.
        if let Err(e) = &result {
            log::debug!("Failed to convert {}: {}", name, e);
        }
        pb.finish_and_clear();

        BatchReport {
            mode: RunMode::Single,
            items: vec![ItemOutcome { name, result }],
        }
    }

    fn process_directory(&self, dir: &std::path::Path) -> Result<BatchReport> {
        let paths = self.loader.directory_entries(dir)?;

        if paths.is_empty() {
            log::warn!("No files found in {}", dir.display());
        } else {
            log::info!("Processing {} files from {}", paths.len(), dir.display());
        }

        let pb = self.create_progress_bar(paths.len());
        let processor = ImageProcessor::new(self.request);
        let mut items = Vec::with_capacity(paths.len());

        for (name, asset) in self.loader.entries(&paths) {
            pb.set_message(name.clone());

            let result = asset.and_then(|asset| processor.process(asset, &self.request.output, &base_name(&name)));

            if let Err(e) = &result {
                pb.suspend(|| log::error!("Failed to convert {}: {}", name, e));
            }

            items.push(ItemOutcome { name, result });
            pb.inc(1);
        }

        let report = BatchReport {
            mode: RunMode::Directory,
            items,
        };

        pb.finish_with_message(format!(
            "Converted {} of {} files",
            report.succeeded(),
            report.items.len()
        ));

        Ok(report)
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Runs `request` to completion.
pub fn run(request: &ConversionRequest) -> Result<BatchReport> {
    BatchProcessor::new(request).run()
}
