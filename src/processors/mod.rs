// pixconv/src/processors/mod.rs
mod batch;
mod codecs;
mod compressor;
mod effects;
mod loader;
mod pipeline;
mod resizer;

pub use batch::{run, BatchProcessor, BatchReport, ItemOutcome, RunMode};
pub use compressor::{ChromaSubsampling, Compressor, EncodeSettings};
pub use loader::{ImageAsset, Loader, Source};
pub use pipeline::{TransformPlan, TransformStep};
pub use resizer::{ResizeFit, Resizer};

