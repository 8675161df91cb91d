// pixconv/src/processors/loader.rs
use crate::core::{ConvertError, Result, SourceSpec};
use crate::processors::codecs;
use crate::utils::item_name;
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What an input specifier turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Directory(PathBuf),
    File(PathBuf),
    Url(String),
}

/// Raw bytes of one input whose content sniffs as an image.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    name: String,
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl ImageAsset {
    /// Sniffs `bytes` and rejects anything that is not `image/*`.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| ConvertError::InvalidImage(name.clone()))?;

        log::debug!("{} sniffed as {} ({} bytes)", name, mime_type, bytes.len());

        Ok(Self { name, bytes, mime_type })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the buffer, consuming the asset.
    pub fn decode(self) -> Result<DynamicImage> {
        let image = if codecs::needs_native_decoder(self.mime_type) {
            codecs::decode(&self.bytes, self.mime_type)?
        } else {
            image::load_from_memory(&self.bytes).map_err(|e| {
                ConvertError::Codec(format!("Failed to decode {} ({}): {}", self.name, self.mime_type, e))
            })?
        };

        let (width, height) = image.dimensions();
        log::debug!(
            "Loaded image: {}x{} pixels, color: {:?}",
            width, height, image.color()
        );

        Ok(image)
    }
}

#[derive(Clone, Default)]
pub struct Loader;

impl Loader {
    pub fn new() -> Self {
        Self
    }

    /// Classifies an input specifier. Local paths win over URLs.
    pub fn resolve(&self, spec: &SourceSpec) -> Result<Source> {
        let path = Path::new(spec.as_str());

        if path.is_dir() {
            Ok(Source::Directory(path.to_path_buf()))
        } else if path.exists() {
            Ok(Source::File(path.to_path_buf()))
        } else if spec.is_url() {
            Ok(Source::Url(spec.as_str().to_string()))
        } else {
            Err(ConvertError::NotFound(spec.as_str().to_string()))
        }
    }

    /// Loads a single (non-directory) source.
    pub fn load(&self, source: &Source) -> Result<ImageAsset> {
        match source {
            Source::File(path) => self.load_file(path),
            Source::Url(url) => self.fetch(url),
            Source::Directory(dir) => Err(ConvertError::InvalidParameter(format!(
                "{} is a directory",
                dir.display()
            ))),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<ImageAsset> {
        log::debug!("Loading image from: {}", path.display());

        let bytes = std::fs::read(path)?;
        ImageAsset::from_bytes(item_name(&path.to_string_lossy()), bytes)
    }

    /// GETs the full body of `url`. No timeout and no retry.
    pub fn fetch(&self, url: &str) -> Result<ImageAsset> {
        log::info!("Downloading {}", url);

        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()?;

        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::Network(format!(
                "GET {} failed with status {}",
                url, status
            )));
        }

        let bytes = response.bytes()?;
        ImageAsset::from_bytes(item_name(url), bytes.to_vec())
    }

    /// Direct, non-recursive entries of `dir` in the order the filesystem
    /// reports them. Subdirectories are skipped.
    pub fn directory_entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let paths = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| {
                if entry.file_type().is_dir() {
                    log::debug!("Skipping subdirectory {}", entry.path().display());
                    false
                } else {
                    true
                }
            })
            .map(|entry| entry.into_path())
            .collect();

        Ok(paths)
    }

    /// Lazily reads each directory entry; every item is read only when the
    /// iterator reaches it.
    pub fn entries<'a>(
        &'a self,
        paths: &'a [PathBuf],
    ) -> impl Iterator<Item = (String, Result<ImageAsset>)> + 'a {
        paths.iter().map(move |path| {
            let name = item_name(&path.to_string_lossy());
            (name, self.load_file(path))
        })
    }
}
