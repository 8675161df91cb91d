// pixconv/src/core/format.rs
use std::fmt;
use std::str::FromStr;

/// Output formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Heic,
    Heif,
    Avif,
    Jpeg,
    Png,
    Raw,
    Tiff,
    Tif,
    WebP,
    Gif,
    Jp2,
    Jpx,
    J2k,
    J2c,
    Svg,
}

/// What an encoder for a format can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub quality: bool,
    pub lossless: bool,
    pub chroma_subsampling: bool,
    pub adaptive_quantization: bool,
}

const fn caps(quality: bool, lossless: bool, jpeg_family: bool) -> Capabilities {
    Capabilities {
        quality,
        lossless,
        chroma_subsampling: jpeg_family,
        adaptive_quantization: jpeg_family,
    }
}

const REGISTRY: &[(&str, Format, Capabilities)] = &[
    ("heic", Format::Heic, caps(true, true, false)),
    ("heif", Format::Heif, caps(true, true, false)),
    ("avif", Format::Avif, caps(true, true, false)),
    ("jpeg", Format::Jpeg, caps(true, false, true)),
    ("png", Format::Png, caps(true, true, false)),
    ("raw", Format::Raw, caps(false, false, false)),
    ("tiff", Format::Tiff, caps(true, true, false)),
    ("tif", Format::Tif, caps(true, true, false)),
    ("webp", Format::WebP, caps(true, true, false)),
    ("gif", Format::Gif, caps(false, false, false)),
    ("jp2", Format::Jp2, caps(false, false, false)),
    ("jpx", Format::Jpx, caps(false, false, false)),
    ("j2k", Format::J2k, caps(false, false, false)),
    ("j2c", Format::J2c, caps(false, false, false)),
    ("svg", Format::Svg, caps(false, false, false)),
];

/// Lowercases a format name and maps `jpg` to `jpeg`.
pub fn canonicalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    if lower == "jpg" {
        "jpeg".to_string()
    } else {
        lower
    }
}

pub fn is_supported_format(name: &str) -> bool {
    name.parse::<Format>().is_ok()
}

impl Format {
    pub fn all() -> impl Iterator<Item = Format> {
        REGISTRY.iter().map(|(_, f, _)| *f)
    }

    // REGISTRY is laid out in declaration order.
    fn entry(self) -> &'static (&'static str, Format, Capabilities) {
        &REGISTRY[self as usize]
    }

    /// Canonical name, also used as the output file extension.
    pub fn name(self) -> &'static str {
        self.entry().0
    }

    pub fn capabilities(self) -> Capabilities {
        self.entry().2
    }

    pub fn supports_quality(self) -> bool {
        self.capabilities().quality
    }

    pub fn supports_lossless(self) -> bool {
        self.capabilities().lossless
    }

    pub fn supports_chroma_subsampling(self) -> bool {
        self.capabilities().chroma_subsampling
    }

    /// MIME type a content sniffer reports for this format's output, if any.
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Format::Heic | Format::Heif => Some("image/heif"),
            Format::Avif => Some("image/avif"),
            Format::Jpeg => Some("image/jpeg"),
            Format::Png => Some("image/png"),
            Format::Tiff | Format::Tif => Some("image/tiff"),
            Format::WebP => Some("image/webp"),
            Format::Gif => Some("image/gif"),
            Format::Jp2 | Format::Jpx | Format::J2k | Format::J2c => Some("image/jp2"),
            Format::Svg => Some("image/svg+xml"),
            Format::Raw => None,
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let canonical = canonicalize(s);
        REGISTRY
            .iter()
            .find(|(name, _, _)| *name == canonical)
            .map(|(_, f, _)| *f)
            .ok_or_else(|| format!("unsupported format: {}", s))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
