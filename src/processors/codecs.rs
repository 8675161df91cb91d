// pixconv/src/processors/codecs.rs
//! Codecs backed by native libraries, enabled by Cargo features.
//!
//! `heif` links libheif for HEIC/HEIF decode and encode. `jpeg2000` links
//! OpenJPEG for JPEG 2000 decode. Without the feature the matching calls
//! fail with a codec error that names it.

use crate::core::{ConvertError, Result};
use image::DynamicImage;

const DEFAULT_HEIF_QUALITY: u8 = 50;

/// True for content types that `image` cannot decode on its own.
pub fn needs_native_decoder(mime_type: &str) -> bool {
    matches!(mime_type, "image/heif" | "image/heic" | "image/jp2")
}

pub fn decode(bytes: &[u8], mime_type: &str) -> Result<DynamicImage> {
    match mime_type {
        "image/heif" | "image/heic" => decode_heif(bytes),
        "image/jp2" => decode_jpeg2000(bytes),
        other => Err(ConvertError::Codec(format!("No native decoder for {}", other))),
    }
}

#[cfg(feature = "heif")]
fn decode_heif(bytes: &[u8]) -> Result<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let heif_err = |e: libheif_rs::HeifError| ConvertError::Codec(format!("HEIF decoding failed: {}", e));

    let lib = LibHeif::new();
    let context = HeifContext::read_from_bytes(bytes).map_err(heif_err)?;
    let handle = context.primary_image_handle().map_err(heif_err)?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(heif_err)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::Codec("HEIF image has no interleaved plane".to_string()))?;

    let row_len = plane.width as usize * 4;
    let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }

    image::RgbaImage::from_raw(plane.width, plane.height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ConvertError::Codec("HEIF plane is smaller than its dimensions".to_string()))
}

#[cfg(not(feature = "heif"))]
fn decode_heif(_bytes: &[u8]) -> Result<DynamicImage> {
    Err(missing_feature("HEIF decoding", "heif"))
}

/// Encodes as HEIC (HEVC in a HEIF container).
#[cfg(feature = "heif")]
pub fn encode_heif(image: &DynamicImage, quality: Option<u8>, lossless: bool) -> Result<Vec<u8>> {
    use libheif_rs::{Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif, RgbChroma};

    let heif_err = |e: libheif_rs::HeifError| ConvertError::Codec(format!("HEIF encoding failed: {}", e));

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut target = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgba)).map_err(heif_err)?;
    target
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(heif_err)?;
    {
        let planes = target.planes_mut();
        let plane = planes
            .interleaved
            .ok_or_else(|| ConvertError::Codec("HEIF image has no interleaved plane".to_string()))?;
        let row_len = width as usize * 4;
        for (dst, src) in plane.data.chunks_mut(plane.stride).zip(rgba.as_raw().chunks(row_len)) {
            dst[..row_len].copy_from_slice(src);
        }
    }

    let lib = LibHeif::new();
    let mut encoder = lib.encoder_for_format(CompressionFormat::Hevc).map_err(heif_err)?;
    let level = if lossless {
        EncoderQuality::LossLess
    } else {
        EncoderQuality::Lossy(quality.unwrap_or(DEFAULT_HEIF_QUALITY))
    };
    encoder.set_quality(level).map_err(heif_err)?;

    let mut context = HeifContext::new().map_err(heif_err)?;
    context.encode_image(&target, &mut encoder, None).map_err(heif_err)?;
    context.write_to_bytes().map_err(heif_err)
}

#[cfg(not(feature = "heif"))]
pub fn encode_heif(_image: &DynamicImage, _quality: Option<u8>, _lossless: bool) -> Result<Vec<u8>> {
    Err(missing_feature("HEIF encoding", "heif"))
}

#[cfg(feature = "jpeg2000")]
fn decode_jpeg2000(bytes: &[u8]) -> Result<DynamicImage> {
    let decoded = jpeg2k::Image::from_bytes(bytes)
        .map_err(|e| ConvertError::Codec(format!("JPEG 2000 decoding failed: {}", e)))?;
    DynamicImage::try_from(&decoded).map_err(|e| ConvertError::Codec(format!("JPEG 2000 decoding failed: {}", e)))
}

#[cfg(not(feature = "jpeg2000"))]
fn decode_jpeg2000(_bytes: &[u8]) -> Result<DynamicImage> {
    Err(missing_feature("JPEG 2000 decoding", "jpeg2000"))
}

#[allow(dead_code)]
fn missing_feature(what: &str, feature: &str) -> ConvertError {
    ConvertError::Codec(format!("{} requires pixconv built with the `{}` feature", what, feature))
}
