// pixconv/src/processors/compressor.rs
use crate::core::{ConvertError, Format, Result};
use crate::processors::codecs;
use image::codecs::avif::AvifEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType, QuantizationTableType, SamplingFactor};
use oxipng::{optimize_from_memory, Options};
use std::io::Cursor;
use std::str::FromStr;
use tiff::encoder::compression::{Deflate, DeflateLevel};
use tiff::encoder::{colortype, TiffEncoder};

const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_WEBP_QUALITY: u8 = 80;
const DEFAULT_AVIF_QUALITY: u8 = 50;
const DEFAULT_AVIF_SPEED: u8 = 6;
const WEBP_MAX_DIMENSION: u32 = 16383;

/// JPEG chroma subsampling rate (`--subsample`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSubsampling {
    Yuv444,
    Yuv440,
    Yuv422,
    Yuv420,
    Yuv411,
}

impl FromStr for ChromaSubsampling {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "4:4:4" | "444" => Ok(Self::Yuv444),
            "4:4:0" | "440" => Ok(Self::Yuv440),
            "4:2:2" | "422" => Ok(Self::Yuv422),
            "4:2:0" | "420" => Ok(Self::Yuv420),
            "4:1:1" | "411" => Ok(Self::Yuv411),
            other => Err(ConvertError::InvalidParameter(format!(
                "Invalid chroma subsampling '{}'. Expected one of 4:4:4, 4:4:0, 4:2:2, 4:2:0, 4:1:1.",
                other
            ))),
        }
    }
}

impl ChromaSubsampling {
    fn sampling_factor(self) -> SamplingFactor {
        match self {
            Self::Yuv444 => SamplingFactor::R_4_4_4,
            Self::Yuv440 => SamplingFactor::R_4_4_0,
            Self::Yuv422 => SamplingFactor::R_4_2_2,
            Self::Yuv420 => SamplingFactor::R_4_2_0,
            Self::Yuv411 => SamplingFactor::R_4_1_1,
        }
    }
}

/// Encoder parameters settled while planning; consumed by the final encode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncodeSettings {
    pub quality: Option<u8>,
    pub lossless: bool,
    pub progressive: bool,
    pub subsampling: Option<ChromaSubsampling>,
    pub adaptive_quantization: bool,
}

// Base tables for `--adaptive-quantization`, in natural order. They are
// scaled by the quality level before use.
const ADAPTIVE_LUMA_TABLE: [u16; 64] = [
    12, 11, 11, 12, 15, 19, 24, 29, //
    11, 11, 12, 14, 17, 22, 28, 34, //
    11, 12, 14, 17, 21, 27, 34, 41, //
    12, 14, 17, 21, 27, 34, 42, 51, //
    15, 17, 21, 27, 35, 44, 54, 64, //
    19, 22, 27, 34, 44, 55, 67, 79, //
    24, 28, 34, 42, 54, 67, 81, 96, //
    29, 34, 41, 51, 64, 79, 96, 113,
];

const ADAPTIVE_CHROMA_TABLE: [u16; 64] = [
    16, 18, 24, 47, 99, 99, 99, 99, //
    18, 21, 26, 66, 99, 99, 99, 99, //
    24, 26, 56, 99, 99, 99, 99, 99, //
    47, 66, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99,
];

pub struct Compressor {
    format: Format,
    settings: EncodeSettings,
}

impl Compressor {
    pub fn new(format: Format, settings: EncodeSettings) -> Self {
        Self { format, settings }
    }

    pub fn compress_to_bytes(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        log::debug!(
            "Encoding {}x{} image as {} with {:?}",
            image.width(),
            image.height(),
            self.format,
            self.settings
        );

        match self.format {
            Format::Jpeg => self.encode_jpeg(image),
            Format::Png => self.encode_png(image),
            Format::WebP => self.encode_webp(image),
            Format::Avif => self.encode_avif(image),
            Format::Tiff | Format::Tif => self.encode_tiff(image),
            Format::Gif => Self::encode_generic(&DynamicImage::ImageRgba8(image.to_rgba8()), ImageFormat::Gif),
            Format::Raw => Ok(image.to_rgba8().into_raw()),
            Format::Heic | Format::Heif => {
                codecs::encode_heif(image, self.settings.quality, self.settings.lossless)
            }
            Format::Jp2 | Format::Jpx | Format::J2k | Format::J2c | Format::Svg => {
                Err(ConvertError::Codec(format!("No encoder available for {}", self.format)))
            }
        }
    }

    /// Lossy JPEG round trip at `quality`; used for region overlays.
    pub fn jpeg_round_trip(image: &DynamicImage, quality: u8) -> Result<DynamicImage> {
        let bytes = Compressor::new(
            Format::Jpeg,
            EncodeSettings { quality: Some(quality), ..Default::default() },
        )
        .encode_jpeg(image)?;
        Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?)
    }

    fn encode_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let (width, height) = jpeg_dimensions(image)?;
        let quality = self.settings.quality.unwrap_or(DEFAULT_JPEG_QUALITY).max(1);

        let mut buffer = Vec::new();
        let mut encoder = jpeg_encoder::Encoder::new(&mut buffer, quality);
        encoder.set_progressive(self.settings.progressive);
        if let Some(subsampling) = self.settings.subsampling {
            encoder.set_sampling_factor(subsampling.sampling_factor());
        }
        if self.settings.adaptive_quantization {
            encoder.set_quantization_tables(
                QuantizationTableType::Custom(scaled_table(&ADAPTIVE_LUMA_TABLE, quality)),
                QuantizationTableType::Custom(scaled_table(&ADAPTIVE_CHROMA_TABLE, quality)),
            );
        }

        let result = if image.color().has_color() {
            let rgb = image.to_rgb8();
            encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb)
        } else {
            let luma = image.to_luma8();
            encoder.encode(luma.as_raw(), width, height, ColorType::Luma)
        };
        result.map_err(|e| ConvertError::Codec(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let data = Self::encode_generic(image, ImageFormat::Png)?;

        // Lower compression levels mean more effort spent shrinking the file.
        let preset = if self.settings.lossless {
            6
        } else {
            match self.settings.quality {
                Some(q) => ((100 - q as u32) * 6 / 100) as u8,
                None => 2,
            }
        };

        optimize_from_memory(&data, &Options::from_preset(preset))
            .map_err(|e| ConvertError::Codec(format!("PNG optimization failed: {}", e)))
    }

    fn encode_webp(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        if image.width() > WEBP_MAX_DIMENSION || image.height() > WEBP_MAX_DIMENSION {
            return Err(ConvertError::Codec(format!(
                "WebP dimensions are limited to {max}x{max}, got {}x{}",
                image.width(),
                image.height(),
                max = WEBP_MAX_DIMENSION
            )));
        }

        let rgba = DynamicImage::ImageRgba8(image.to_rgba8());

        if self.settings.lossless {
            let mut buffer = Vec::new();
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
            return Ok(buffer);
        }

        let quality = self.settings.quality.unwrap_or(DEFAULT_WEBP_QUALITY);
        let encoder = webp::Encoder::from_image(&rgba)
            .map_err(|e| ConvertError::Codec(format!("WebP encoding failed: {}", e)))?;
        let encoded = encoder
            .encode_simple(false, quality as f32)
            .map_err(|e| ConvertError::Codec(format!("WebP encoding failed: {:?}", e)))?;
        Ok(encoded.to_vec())
    }

    fn encode_avif(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let (speed, quality) = if self.settings.lossless {
            (1, 100)
        } else {
            (DEFAULT_AVIF_SPEED, self.settings.quality.unwrap_or(DEFAULT_AVIF_QUALITY).max(1))
        };

        let mut buffer = Vec::new();
        let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, speed, quality);
        DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)?;
        Ok(buffer)
    }

    fn encode_tiff(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let level = if self.settings.lossless {
            DeflateLevel::Best
        } else {
            match self.settings.quality {
                Some(q) if q < 34 => DeflateLevel::Best,
                Some(q) if q < 67 => DeflateLevel::Balanced,
                Some(_) => DeflateLevel::Fast,
                None => DeflateLevel::Balanced,
            }
        };

        let rgba = image.to_rgba8();
        let mut cursor = Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut cursor)
            .map_err(|e| ConvertError::Codec(format!("TIFF encoding failed: {}", e)))?;
        encoder
            .write_image_with_compression::<colortype::RGBA8, _>(
                rgba.width(),
                rgba.height(),
                Deflate::with_level(level),
                rgba.as_raw(),
            )
            .map_err(|e| ConvertError::Codec(format!("TIFF encoding failed: {}", e)))?;

        Ok(cursor.into_inner())
    }

    fn encode_generic(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format)?;
        Ok(buffer.into_inner())
    }
}

/// Scales a base quantization table the way libjpeg maps quality to tables.
fn scaled_table(base: &[u16; 64], quality: u8) -> Box<[u16; 64]> {
    let quality = u32::from(quality.clamp(1, 100));
    let scale = if quality < 50 { 5000 / quality } else { 200 - quality * 2 };

    let mut table = [0u16; 64];
    for (scaled, &value) in table.iter_mut().zip(base.iter()) {
        *scaled = ((u32::from(value) * scale + 50) / 100).clamp(1, 255) as u16;
    }
    Box::new(table)
}

fn jpeg_dimensions(image: &DynamicImage) -> Result<(u16, u16)> {
    let too_large = || {
        ConvertError::Codec(format!(
            "JPEG dimensions are limited to 65535x65535, got {}x{}",
            image.width(),
            image.height()
        ))
    };
    let width = u16::try_from(image.width()).map_err(|_| too_large())?;
    let height = u16::try_from(image.height()).map_err(|_| too_large())?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 48, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 5) as u8, 128])
        }))
    }

    fn sniff(bytes: &[u8]) -> &'static str {
        infer::get(bytes).map(|k| k.mime_type()).unwrap_or("unknown")
    }

    #[test]
    fn subsampling_parses() {
        assert_eq!("4:2:0".parse::<ChromaSubsampling>().unwrap(), ChromaSubsampling::Yuv420);
        assert_eq!("444".parse::<ChromaSubsampling>().unwrap(), ChromaSubsampling::Yuv444);
        assert!("4:2:1".parse::<ChromaSubsampling>().is_err());
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let image = gradient();
        let low = Compressor::new(Format::Jpeg, EncodeSettings { quality: Some(10), ..Default::default() })
            .compress_to_bytes(&image)
            .unwrap();
        let high = Compressor::new(Format::Jpeg, EncodeSettings { quality: Some(95), ..Default::default() })
            .compress_to_bytes(&image)
            .unwrap();

        assert_eq!(sniff(&low), "image/jpeg");
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_options_still_decode() {
        let settings = EncodeSettings {
            quality: Some(70),
            progressive: true,
            subsampling: Some(ChromaSubsampling::Yuv444),
            adaptive_quantization: true,
            ..Default::default()
        };
        let bytes = Compressor::new(Format::Jpeg, settings).compress_to_bytes(&gradient()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn adaptive_quantization_follows_quality() {
        let encode = |quality| {
            let settings = EncodeSettings {
                quality: Some(quality),
                adaptive_quantization: true,
                ..Default::default()
            };
            Compressor::new(Format::Jpeg, settings).compress_to_bytes(&gradient()).unwrap()
        };

        let low = encode(5);
        let high = encode(80);
        assert_ne!(low, high);
        assert!(low.len() < high.len());
    }

    #[test]
    fn scaled_table_matches_libjpeg_scaling() {
        assert_eq!(scaled_table(&ADAPTIVE_LUMA_TABLE, 50)[..], ADAPTIVE_LUMA_TABLE[..]);
        assert!(scaled_table(&ADAPTIVE_LUMA_TABLE, 100).iter().all(|&v| v == 1));
        assert!(scaled_table(&ADAPTIVE_CHROMA_TABLE, 1).iter().all(|&v| v == 255));
    }

    #[test]
    fn oversized_webp_is_an_error() {
        let wide = DynamicImage::ImageRgb8(image::RgbImage::new(17000, 1));

        for lossless in [false, true] {
            let settings = EncodeSettings { lossless, ..Default::default() };
            let err = Compressor::new(Format::WebP, settings).compress_to_bytes(&wide).unwrap_err();
            assert!(matches!(err, ConvertError::Codec(_)));
        }
    }

    #[test]
    fn grayscale_jpeg_uses_luma() {
        let gray = DynamicImage::ImageLuma8(gradient().to_luma8());
        let bytes = Compressor::new(Format::Jpeg, EncodeSettings::default())
            .compress_to_bytes(&gray)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_color());
    }

    #[test]
    fn lossless_formats_preserve_pixels() {
        let image = gradient();
        let settings = EncodeSettings { lossless: true, ..Default::default() };

        for format in [Format::Png, Format::WebP, Format::Tiff] {
            let bytes = Compressor::new(format, settings).compress_to_bytes(&image).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.to_rgb8(), image.to_rgb8(), "{format} lost pixels");
        }
    }

    #[test]
    fn outputs_sniff_as_their_format() {
        let image = gradient();
        for format in [Format::Jpeg, Format::Png, Format::WebP, Format::Gif, Format::Tif] {
            let bytes = Compressor::new(format, EncodeSettings::default())
                .compress_to_bytes(&image)
                .unwrap();
            assert_eq!(Some(sniff(&bytes)), format.mime_type(), "{format}");
        }
    }

    #[test]
    fn raw_is_rgba_pixels() {
        let bytes = Compressor::new(Format::Raw, EncodeSettings::default())
            .compress_to_bytes(&gradient())
            .unwrap();
        assert_eq!(bytes.len(), 64 * 48 * 4);
    }

    #[test]
    fn formats_without_encoder_fail_cleanly() {
        for format in [Format::Jp2, Format::J2k, Format::Svg] {
            let err = Compressor::new(format, EncodeSettings::default())
                .compress_to_bytes(&gradient())
                .unwrap_err();
            assert!(matches!(err, ConvertError::Codec(_)));
            assert!(err.to_string().contains(format.name()));
        }
    }

    #[cfg(feature = "heif")]
    #[test]
    fn heic_output_sniffs_as_heif() {
        for settings in [
            EncodeSettings { quality: Some(60), ..Default::default() },
            EncodeSettings { lossless: true, ..Default::default() },
        ] {
            let bytes = Compressor::new(Format::Heic, settings).compress_to_bytes(&gradient()).unwrap();
            assert_eq!(Some(sniff(&bytes)), Format::Heic.mime_type());
        }
    }
}
