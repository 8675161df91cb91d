// pixconv/src/processors/pipeline.rs
//! Ordered transformation plan.
//!
//! A [`TransformPlan`] is built once per item from a [`ConversionRequest`]
//! and then applied to the decoded image. Steps always appear in this order:
//!
//! 1. resize
//! 2. encoding parameters
//! 3. region-of-interest overlay
//! 4. flatten
//! 5. optimizations (sharpen, denoise, grayscale, blur)
//!
//! The final encode runs after the last step with the parameters from step 2.

use crate::core::{ConversionRequest, Flatten, Format, ResizeAlgorithm, Result};
use crate::processors::compressor::{ChromaSubsampling, EncodeSettings};
use crate::processors::effects;
use crate::processors::resizer::{ResizeFit, Resizer};
use crate::utils::{parse_blur, parse_color, parse_compression, parse_regions, parse_resize, Region};
use image::{DynamicImage, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    Resize { width: u32, height: u32, fit: ResizeFit },
    Encoding(EncodeSettings),
    RegionOverlay(Vec<Region>),
    Flatten(Rgba<u8>),
    Sharpen,
    Denoise,
    Grayscale,
    Blur(f32),
}

impl TransformStep {
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::Resize { .. } => "resize",
            TransformStep::Encoding(_) => "encoding",
            TransformStep::RegionOverlay(_) => "roi",
            TransformStep::Flatten(_) => "flatten",
            TransformStep::Sharpen => "sharpen",
            TransformStep::Denoise => "denoise",
            TransformStep::Grayscale => "grayscale",
            TransformStep::Blur(_) => "blur",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformPlan {
    format: Format,
    algorithm: ResizeAlgorithm,
    steps: Vec<TransformStep>,
}

impl TransformPlan {
    /// Validates the deferred values of `request` and lays out the steps.
    pub fn build(request: &ConversionRequest) -> Result<Self> {
        let mut steps = Vec::new();

        if let Some(resize) = &request.resize {
            let (width, height) = parse_resize(resize)?;
            let fit = if request.preserve_aspect_ratio {
                ResizeFit::Inside
            } else {
                ResizeFit::Exact
            };
            steps.push(TransformStep::Resize { width, height, fit });
        }

        steps.push(TransformStep::Encoding(encode_settings(request)?));

        if let Some(roi) = &request.roi_compression {
            let regions = parse_regions(roi)?;
            if !regions.is_empty() {
                steps.push(TransformStep::RegionOverlay(regions));
            }
        }

        match &request.flatten {
            Flatten::Unset => {}
            Flatten::Default => steps.push(TransformStep::Flatten(Rgba([255, 255, 255, 255]))),
            Flatten::Color(color) => {
                let mut background = parse_color(color)?;
                background.0[3] = 255;
                steps.push(TransformStep::Flatten(background));
            }
        }

        if request.auto_optimize {
            if request.sharpen || request.denoise || request.grayscale || request.blur.is_some() {
                log::info!("Auto-optimize is on; individual sharpen/denoise/grayscale/blur flags are ignored");
            }
            steps.push(TransformStep::Sharpen);
            steps.push(TransformStep::Denoise);
        } else {
            if request.sharpen {
                steps.push(TransformStep::Sharpen);
            }
            if request.denoise {
                steps.push(TransformStep::Denoise);
            }
            if request.grayscale {
                steps.push(TransformStep::Grayscale);
            }
            if let Some(blur) = &request.blur {
                steps.push(TransformStep::Blur(parse_blur(blur)?));
            }
        }

        Ok(Self {
            format: request.format,
            algorithm: request.algorithm,
            steps,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// Runs every step in order and returns the final pixels together with
    /// the encoder settings chosen by the encoding step.
    pub fn apply(&self, mut image: DynamicImage) -> Result<(DynamicImage, EncodeSettings)> {
        let resizer = Resizer::new(self.algorithm);
        let mut settings = EncodeSettings::default();

        for step in &self.steps {
            log::debug!("Applying step: {}", step.name());
            image = match step {
                TransformStep::Resize { width, height, fit } => resizer.resize(&image, *width, *height, *fit),
                TransformStep::Encoding(chosen) => {
                    settings = *chosen;
                    image
                }
                TransformStep::RegionOverlay(regions) => effects::overlay_regions(&image, regions)?,
                TransformStep::Flatten(background) => effects::flatten(&image, *background),
                TransformStep::Sharpen => effects::sharpen(&image),
                TransformStep::Denoise => effects::denoise(&image),
                TransformStep::Grayscale => effects::grayscale(&image),
                TransformStep::Blur(sigma) => effects::blur(&image, *sigma),
            };
        }

        Ok((image, settings))
    }
}

/// Picks encoder parameters, degrading unsupported requests to warnings.
fn encode_settings(request: &ConversionRequest) -> Result<EncodeSettings> {
    let format = request.format;
    let caps = format.capabilities();
    let mut settings = EncodeSettings::default();
    let level = request.compression.as_deref().map(parse_compression).transpose()?;

    if request.lossless {
        if caps.lossless {
            settings.lossless = true;
            if level.is_some() {
                log::warn!("Lossless mode selected for {}; compression level is ignored", format);
            }
        } else {
            log::warn!("Lossless mode is not supported for {}; using default encoding", format);
        }
    }

    if let (false, Some(level)) = (settings.lossless, level) {
        if caps.quality {
            settings.quality = Some(level);
        } else {
            log::warn!("Compression is not supported for {}; using default encoding", format);
        }
    }

    if request.progressive {
        if format == Format::Jpeg {
            settings.progressive = true;
        } else {
            log::warn!("Progressive encoding is only supported for jpeg; ignoring it for {}", format);
        }
    }

    if let Some(rate) = &request.subsample {
        if caps.chroma_subsampling {
            settings.subsampling = Some(rate.parse::<ChromaSubsampling>()?);
        } else {
            log::warn!("Chroma subsampling is only supported for jpeg; ignoring it for {}", format);
        }
    }

    if request.adaptive_quantization {
        if caps.adaptive_quantization {
            settings.adaptive_quantization = true;
        } else {
            log::warn!("Adaptive quantization is only supported for jpeg; ignoring it for {}", format);
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConvertError;
    use image::GenericImageView;

    fn request(format: Format) -> ConversionRequest {
        ConversionRequest::new("in.png", "out", format)
    }

    fn names(plan: &TransformPlan) -> Vec<&'static str> {
        plan.steps().iter().map(TransformStep::name).collect()
    }

    #[test]
    fn steps_follow_the_fixed_order() {
        let req = ConversionRequest {
            resize: Some("20x10".into()),
            compression: Some("60".into()),
            roi_compression: Some("0:0:4:4:10".into()),
            flatten: Flatten::Default,
            blur: Some("1.5".into()),
            grayscale: true,
            denoise: true,
            sharpen: true,
            ..request(Format::Jpeg)
        };

        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(
            names(&plan),
            vec!["resize", "encoding", "roi", "flatten", "sharpen", "denoise", "grayscale", "blur"]
        );
    }

    #[test]
    fn auto_optimize_overrides_individual_flags() {
        let req = ConversionRequest {
            auto_optimize: true,
            grayscale: true,
            blur: Some("not-a-number".into()),
            ..request(Format::Png)
        };

        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(names(&plan), vec!["encoding", "sharpen", "denoise"]);
    }

    #[test]
    fn compression_on_unsupported_format_is_skipped() {
        let req = ConversionRequest { compression: Some("50".into()), ..request(Format::Gif) };
        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(plan.steps()[0], TransformStep::Encoding(EncodeSettings::default()));
    }

    #[test]
    fn out_of_range_compression_fails() {
        let req = ConversionRequest { compression: Some("101".into()), ..request(Format::Jpeg) };
        let err = TransformPlan::build(&req).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParameter(_)));
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn lossless_wins_over_compression() {
        let req = ConversionRequest {
            lossless: true,
            compression: Some("40".into()),
            ..request(Format::WebP)
        };
        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(
            plan.steps()[0],
            TransformStep::Encoding(EncodeSettings { lossless: true, ..Default::default() })
        );
    }

    #[test]
    fn lossless_still_rejects_out_of_range_compression() {
        let req = ConversionRequest {
            lossless: true,
            compression: Some("500".into()),
            ..request(Format::Png)
        };

        let err = TransformPlan::build(&req).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParameter(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn lossless_on_jpeg_falls_back_to_quality() {
        let req = ConversionRequest {
            lossless: true,
            compression: Some("40".into()),
            ..request(Format::Jpeg)
        };
        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(
            plan.steps()[0],
            TransformStep::Encoding(EncodeSettings { quality: Some(40), ..Default::default() })
        );
    }

    #[test]
    fn jpeg_only_options() {
        let jpeg = ConversionRequest {
            progressive: true,
            subsample: Some("4:2:0".into()),
            adaptive_quantization: true,
            ..request(Format::Jpeg)
        };
        let plan = TransformPlan::build(&jpeg).unwrap();
        assert_eq!(
            plan.steps()[0],
            TransformStep::Encoding(EncodeSettings {
                progressive: true,
                subsampling: Some(ChromaSubsampling::Yuv420),
                adaptive_quantization: true,
                ..Default::default()
            })
        );

        let png = ConversionRequest { format: Format::Png, ..jpeg };
        let plan = TransformPlan::build(&png).unwrap();
        assert_eq!(plan.steps()[0], TransformStep::Encoding(EncodeSettings::default()));
    }

    #[test]
    fn bad_values_are_reported() {
        let bad_resize = ConversionRequest { resize: Some("big".into()), ..request(Format::Png) };
        assert!(TransformPlan::build(&bad_resize).is_err());

        let bad_blur = ConversionRequest { blur: Some("0".into()), ..request(Format::Png) };
        assert!(TransformPlan::build(&bad_blur).is_err());

        let bad_color = ConversionRequest { flatten: Flatten::Color("nope".into()), ..request(Format::Png) };
        assert!(TransformPlan::build(&bad_color).is_err());
    }

    #[test]
    fn explicit_flatten_color_is_opaque() {
        let req = ConversionRequest { flatten: Flatten::Color("#00000000".into()), ..request(Format::Png) };
        let plan = TransformPlan::build(&req).unwrap();
        assert_eq!(plan.steps()[1], TransformStep::Flatten(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn apply_resizes_and_returns_settings() {
        let req = ConversionRequest {
            resize: Some("30x10".into()),
            compression: Some("70".into()),
            ..request(Format::Jpeg)
        };
        let plan = TransformPlan::build(&req).unwrap();
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(60, 60));

        let (out, settings) = plan.apply(image).unwrap();
        assert_eq!(out.dimensions(), (30, 10));
        assert_eq!(settings.quality, Some(70));
    }
}
