// pixconv/src/processors/effects.rs
use crate::core::{ConvertError, Result};
use crate::processors::compressor::Compressor;
use crate::utils::Region;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;
const DENOISE_RADIUS: u32 = 1;

/// Composites the image over an opaque `background`, dropping alpha.
pub fn flatten(image: &DynamicImage, background: Rgba<u8>) -> DynamicImage {
    let [back_r, back_g, back_b, _] = background.0;
    let rgba = image.to_rgba8();

    let flattened = image::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |fg: u8, back: u8| ((fg as u32 * alpha + back as u32 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r, back_r), blend(g, back_g), blend(b, back_b)])
    });

    DynamicImage::ImageRgb8(flattened)
}

pub fn sharpen(image: &DynamicImage) -> DynamicImage {
    image.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Median filter over a 3x3 neighbourhood.
pub fn denoise(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let filtered = imageproc::filter::median_filter(&rgba, DENOISE_RADIUS, DENOISE_RADIUS);
    with_color_type_of(filtered, image)
}

pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    image.grayscale()
}

pub fn blur(image: &DynamicImage, sigma: f32) -> DynamicImage {
    image.blur(sigma)
}

/// Re-encodes each region at its own JPEG level and paints it back in place.
/// Later regions are painted over earlier ones. Alpha inside a region is kept.
pub fn overlay_regions(image: &DynamicImage, regions: &[Region]) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let mut canvas: RgbaImage = image.to_rgba8();

    for region in regions {
        let fits = region.x.checked_add(region.width).is_some_and(|right| right <= width)
            && region.y.checked_add(region.height).is_some_and(|bottom| bottom <= height);
        if !fits {
            return Err(ConvertError::InvalidParameter(format!(
                "Region {}:{}:{}:{} lies outside the {}x{} image",
                region.x, region.y, region.width, region.height, width, height
            )));
        }

        let original = image::imageops::crop_imm(&canvas, region.x, region.y, region.width, region.height).to_image();
        let reencoded = Compressor::jpeg_round_trip(&DynamicImage::ImageRgba8(original.clone()), region.quality)?;

        let mut patch = reencoded.to_rgba8();
        for (patched, source) in patch.pixels_mut().zip(original.pixels()) {
            patched.0[3] = source.0[3];
        }

        log::debug!(
            "Region {}:{} {}x{} re-encoded at level {}",
            region.x, region.y, region.width, region.height, region.quality
        );
        image::imageops::replace(&mut canvas, &patch, region.x as i64, region.y as i64);
    }

    Ok(with_color_type_of(canvas, image))
}

/// Converts an 8-bit RGBA working buffer back to the channel layout of `like`.
fn with_color_type_of(rgba: RgbaImage, like: &DynamicImage) -> DynamicImage {
    let working = DynamicImage::ImageRgba8(rgba);
    let color = like.color();
    match (color.has_color(), color.has_alpha()) {
        (true, true) => working,
        (true, false) => DynamicImage::ImageRgb8(working.to_rgb8()),
        (false, true) => DynamicImage::ImageLumaA8(working.to_luma_alpha8()),
        (false, false) => DynamicImage::ImageLuma8(working.to_luma8()),
    }
}
