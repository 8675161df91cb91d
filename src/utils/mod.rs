// pixconv/src/utils/mod.rs
use crate::core::{ConvertError, Result};
use image::Rgba;
use std::path::{Path, PathBuf};

/// Returns `directory/base.ext`, or the first free `base_N.ext`, creating
/// `directory` (and any missing ancestors) first.
///
/// The existence check and the later write are not atomic; callers must not
/// name files into the same directory concurrently.
pub fn unique_output_path(directory: &Path, base_name: &str, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)?;

    let mut candidate = directory.join(format!("{}.{}", base_name, extension));
    let mut counter = 1;

    // Ensure we don't overwrite existing files
    while candidate.exists() {
        candidate = directory.join(format!("{}_{}.{}", base_name, counter, extension));
        counter += 1;
    }

    Ok(candidate)
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

/// Parses a compression level in `0..=100`.
pub fn parse_compression(value: &str) -> Result<u8> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|level| (0..=100).contains(level))
        .map(|level| level as u8)
        .ok_or_else(|| {
            ConvertError::InvalidParameter(format!(
                "Invalid compression value '{}'. Compression must be an integer between 0 and 100.",
                value
            ))
        })
}

/// Parses `WIDTHxHEIGHT` (either `x` or `X`), both positive integers.
pub fn parse_resize(value: &str) -> Result<(u32, u32)> {
    let invalid = || {
        ConvertError::InvalidParameter(format!(
            "Invalid resize value '{}'. Expected WIDTHxHEIGHT with positive integers, e.g. 800x600.",
            value
        ))
    };

    let (width, height) = value.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}

/// Parses a blur sigma; it must be a finite number above zero.
pub fn parse_blur(value: &str) -> Result<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|sigma| sigma.is_finite() && *sigma > 0.0)
        .ok_or_else(|| {
            ConvertError::InvalidParameter(format!(
                "Invalid blur value '{}'. Blur sigma must be a positive number.",
                value
            ))
        })
}

/// One `x:y:width:height:level` entry of `--roi-compression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

/// Parses a comma-separated region list, keeping the given order.
pub fn parse_regions(value: &str) -> Result<Vec<Region>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_region)
        .collect()
}

fn parse_region(entry: &str) -> Result<Region> {
    let invalid = |why: &str| {
        ConvertError::InvalidParameter(format!(
            "Invalid region '{}'. Expected x:y:width:height:compression ({}).",
            entry, why
        ))
    };

    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    if parts.len() != 5 {
        return Err(invalid("five fields required"));
    }

    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts[..4]) {
        *slot = part.parse().map_err(|_| invalid("non-negative integers required"))?;
    }

    let [x, y, width, height] = numbers;
    if width == 0 || height == 0 {
        return Err(invalid("width and height must be positive"));
    }

    let quality = parse_compression(parts[4]).map_err(|_| invalid("compression must be 0-100"))?;

    Ok(Region { x, y, width, height, quality })
}

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or a common color name.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let invalid = || ConvertError::InvalidParameter(format!("Invalid color '{}'", value));
    let value_lower = value.trim().to_lowercase();

    if let Some(hex) = value_lower.strip_prefix('#').filter(|h| h.is_ascii()) {
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        return match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                    let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                    *slot = v * 17;
                }
                Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
            }
            6 => Ok(Rgba([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255])),
            8 => Ok(Rgba([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            ])),
            _ => Err(invalid()),
        };
    }

    let rgb = match value_lower.as_str() {
        "white" => [255, 255, 255],
        "black" => [0, 0, 0],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" | "aqua" => [0, 255, 255],
        "magenta" | "fuchsia" => [255, 0, 255],
        "gray" | "grey" => [128, 128, 128],
        "silver" => [192, 192, 192],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "navy" => [0, 0, 128],
        "teal" => [0, 128, 128],
        "maroon" => [128, 0, 0],
        "olive" => [128, 128, 0],
        _ => return Err(invalid()),
    };

    Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Name used for log lines and for deriving the output file name.
pub fn item_name(source: &str) -> String {
    let trimmed = source.split(['?', '#']).next().unwrap_or(source);
    trimmed
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

/// File stem of an item name, `image` when nothing usable is left.
pub fn base_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(sanitize_filename)
        .unwrap_or_else(|| "image".to_string())
}

pub fn sanitize_filename(filename: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    filename
        .chars()
        .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[test]
    fn unique_names_increment() {
        let temp = TempDir::new().unwrap();

        let first = unique_output_path(temp.path(), "foo", "png").unwrap();
        assert_eq!(first, temp.path().join("foo.png"));
        std::fs::write(&first, b"x").unwrap();

        let second = unique_output_path(temp.path(), "foo", "png").unwrap();
        assert_eq!(second, temp.path().join("foo_1.png"));
        std::fs::write(&second, b"x").unwrap();

        let third = unique_output_path(temp.path(), "foo", "png").unwrap();
        assert_eq!(third, temp.path().join("foo_2.png"));
    }

    #[test]
    fn unique_output_path_creates_directories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.child("a/b/c");

        let path = unique_output_path(nested.path(), "photo", "webp").unwrap();

        assert!(nested.path().is_dir());
        assert_eq!(path, nested.path().join("photo.webp"));
    }

    #[test]
    fn other_extensions_do_not_collide() {
        let temp = TempDir::new().unwrap();
        temp.child("foo.png").write_binary(b"x").unwrap();

        let path = unique_output_path(temp.path(), "foo", "jpeg").unwrap();
        assert_eq!(path, temp.path().join("foo.jpeg"));
    }

    #[test]
    fn compression_bounds() {
        assert_eq!(parse_compression("0").unwrap(), 0);
        assert_eq!(parse_compression("100").unwrap(), 100);
        assert_eq!(parse_compression(" 55 ").unwrap(), 55);
        assert!(parse_compression("101").is_err());
        assert!(parse_compression("-1").is_err());
        assert!(parse_compression("high").is_err());
    }

    #[test]
    fn resize_syntax() {
        assert_eq!(parse_resize("300x200").unwrap(), (300, 200));
        assert_eq!(parse_resize("300X200").unwrap(), (300, 200));
        assert!(parse_resize("300").is_err());
        assert!(parse_resize("0x200").is_err());
        assert!(parse_resize("axb").is_err());
        assert!(parse_resize("-3x4").is_err());

        let message = parse_resize("wide").unwrap_err().to_string();
        assert!(message.contains("wide"));
    }

    #[test]
    fn blur_must_be_positive() {
        assert_eq!(parse_blur("1.5").unwrap(), 1.5);
        assert!(parse_blur("0").is_err());
        assert!(parse_blur("-2").is_err());
        assert!(parse_blur("NaN").is_err());
        assert!(parse_blur("inf").is_err());
    }

    #[test]
    fn regions_keep_order() {
        let regions = parse_regions("0:0:10:10:20, 5:5:4:4:90").unwrap();
        assert_eq!(
            regions,
            vec![
                Region { x: 0, y: 0, width: 10, height: 10, quality: 20 },
                Region { x: 5, y: 5, width: 4, height: 4, quality: 90 },
            ]
        );
        assert!(parse_regions("0:0:10:10").is_err());
        assert!(parse_regions("0:0:0:10:50").is_err());
        assert!(parse_regions("0:0:10:10:101").is_err());
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("white").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_color("#000").unwrap(), Rgba([0, 0, 0, 255]));
        assert_eq!(parse_color("#ff8000").unwrap(), Rgba([255, 128, 0, 255]));
        assert_eq!(parse_color("#FF800080").unwrap(), Rgba([255, 128, 0, 128]));
        assert!(parse_color("#12").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn item_names() {
        assert_eq!(item_name("https://example.com/img/cat.png?size=2"), "cat.png");
        assert_eq!(item_name("photos/dog.jpg"), "dog.jpg");
        assert_eq!(item_name("https://example.com/"), "example.com");
        assert_eq!(base_name("dog.jpg"), "dog");
        assert_eq!(base_name(".hidden"), ".hidden");
        assert_eq!(base_name(""), "image");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(2048), "2.00 KB");
    }
}
