//! Robustness tests for perceptual fingerprints.
//!
//! These tests verify that fingerprints stay close after common, benign
//! transformations (re-encoding, resizing, light edits) and stay far apart for
//! visually different images.

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use imprint_core::fingerprint::{similarity_percent, PerceptualHasher, NEAR_DUPLICATE_THRESHOLD};
use std::io::Cursor;

/// Maximum acceptable Hamming distance for re-encoded or resized images.
/// With a 64-bit fingerprint, 10 bits is about 15% difference.
const SIMILARITY_THRESHOLD: u32 = 10;

/// Threshold for edits that move content (crops): the near-duplicate bound.
const EDIT_THRESHOLD: u32 = 16;

/// Create a test image with recognizable structure.
fn create_test_image(width: u32, height: u32) -> RgbImage {
    let mut img = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let r = ((x as f32 / width as f32) * 255.0) as u8;
        let g = ((y as f32 / height as f32) * 255.0) as u8;
        let b = (((x + y) as f32 / (width + height) as f32) * 200.0) as u8;

        let pattern = if (x / 20 + y / 20) % 2 == 0 { 30 } else { 0 };
        *pixel = Rgb([r.saturating_add(pattern), g, b]);
    }

    img
}

/// Compress an image to JPEG with the specified quality (1-100).
fn compress_jpeg(img: &DynamicImage, quality: u8) -> DynamicImage {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder).expect("JPEG encoding failed");
    image::load_from_memory(&buffer.into_inner()).expect("JPEG decoding failed")
}

/// Resize an image by the given percentage.
fn resize_image(img: &DynamicImage, percentage: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    img.resize_exact(
        width * percentage / 100,
        height * percentage / 100,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Crop the image by removing a percentage from each edge.
fn crop_image(img: &DynamicImage, edge_percentage: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let crop_x = width * edge_percentage / 100;
    let crop_y = height * edge_percentage / 100;
    img.crop_imm(crop_x, crop_y, width - 2 * crop_x, height - 2 * crop_y)
}

fn brighten(img: &DynamicImage, amount: u8) -> DynamicImage {
    let mut rgb = img.to_rgb8();
    for pixel in rgb.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = c.saturating_add(amount);
        }
    }
    DynamicImage::ImageRgb8(rgb)
}

fn distance(a: &DynamicImage, b: &DynamicImage) -> u32 {
    let hasher = PerceptualHasher::default();
    hasher.hash_image(a).distance(&hasher.hash_image(b))
}

fn original() -> DynamicImage {
    DynamicImage::ImageRgb8(create_test_image(256, 256))
}

#[test]
fn test_fingerprint_jpeg_compression_90() {
    let d = distance(&original(), &compress_jpeg(&original(), 90));
    println!("JPEG 90% quality - Hamming distance: {d}");
    assert!(d <= SIMILARITY_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_jpeg_compression_70() {
    let d = distance(&original(), &compress_jpeg(&original(), 70));
    println!("JPEG 70% quality - Hamming distance: {d}");
    assert!(d <= SIMILARITY_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_resize_50() {
    let d = distance(&original(), &resize_image(&original(), 50));
    println!("Resize 50% - Hamming distance: {d}");
    assert!(d <= SIMILARITY_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_resize_200() {
    let d = distance(&original(), &resize_image(&original(), 200));
    println!("Resize 200% - Hamming distance: {d}");
    assert!(d <= SIMILARITY_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_brightness_shift() {
    let d = distance(&original(), &brighten(&original(), 6));
    println!("Brightness +6 - Hamming distance: {d}");
    assert!(d <= SIMILARITY_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_small_crop_is_near_duplicate() {
    let d = distance(&original(), &crop_image(&original(), 3));
    println!("Crop 3% - Hamming distance: {d}");
    assert!(d <= EDIT_THRESHOLD, "distance {d}");
    assert!(similarity_percent(d) >= NEAR_DUPLICATE_THRESHOLD);
}

#[test]
fn test_fingerprint_different_images_are_far() {
    let d = distance(&original(), &original().rotate180());
    println!("Rotated 180 - Hamming distance: {d}");
    assert!(d > EDIT_THRESHOLD, "distance {d}");
}

#[test]
fn test_fingerprint_same_pixels_any_container() {
    let png = {
        let mut buf = Cursor::new(Vec::new());
        original()
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    };
    let hasher = PerceptualHasher::default();
    assert_eq!(
        hasher.hash_bytes(&png).unwrap(),
        hasher.hash_image(&original())
    );
}
