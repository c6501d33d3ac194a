//! Dominant skin tone extraction.
//!
//! Pixels are converted to 8-bit HSV (hue halved into 0..180, saturation and
//! value in 0..=255), masked to a skin-colored band, and reduced to a single
//! color with one-cluster k-means.

use image::{Rgb, RgbImage};
use linfa::traits::Fit;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::color::SkinTone;

const CLUSTERS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinToneSettings {
    /// Inclusive lower HSV bound.
    pub lower_hsv: [u8; 3],
    /// Inclusive upper HSV bound.
    pub upper_hsv: [u8; 3],
    pub min_pixels_catalog: usize,
    /// User photos are often cropped tighter, so fewer pixels are required.
    pub min_pixels_user: usize,
}

impl Default for SkinToneSettings {
    fn default() -> Self {
        Self {
            lower_hsv: [0, 40, 50],
            upper_hsv: [25, 150, 255],
            min_pixels_catalog: 500,
            min_pixels_user: 300,
        }
    }
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(pixel: &Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    // Half-degree hue, rounded before negative angles wrap into 0..180.
    let half = if diff == 0.0 {
        0.0
    } else if v == r {
        30.0 * (g - b) / diff
    } else if v == g {
        60.0 + 30.0 * (b - r) / diff
    } else {
        120.0 + 30.0 * (r - g) / diff
    };
    let mut h = half.round();
    if h < 0.0 {
        h += 180.0;
    }

    [(h as u32 % 180) as u8, s.round() as u8, v as u8]
}

fn in_band(hsv: [u8; 3], lower: [u8; 3], upper: [u8; 3]) -> bool {
    (0..3).all(|i| hsv[i] >= lower[i] && hsv[i] <= upper[i])
}

/// Collect every pixel inside the skin band.
pub fn skin_pixels(image: &RgbImage, settings: &SkinToneSettings) -> Vec<[u8; 3]> {
    image
        .pixels()
        .filter(|p| in_band(rgb_to_hsv(p), settings.lower_hsv, settings.upper_hsv))
        .map(|p| p.0)
        .collect()
}

/// Extract the dominant skin tone, or `None` when fewer than `min_pixels`
/// skin-colored pixels are present.
pub fn extract_dominant_skin_tone(
    image: &RgbImage,
    settings: &SkinToneSettings,
    min_pixels: usize,
) -> Option<SkinTone> {
    let pixels = skin_pixels(image, settings);
    if pixels.is_empty() || pixels.len() < min_pixels {
        debug!(
            found = pixels.len(),
            required = min_pixels,
            "insufficient skin pixels"
        );
        return None;
    }

    let center = if pixels.iter().all(|p| *p == pixels[0]) {
        debug!("single skin color, skipping k-means");
        mean_color(&pixels)
    } else {
        match cluster_center(&pixels) {
            Ok(center) => center,
            Err(e) => {
                warn!("k-means failed ({}), using mean", e);
                mean_color(&pixels)
            }
        }
    };

    Some(to_tone(center))
}

/// Catalog photos use the stricter pixel threshold.
pub fn catalog_tone(image: &RgbImage, settings: &SkinToneSettings) -> Option<SkinTone> {
    extract_dominant_skin_tone(image, settings, settings.min_pixels_catalog)
}

pub fn user_tone(image: &RgbImage, settings: &SkinToneSettings) -> Option<SkinTone> {
    extract_dominant_skin_tone(image, settings, settings.min_pixels_user)
}

fn cluster_center(pixels: &[[u8; 3]]) -> anyhow::Result<[f64; 3]> {
    let flat: Vec<f64> = pixels
        .iter()
        .flat_map(|p| p.iter().map(|&c| c as f64))
        .collect();
    let records = Array2::from_shape_vec((pixels.len(), 3), flat)?;
    let dataset = DatasetBase::from(records);

    let model = KMeans::params(CLUSTERS).fit(&dataset)?;
    let centroid = model.centroids().row(0);
    let center = [centroid[0], centroid[1], centroid[2]];
    if center.iter().any(|c| !c.is_finite()) {
        anyhow::bail!("non-finite centroid {:?}", center);
    }
    Ok(center)
}

fn mean_color(pixels: &[[u8; 3]]) -> [f64; 3] {
    let mut sum = [0.0f64; 3];
    for p in pixels {
        for i in 0..3 {
            sum[i] += p[i] as f64;
        }
    }
    let n = pixels.len().max(1) as f64;
    sum.map(|s| s / n)
}

/// Truncate each channel toward zero, clamped into the u8 range.
fn to_tone(center: [f64; 3]) -> SkinTone {
    let [r, g, b] = center.map(|c| c.trunc().clamp(0.0, 255.0) as u8);
    SkinTone::new(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: Rgb<u8> = Rgb([200, 150, 120]);

    #[test]
    fn hsv_conversion_matches_8bit_convention() {
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 0])), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([0, 255, 0])), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 255])), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(&Rgb([0, 0, 0])), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(&Rgb([128, 128, 128])), [0, 0, 128]);
        assert_eq!(rgb_to_hsv(&SKIN), [11, 102, 200]);
    }

    #[test]
    fn hue_just_below_zero_rounds_to_red() {
        assert_eq!(rgb_to_hsv(&Rgb([200, 100, 101])), [0, 128, 200]);
        assert_eq!(rgb_to_hsv(&Rgb([200, 100, 102])), [179, 128, 200]);
        assert_eq!(rgb_to_hsv(&Rgb([255, 0, 1])), [0, 255, 255]);
    }

    #[test]
    fn reddish_skin_with_blue_above_green_is_detected() {
        let image = RgbImage::from_pixel(30, 30, Rgb([200, 100, 101]));
        let tone = catalog_tone(&image, &SkinToneSettings::default());
        assert_eq!(tone, Some(SkinTone::new(200, 100, 101)));
    }

    #[test]
    fn uniform_skin_image_yields_that_color() {
        let image = RgbImage::from_pixel(30, 30, SKIN);
        let tone = catalog_tone(&image, &SkinToneSettings::default());
        assert_eq!(tone, Some(SkinTone::new(200, 150, 120)));
    }

    #[test]
    fn no_skin_pixels_is_undetectable() {
        let image = RgbImage::from_pixel(40, 40, Rgb([20, 40, 220]));
        assert_eq!(catalog_tone(&image, &SkinToneSettings::default()), None);
        assert_eq!(user_tone(&image, &SkinToneSettings::default()), None);
    }

    #[test]
    fn user_threshold_is_looser_than_catalog() {
        // 20x20 = 400 skin pixels: between the user and catalog minimums.
        let image = RgbImage::from_pixel(20, 20, SKIN);
        let settings = SkinToneSettings::default();
        assert_eq!(catalog_tone(&image, &settings), None);
        assert_eq!(user_tone(&image, &settings), Some(SkinTone::new(200, 150, 120)));
    }

    #[test]
    fn non_skin_pixels_are_ignored() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 255]));
        for y in 0..30 {
            for x in 0..30 {
                image.put_pixel(x, y, SKIN);
            }
        }
        let tone = catalog_tone(&image, &SkinToneSettings::default());
        assert_eq!(tone, Some(SkinTone::new(200, 150, 120)));
    }

    #[test]
    fn two_tones_cluster_near_their_mean() {
        let mut image = RgbImage::from_pixel(40, 20, SKIN);
        for y in 0..20 {
            for x in 20..40 {
                image.put_pixel(x, y, Rgb([180, 130, 100]));
            }
        }
        let tone = catalog_tone(&image, &SkinToneSettings::default()).expect("tone");
        for (got, want) in [(tone.r, 190), (tone.g, 140), (tone.b, 110)] {
            assert!(got.abs_diff(want) <= 1, "channel {} too far from {}", got, want);
        }
    }

    #[test]
    fn mean_truncates() {
        let mean = mean_color(&[[1, 2, 3], [2, 3, 5]]);
        assert_eq!(to_tone(mean), SkinTone::new(1, 2, 4));
    }
}
