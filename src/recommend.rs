//! Ranking of catalog products by skin tone similarity.

use image::RgbImage;
use tracing::{debug, info};

use crate::color::SkinTone;
use crate::error::NoRecommendation;
use crate::skin::{self, SkinToneSettings};
use crate::types::{ProductRecord, RecommendationResult};

/// Rank `catalog` rows of `gender` by distance to `user_tone` and keep the
/// closest `top_n`.
///
/// Gender matching ignores case. Rows without a skin tone are never ranked.
/// Equal distances keep catalog order. A successful result is never empty.
pub fn recommend(
    catalog: &[ProductRecord],
    gender: &str,
    user_tone: SkinTone,
    top_n: usize,
) -> Result<Vec<RecommendationResult>, NoRecommendation> {
    if top_n == 0 {
        return Err(NoRecommendation::NothingRequested);
    }

    let wanted = gender.to_lowercase();
    let matching: Vec<&ProductRecord> = catalog
        .iter()
        .filter(|p| p.gender.to_lowercase() == wanted)
        .collect();

    if matching.is_empty() {
        return Err(NoRecommendation::NoGenderMatch {
            gender: gender.to_string(),
        });
    }
    info!(count = matching.len(), gender, "products match gender");

    let mut ranked: Vec<RecommendationResult> = matching
        .into_iter()
        .filter_map(|p| {
            let tone = p.skin_tone?;
            Some(RecommendationResult {
                product_id: p.id.clone(),
                price: p.price.clone(),
                representative_image_url: p.representative_image_url.clone(),
                source_url: p.source_url.clone(),
                color_distance: user_tone.distance(&tone),
            })
        })
        .collect();

    if ranked.is_empty() {
        return Err(NoRecommendation::NoUsableColor {
            gender: gender.to_string(),
        });
    }

    // sort_by is stable, so ties stay in catalog order.
    ranked.sort_by(|a, b| a.color_distance.total_cmp(&b.color_distance));
    ranked.truncate(top_n);
    debug!(returned = ranked.len(), "ranking complete");

    Ok(ranked)
}

/// Distinct genders present in `catalog`, lowercased and sorted.
pub fn available_genders(catalog: &[ProductRecord]) -> Vec<String> {
    let mut genders: Vec<String> = catalog.iter().map(|p| p.gender.to_lowercase()).collect();
    genders.sort();
    genders.dedup();
    genders
}

/// Extract the user's tone from `photo` and rank against it.
pub fn recommend_for_photo(
    catalog: &[ProductRecord],
    gender: &str,
    photo: &RgbImage,
    settings: &SkinToneSettings,
    top_n: usize,
) -> Result<Vec<RecommendationResult>, NoRecommendation> {
    let tone = skin::user_tone(photo, settings).ok_or(NoRecommendation::NoUserTone)?;
    info!(tone = %tone, "detected user skin tone");
    recommend(catalog, gender, tone, top_n)
}
