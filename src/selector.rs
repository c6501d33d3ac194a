//! Representative image selection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fetch::ImageSource;
use crate::pipeline::{run_stage, Pipeline};
use crate::types::{CandidateImage, Coverage, PipelineOutput};

/// Selection tiers, best first.
const TIERS: [&str; 4] = [
    "full body, front facing",
    "full body, any orientation",
    "upper body, front facing",
    "upper body, any orientation",
];

fn best_tier(candidate: &CandidateImage) -> Option<usize> {
    match (candidate.coverage, candidate.front_facing) {
        (Coverage::Full, true) => Some(0),
        (Coverage::Full, false) => Some(1),
        (Coverage::Upper, true) => Some(2),
        (Coverage::Upper, false) => Some(3),
        (Coverage::None, _) => None,
    }
}

/// Pick the best candidate in a single pass.
///
/// Tiers are tried in order and the earliest candidate in a tier wins. A
/// front-facing full body also satisfies "full body, any orientation", but it
/// already wins outright at the first tier, so tracking the first candidate
/// per best tier is enough.
pub fn select_best(candidates: &[CandidateImage]) -> Option<(usize, &CandidateImage)> {
    let mut first_in_tier: [Option<&CandidateImage>; 4] = [None; 4];
    for candidate in candidates {
        if let Some(tier) = best_tier(candidate) {
            first_in_tier[tier].get_or_insert(candidate);
        }
    }
    first_in_tier
        .iter()
        .enumerate()
        .find_map(|(tier, c)| c.map(|c| (tier, c)))
}

/// Deduplicate `urls`, preserving first-seen order.
pub fn dedupe_urls(urls: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(urls.len());
    for url in urls {
        if !seen.contains(&url.as_str()) {
            seen.push(url);
        }
    }
    seen
}

/// Fetch and classify every candidate URL, then select one.
///
/// Candidates that fail to download, decode or classify are skipped.
pub async fn select_representative_image(
    urls: &[String],
    source: &dyn ImageSource,
    pose: Arc<dyn Pipeline>,
) -> Option<CandidateImage> {
    let unique = dedupe_urls(urls);
    debug!(count = unique.len(), "unique candidate urls");

    let mut candidates = Vec::new();
    for url in unique {
        let image = match source.fetch_image(url).await {
            Ok(image) => image,
            Err(e) => {
                warn!(url, "skipping candidate: {}", e);
                continue;
            }
        };
        let classification = match run_stage(pose.clone(), image).await {
            Ok(Some(PipelineOutput::Pose(c))) => c,
            Ok(_) => continue,
            Err(e) => {
                warn!(url, "classification failed: {:#}", e);
                continue;
            }
        };
        if classification.coverage == Coverage::None {
            continue;
        }
        debug!(
            url,
            coverage = ?classification.coverage,
            front = classification.front_facing,
            "classified candidate"
        );
        candidates.push(CandidateImage {
            url: url.to_string(),
            coverage: classification.coverage,
            front_facing: classification.front_facing,
        });
    }

    let (tier, chosen) = select_best(&candidates)?;
    info!(url = %chosen.url, "selected priority {}: {}", tier + 1, TIERS[tier]);
    Some(chosen.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, coverage: Coverage, front_facing: bool) -> CandidateImage {
        CandidateImage {
            url: url.to_string(),
            coverage,
            front_facing,
        }
    }

    #[test]
    fn full_body_beats_front_facing_upper() {
        let candidates = vec![
            candidate("upper-front", Coverage::Upper, true),
            candidate("full-side", Coverage::Full, false),
        ];
        let (tier, chosen) = select_best(&candidates).unwrap();
        assert_eq!(chosen.url, "full-side");
        assert_eq!(tier, 1);
    }

    #[test]
    fn front_facing_full_wins_regardless_of_position() {
        let candidates = vec![
            candidate("full-side", Coverage::Full, false),
            candidate("upper-front", Coverage::Upper, true),
            candidate("full-front", Coverage::Full, true),
        ];
        assert_eq!(select_best(&candidates).unwrap().1.url, "full-front");
    }

    #[test]
    fn earliest_candidate_wins_within_tier() {
        let candidates = vec![
            candidate("upper-a", Coverage::Upper, false),
            candidate("upper-b", Coverage::Upper, true),
            candidate("upper-c", Coverage::Upper, true),
        ];
        let (tier, chosen) = select_best(&candidates).unwrap();
        assert_eq!(chosen.url, "upper-b");
        assert_eq!(tier, 2);

        let only_side = vec![
            candidate("upper-a", Coverage::Upper, false),
            candidate("upper-b", Coverage::Upper, false),
        ];
        assert_eq!(select_best(&only_side).unwrap().1.url, "upper-a");
    }

    #[test]
    fn nothing_usable_selects_nothing() {
        assert!(select_best(&[]).is_none());
        let none = vec![candidate("x", Coverage::None, false)];
        assert!(select_best(&none).is_none());
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let urls: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(dedupe_urls(&urls), vec!["b", "a", "c"]);
    }
}
