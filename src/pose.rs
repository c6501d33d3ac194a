//! Body coverage and orientation classification from landmark confidences.

use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkSet;
use crate::types::{BodyPart, Coverage, Landmark, PoseClassification};

const FULL_BODY_REQUIRED: [BodyPart; 7] = [
    BodyPart::Nose,
    BodyPart::LeftShoulder,
    BodyPart::RightShoulder,
    BodyPart::LeftHip,
    BodyPart::RightHip,
    BodyPart::LeftAnkle,
    BodyPart::RightAnkle,
];

const UPPER_BODY_REQUIRED: [BodyPart; 5] = [
    BodyPart::Nose,
    BodyPart::LeftShoulder,
    BodyPart::RightShoulder,
    BodyPart::LeftElbow,
    BodyPart::RightElbow,
];

/// Tunable limits for [`classify`]. Coordinates are normalized to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseThresholds {
    /// A landmark counts as visible only above this confidence.
    pub visibility_threshold: f32,
    pub min_visible_landmarks: usize,
    /// Minimum vertical spread of the full-body landmarks, as a fraction of
    /// image height.
    pub vertical_spread_ratio: f32,
    pub max_shoulder_y_diff: f32,
    pub max_hip_y_diff: f32,
    pub max_shoulder_z_diff: f32,
    pub max_hip_z_diff: f32,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.65,
            min_visible_landmarks: 8,
            vertical_spread_ratio: 0.6,
            max_shoulder_y_diff: 0.08,
            max_hip_y_diff: 0.08,
            max_shoulder_z_diff: 0.4,
            max_hip_z_diff: 0.4,
        }
    }
}

/// Classify body coverage and front-facing orientation.
pub fn classify(
    landmarks: &[Landmark],
    image_height: u32,
    thresholds: &PoseThresholds,
) -> PoseClassification {
    let set = LandmarkSet::new(landmarks);
    let threshold = thresholds.visibility_threshold;

    let visible_total = set.iter().filter(|lm| lm.visibility > threshold).count();
    if visible_total < thresholds.min_visible_landmarks {
        return PoseClassification::NONE;
    }

    let front_facing = is_front_facing(&set, image_height, thresholds);

    if is_full_body(&set, image_height, thresholds) {
        return PoseClassification {
            coverage: Coverage::Full,
            front_facing,
        };
    }

    let upper_visible = UPPER_BODY_REQUIRED
        .iter()
        .all(|&part| set.visible(part, threshold).is_some());
    if upper_visible {
        return PoseClassification {
            coverage: Coverage::Upper,
            front_facing,
        };
    }

    PoseClassification::NONE
}

fn is_full_body(set: &LandmarkSet, image_height: u32, thresholds: &PoseThresholds) -> bool {
    if image_height == 0 {
        return false;
    }

    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for &part in &FULL_BODY_REQUIRED {
        match set.visible(part, thresholds.visibility_threshold) {
            Some(lm) => {
                min_y = min_y.min(lm.y);
                max_y = max_y.max(lm.y);
            }
            None => return false,
        }
    }

    let height = image_height as f32;
    let spread_px = (max_y - min_y) * height;
    spread_px / height >= thresholds.vertical_spread_ratio
}

/// Left/right symmetry test over nose, shoulders and hips.
fn is_front_facing(set: &LandmarkSet, image_height: u32, thresholds: &PoseThresholds) -> bool {
    if image_height == 0 {
        return false;
    }

    let threshold = thresholds.visibility_threshold;
    let (Some(_nose), Some(l_shoulder), Some(r_shoulder), Some(l_hip), Some(r_hip)) = (
        set.visible(BodyPart::Nose, threshold),
        set.visible(BodyPart::LeftShoulder, threshold),
        set.visible(BodyPart::RightShoulder, threshold),
        set.visible(BodyPart::LeftHip, threshold),
        set.visible(BodyPart::RightHip, threshold),
    ) else {
        return false;
    };

    if (l_shoulder.y - r_shoulder.y).abs() > thresholds.max_shoulder_y_diff {
        return false;
    }
    if (l_hip.y - r_hip.y).abs() > thresholds.max_hip_y_diff {
        return false;
    }

    if [l_shoulder.z, r_shoulder.z, l_hip.z, r_hip.z]
        .iter()
        .any(|z| !z.is_finite())
    {
        return false;
    }

    // A turned body pushes one side of each pair away from the camera.
    if (l_shoulder.z - r_shoulder.z).abs() > thresholds.max_shoulder_z_diff {
        return false;
    }
    if (l_hip.z - r_hip.z).abs() > thresholds.max_hip_z_diff {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(part: BodyPart, y: f32) -> Landmark {
        Landmark::new(part, 0.5, y, 0.0, 0.99)
    }

    /// A front-facing, head-to-toe body with every landmark confidently visible.
    fn full_body() -> Vec<Landmark> {
        BodyPart::ALL
            .iter()
            .map(|&part| {
                let y = match part {
                    BodyPart::Nose => 0.1,
                    BodyPart::LeftShoulder | BodyPart::RightShoulder => 0.25,
                    BodyPart::LeftElbow | BodyPart::RightElbow => 0.4,
                    BodyPart::LeftHip | BodyPart::RightHip => 0.5,
                    BodyPart::LeftAnkle | BodyPart::RightAnkle => 0.9,
                    _ => 0.3,
                };
                lm(part, y)
            })
            .collect()
    }

    fn set(landmarks: &mut [Landmark], part: BodyPart, f: impl Fn(&mut Landmark)) {
        for l in landmarks.iter_mut().filter(|l| l.part == part) {
            f(l);
        }
    }

    fn hide(landmarks: &mut [Landmark], part: BodyPart) {
        set(landmarks, part, |l| l.visibility = 0.1);
    }

    #[test]
    fn full_front_facing_body() {
        let result = classify(&full_body(), 1000, &PoseThresholds::default());
        assert_eq!(result.coverage, Coverage::Full);
        assert!(result.front_facing);
    }

    #[test]
    fn too_few_visible_landmarks_short_circuits() {
        let mut body = full_body();
        for l in body.iter_mut().skip(7) {
            l.visibility = 0.2;
        }
        let result = classify(&body, 1000, &PoseThresholds::default());
        assert_eq!(result, PoseClassification::NONE);
    }

    #[test]
    fn empty_landmarks_are_none() {
        assert_eq!(
            classify(&[], 1000, &PoseThresholds::default()),
            PoseClassification::NONE
        );
    }

    #[test]
    fn missing_front_group_member_disables_front_facing() {
        for part in [
            BodyPart::Nose,
            BodyPart::LeftShoulder,
            BodyPart::RightShoulder,
            BodyPart::LeftHip,
            BodyPart::RightHip,
        ] {
            let mut body = full_body();
            hide(&mut body, part);
            let result = classify(&body, 1000, &PoseThresholds::default());
            assert!(!result.front_facing, "hiding {:?} should disable front facing", part);
        }
    }

    #[test]
    fn shoulder_tilt_above_limit_is_not_front_facing() {
        let mut body = full_body();
        set(&mut body, BodyPart::LeftShoulder, |l| l.y = 0.35);
        let result = classify(&body, 1000, &PoseThresholds::default());
        assert_eq!(result.coverage, Coverage::Full);
        assert!(!result.front_facing);
    }

    #[test]
    fn tilt_exactly_at_limit_passes() {
        let mut body = full_body();
        set(&mut body, BodyPart::LeftShoulder, |l| l.y = 0.0);
        set(&mut body, BodyPart::RightShoulder, |l| l.y = 0.08);
        set(&mut body, BodyPart::LeftHip, |l| l.y = 0.5);
        set(&mut body, BodyPart::RightHip, |l| l.y = 0.5);
        assert!(classify(&body, 1000, &PoseThresholds::default()).front_facing);
    }

    #[test]
    fn hip_tilt_above_limit_is_not_front_facing() {
        let mut body = full_body();
        set(&mut body, BodyPart::RightHip, |l| l.y = 0.6);
        assert!(!classify(&body, 1000, &PoseThresholds::default()).front_facing);
    }

    #[test]
    fn depth_asymmetry_means_turned_body() {
        let mut body = full_body();
        set(&mut body, BodyPart::LeftShoulder, |l| l.z = -0.3);
        set(&mut body, BodyPart::RightShoulder, |l| l.z = 0.3);
        assert!(!classify(&body, 1000, &PoseThresholds::default()).front_facing);

        let mut body = full_body();
        set(&mut body, BodyPart::LeftHip, |l| l.z = 0.5);
        assert!(!classify(&body, 1000, &PoseThresholds::default()).front_facing);
    }

    #[test]
    fn non_finite_depth_is_not_front_facing() {
        let mut body = full_body();
        set(&mut body, BodyPart::RightHip, |l| l.z = f32::NAN);
        assert!(!classify(&body, 1000, &PoseThresholds::default()).front_facing);

        let mut body = full_body();
        set(&mut body, BodyPart::LeftShoulder, |l| l.z = f32::INFINITY);
        assert!(!classify(&body, 1000, &PoseThresholds::default()).front_facing);
    }

    #[test]
    fn cropped_close_up_falls_back_to_upper() {
        // Every required landmark visible but squeezed into the top half.
        let mut body = full_body();
        set(&mut body, BodyPart::LeftAnkle, |l| l.y = 0.45);
        set(&mut body, BodyPart::RightAnkle, |l| l.y = 0.45);
        let result = classify(&body, 1000, &PoseThresholds::default());
        assert_eq!(result.coverage, Coverage::Upper);
        assert!(result.front_facing);
    }

    #[test]
    fn hidden_ankles_give_upper_body() {
        let mut body = full_body();
        hide(&mut body, BodyPart::LeftAnkle);
        let result = classify(&body, 1000, &PoseThresholds::default());
        assert_eq!(result.coverage, Coverage::Upper);
    }

    #[test]
    fn no_full_and_no_elbows_is_none() {
        let mut body = full_body();
        hide(&mut body, BodyPart::LeftAnkle);
        hide(&mut body, BodyPart::RightElbow);
        let result = classify(&body, 1000, &PoseThresholds::default());
        assert_eq!(result, PoseClassification::NONE);
    }

    #[test]
    fn zero_height_never_reports_full() {
        let result = classify(&full_body(), 0, &PoseThresholds::default());
        assert_eq!(result.coverage, Coverage::Upper);
        assert!(!result.front_facing);
    }
}
