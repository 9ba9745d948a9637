//! Planar angle primitives over keypoints.
//!
//! All results are in degrees. Coordinates are not assumed to lie in
//! [0, 1]; anything finite works.

use crate::types::Keypoint;

/// Rays shorter than this are treated as degenerate.
const MIN_RAY_LENGTH: f64 = 1e-9;

/// Angle at vertex `b` between rays `b→a` and `b→c`.
///
/// Uses the dot product formula: cos(θ) = (ba · bc) / (|ba| × |bc|)
///
/// Returns a value in [0, 180]. When either ray has zero length (two of the
/// points coincide) or an input is not finite, the angle is undefined and
/// 0.0 is returned.
pub fn angle(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> f64 {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);

    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let mag_ba = ba.0.hypot(ba.1);
    let mag_bc = bc.0.hypot(bc.1);

    // Negated so NaN magnitudes also take the fallback
    if !(mag_ba > MIN_RAY_LENGTH && mag_bc > MIN_RAY_LENGTH) {
        return 0.0;
    }

    let cos_angle = dot / (mag_ba * mag_bc);
    if !cos_angle.is_finite() {
        return 0.0;
    }

    // Rounding can push the ratio just past ±1
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Rotation of the shoulder line relative to the hip line.
///
/// Each line is measured with `atan2` of its right-minus-left vector. The
/// difference is normalized into (-180, 180]. Positive means the shoulders
/// are turned clockwise relative to the hips on screen (image y grows
/// downward), i.e. a rotation to the right.
///
/// Non-finite inputs yield 0.0.
pub fn torso_rotation(
    left_shoulder: &Keypoint,
    right_shoulder: &Keypoint,
    left_hip: &Keypoint,
    right_hip: &Keypoint,
) -> f64 {
    let shoulder_line = (right_shoulder.y - left_shoulder.y).atan2(right_shoulder.x - left_shoulder.x);
    let hip_line = (right_hip.y - left_hip.y).atan2(right_hip.x - left_hip.x);

    let rotation = (shoulder_line - hip_line).to_degrees();
    if !rotation.is_finite() {
        return 0.0;
    }

    // Both atan2 results lie in (-180, 180], so one correction is enough
    if rotation > 180.0 {
        rotation - 360.0
    } else if rotation <= -180.0 {
        rotation + 360.0
    } else {
        rotation
    }
}

/// Knee angle between thigh and shin.
///
/// 180° is a fully extended leg; smaller values mean a deeper bend.
pub fn knee_flex(hip: &Keypoint, knee: &Keypoint, ankle: &Keypoint) -> f64 {
    angle(hip, knee, ankle)
}
