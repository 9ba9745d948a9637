use crate::geometry::{angle, knee_flex, torso_rotation};
use crate::types::{BiomechanicalAngles, PoseLandmarks};

/// Computes every angle for one pose.
///
/// Arms use shoulder-elbow-wrist, legs and knees use hip-knee-ankle, torso
/// uses both shoulders and both hips. Leg angle and knee flex are produced
/// by separate calls and reported separately, even though they currently
/// measure the same triple.
pub fn calculate_biomechanical_angles(landmarks: &PoseLandmarks) -> BiomechanicalAngles {
    let lm = landmarks;

    BiomechanicalAngles {
        left_arm_angle: angle(&lm.left_shoulder, &lm.left_elbow, &lm.left_wrist),
        right_arm_angle: angle(&lm.right_shoulder, &lm.right_elbow, &lm.right_wrist),

        left_leg_angle: angle(&lm.left_hip, &lm.left_knee, &lm.left_ankle),
        right_leg_angle: angle(&lm.right_hip, &lm.right_knee, &lm.right_ankle),

        torso_rotation: torso_rotation(&lm.left_shoulder, &lm.right_shoulder, &lm.left_hip, &lm.right_hip),

        left_knee_flex: knee_flex(&lm.left_hip, &lm.left_knee, &lm.left_ankle),
        right_knee_flex: knee_flex(&lm.right_hip, &lm.right_knee, &lm.right_ankle),
    }
}
