#[cfg(test)]
mod tests {
    use crate::angles::calculate_biomechanical_angles;
    use crate::types::{JointName, Keypoint, PoseLandmarks};
    use approx::assert_abs_diff_eq;

    // =========================================================================
    // Reference pose: upright player, arms hanging slightly out, legs
    // slightly apart. Shoulders level at y=0.3, hips level at y=0.6.
    // =========================================================================

    fn reference_pose() -> PoseLandmarks {
        let k = Keypoint::new;
        PoseLandmarks {
            nose: k(0.5, 0.1),
            left_eye: k(0.48, 0.08),
            right_eye: k(0.52, 0.08),
            left_ear: k(0.46, 0.1),
            right_ear: k(0.54, 0.1),
            left_shoulder: k(0.4, 0.3),
            right_shoulder: k(0.6, 0.3),
            left_elbow: k(0.35, 0.5),
            right_elbow: k(0.65, 0.5),
            left_wrist: k(0.3, 0.7),
            right_wrist: k(0.7, 0.7),
            left_hip: k(0.42, 0.6),
            right_hip: k(0.58, 0.6),
            left_knee: k(0.4, 0.8),
            right_knee: k(0.6, 0.8),
            left_ankle: k(0.38, 1.0),
            right_ankle: k(0.62, 1.0),
        }
    }

    #[test]
    fn test_reference_pose_angles_are_in_range() {
        let angles = calculate_biomechanical_angles(&reference_pose());

        for (name, value) in ["leftArmAngle", "rightArmAngle", "leftLegAngle", "rightLegAngle"]
            .iter()
            .zip([
                angles.left_arm_angle,
                angles.right_arm_angle,
                angles.left_leg_angle,
                angles.right_leg_angle,
            ])
        {
            assert!(value > 0.0 && value <= 180.0, "{} out of range: {}", name, value);
        }
        assert!((0.0..=180.0).contains(&angles.left_knee_flex));
        assert!((0.0..=180.0).contains(&angles.right_knee_flex));
        assert!(angles.torso_rotation > -180.0 && angles.torso_rotation <= 180.0);
    }

    #[test]
    fn test_level_shoulders_and_hips_give_exactly_zero_rotation() {
        let angles = calculate_biomechanical_angles(&reference_pose());
        assert_eq!(angles.torso_rotation, 0.0);
    }

    #[test]
    fn test_arms_are_straight_lines_in_reference_pose() {
        // shoulder, elbow and wrist are collinear on both sides
        let angles = calculate_biomechanical_angles(&reference_pose());
        assert_abs_diff_eq!(angles.left_arm_angle, 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(angles.right_arm_angle, 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bent_elbow() {
        let mut pose = reference_pose();
        pose.right_shoulder = Keypoint::new(0.6, 0.3);
        pose.right_elbow = Keypoint::new(0.6, 0.5);
        pose.right_wrist = Keypoint::new(0.8, 0.5);

        let angles = calculate_biomechanical_angles(&pose);
        assert_abs_diff_eq!(angles.right_arm_angle, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_leg_angle_and_knee_flex_agree_for_now() {
        let mut pose = reference_pose();
        pose.left_knee = Keypoint::new(0.35, 0.78);

        let angles = calculate_biomechanical_angles(&pose);
        assert_eq!(angles.left_leg_angle, angles.left_knee_flex);
        assert_eq!(angles.right_leg_angle, angles.right_knee_flex);
        assert!(angles.left_leg_angle < 180.0);
    }

    #[test]
    fn test_is_deterministic() {
        let pose = reference_pose();
        let first = calculate_biomechanical_angles(&pose);
        let second = calculate_biomechanical_angles(&pose.clone());
        assert_eq!(first.to_array(), second.to_array());
    }

    #[test]
    fn test_empty_pose_is_total() {
        // Every joint at the origin: all rays are degenerate
        let angles = calculate_biomechanical_angles(&PoseLandmarks::empty());
        assert_eq!(angles.to_array(), [0.0; 7]);
    }

    #[test]
    fn test_missing_wrist_only_affects_its_arm() {
        let reported = reference_pose()
            .iter()
            .filter(|(joint, _)| *joint != JointName::RightWrist)
            .map(|(joint, kp)| (joint, kp.clone()))
            .collect::<Vec<_>>();
        let pose = PoseLandmarks::from_keypoints(reported);

        let angles = calculate_biomechanical_angles(&pose);
        assert_abs_diff_eq!(angles.left_arm_angle, 180.0, epsilon = 1e-4);
        assert!(angles.right_arm_angle < 180.0);
    }
}
