//! Reduction of per-frame angles into summary statistics.
//!
//! Both reductions are independent of frame order: ranges are plain
//! min/max, and means add each field's values in ascending order so that
//! floating-point rounding cannot depend on how frames were arranged.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{BiomechanicalAngles, RangeOfMotion};

/// Per-field arithmetic mean across all frames.
pub fn average_angles(frames: &[BiomechanicalAngles]) -> AnalysisResult<BiomechanicalAngles> {
    if frames.is_empty() {
        return Err(AnalysisError::EmptyInput { operation: "average angles" });
    }

    let count = frames.len() as f64;
    let mut means = [0.0; 7];
    for (field, mean) in means.iter_mut().enumerate() {
        let mut values: Vec<f64> = frames.iter().map(|f| f.to_array()[field]).collect();
        values.sort_by(f64::total_cmp);
        let (lo, hi) = (values[0], values[values.len() - 1]);
        // Rounding in the sum can land a hair outside [min, max]
        *mean = (values.iter().sum::<f64>() / count).max(lo).min(hi);
    }

    Ok(BiomechanicalAngles::from_array(means))
}

/// `[min, max]` of every field, including the knee flexion fields that
/// [`RangeOfMotion`] does not carry.
pub fn angle_ranges(frames: &[BiomechanicalAngles]) -> AnalysisResult<[(f64, f64); 7]> {
    let (first, rest) = frames.split_first().ok_or(AnalysisError::EmptyInput {
        operation: "calculate range of motion",
    })?;

    let mut ranges = first.to_array().map(|v| (v, v));
    for frame in rest {
        for (range, value) in ranges.iter_mut().zip(frame.to_array()) {
            range.0 = range.0.min(value);
            range.1 = range.1.max(value);
        }
    }
    Ok(ranges)
}

/// Range of motion for the arm, leg and torso rotation angles.
pub fn calculate_range_of_motion(frames: &[BiomechanicalAngles]) -> AnalysisResult<RangeOfMotion> {
    let ranges = angle_ranges(frames)?;

    Ok(RangeOfMotion {
        left_arm_range: ranges[0],
        right_arm_range: ranges[1],
        left_leg_range: ranges[2],
        right_leg_range: ranges[3],
        torso_rotation_range: ranges[4],
    })
}
