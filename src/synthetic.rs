//! Synthetic forehand for demos and tests, usable without a model file or
//! ffmpeg.

use image::RgbImage;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::detector::PoseDetector;
use crate::error::AnalysisResult;
use crate::sampler::{FrameSampler, SampledFrames, VideoMetadata};
use crate::types::{Keypoint, PoseLandmarks};

/// Pose at `frame_index` of a simulated forehand lasting `total_frames`.
///
/// The right arm extends along `sin(progress·π)`, the shoulders narrow as
/// the torso turns, and the knees dip slightly mid-stroke.
pub fn stroke_landmarks(frame_index: usize, total_frames: usize) -> PoseLandmarks {
    let progress = frame_index as f64 / total_frames.max(1) as f64;
    let extension = (progress * PI).sin();
    let k = Keypoint::with_score;

    PoseLandmarks {
        nose: k(0.5, 0.2, 0.95),
        left_eye: k(0.48, 0.18, 0.95),
        right_eye: k(0.52, 0.18, 0.95),
        left_ear: k(0.46, 0.2, 0.9),
        right_ear: k(0.54, 0.2, 0.9),

        left_shoulder: k(0.4 + extension * 0.05, 0.35, 0.98),
        right_shoulder: k(0.6 - extension * 0.05, 0.35, 0.98),

        left_elbow: k(0.35, 0.5, 0.95),
        right_elbow: k(0.65 + extension * 0.1, 0.45 - extension * 0.05, 0.95),

        left_wrist: k(0.3, 0.6, 0.9),
        right_wrist: k(0.7 + extension * 0.15, 0.5 - extension * 0.1, 0.9),

        left_hip: k(0.42, 0.6, 0.95),
        right_hip: k(0.58, 0.6, 0.95),

        left_knee: k(0.4, 0.8 + extension * 0.02, 0.95),
        right_knee: k(0.6, 0.8 + extension * 0.02, 0.95),

        left_ankle: k(0.38, 0.95, 0.9),
        right_ankle: k(0.62, 0.95, 0.9),
    }
}

/// Yields `duration * fps` blank frames.
pub struct SyntheticSampler {
    pub duration_seconds: f64,
}

impl FrameSampler for SyntheticSampler {
    fn probe(&self, _video: &[u8]) -> AnalysisResult<VideoMetadata> {
        Ok(VideoMetadata {
            duration_seconds: self.duration_seconds,
            width: 64,
            height: 64,
        })
    }

    fn sample(&self, _video: &[u8], fps: f64) -> AnalysisResult<SampledFrames> {
        let count = (self.duration_seconds * fps).floor().max(0.0) as usize;
        Ok(SampledFrames::in_memory(vec![RgbImage::new(64, 64); count]))
    }
}

/// Returns successive stroke poses regardless of frame content.
pub struct SyntheticStrokeDetector {
    total_frames: usize,
    /// Every `n`-th call (1-based) reports no pose. 0 disables.
    miss_every: usize,
    calls: AtomicUsize,
}

impl SyntheticStrokeDetector {
    pub fn new(total_frames: usize) -> Self {
        Self {
            total_frames,
            miss_every: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing_every(mut self, n: usize) -> Self {
        self.miss_every = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PoseDetector for SyntheticStrokeDetector {
    fn name(&self) -> String {
        "Synthetic forehand".to_string()
    }

    fn detect(&self, _frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.miss_every > 0 && (index + 1) % self.miss_every == 0 {
            return Ok(None);
        }
        Ok(Some(stroke_landmarks(index, self.total_frames)))
    }
}
