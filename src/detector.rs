use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{JointName, Keypoint, PoseLandmarks};

/// A single-person 2D pose detector.
///
/// Implementations are shared between concurrent analyses, so `detect`
/// takes `&self` and must do its own locking.
pub trait PoseDetector: Send + Sync {
    fn name(&self) -> String;

    /// `Ok(None)` when nobody is visible; `Err` only for real failures.
    fn detect(&self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>>;
}

fn detector_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Detector(e.to_string())
}

/// MoveNet single-pose Lightning over ONNX Runtime.
///
/// The model is loaded on the first `detect` call. Loading and inference
/// both run under one lock, so concurrent callers never race on
/// initialization and never run the session concurrently.
pub struct MoveNetDetector {
    model_path: PathBuf,
    input_size: u32,
    intra_threads: usize,
    min_pose_score: f32,
    session: Mutex<Option<Session>>,
}

impl MoveNetDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            input_size: config.input_size,
            intra_threads: config.intra_threads,
            min_pose_score: config.min_pose_score,
            session: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.session.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    fn load_session(&self) -> AnalysisResult<Session> {
        if !self.model_path.exists() {
            return Err(AnalysisError::Detector(format!(
                "model not found at {}",
                self.model_path.display()
            )));
        }

        info!("Loading MoveNet from {}...", self.model_path.display());
        let session = Session::builder()
            .map_err(detector_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(detector_error)?
            .with_intra_threads(self.intra_threads)
            .map_err(detector_error)?
            .commit_from_file(&self.model_path)
            .map_err(detector_error)?;
        info!("MoveNet loaded");
        Ok(session)
    }
}

impl PoseDetector for MoveNetDetector {
    fn name(&self) -> String {
        "MoveNet Lightning (17 pts)".to_string()
    }

    fn detect(&self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        let input_data = preprocess(frame, self.input_size);
        let size = self.input_size as i64;

        let mut guard = self
            .session
            .lock()
            .map_err(|_| AnalysisError::Detector("detector lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.load_session()?);
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| AnalysisError::Detector("detector session unavailable".to_string()))?;

        let input = Tensor::from_array((vec![1, size, size, 3], input_data)).map_err(detector_error)?;
        let outputs = session.run(ort::inputs![input]).map_err(detector_error)?;
        let (_shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(detector_error)?;

        decode_keypoints(data, self.min_pose_score)
    }
}

/// Resizes to the model's square input and lays pixels out as NHWC int32.
///
/// A plain resize (no letterbox) keeps the model's normalized output
/// coordinates aligned with the original frame.
fn preprocess(frame: &RgbImage, input_size: u32) -> Vec<i32> {
    let resized = image::imageops::resize(frame, input_size, input_size, FilterType::Triangle);
    let mut input_data = Vec::with_capacity((input_size * input_size * 3) as usize);
    for pixel in resized.pixels() {
        input_data.push(pixel[0] as i32);
        input_data.push(pixel[1] as i32);
        input_data.push(pixel[2] as i32);
    }
    input_data
}

/// Keypoint labels in MoveNet output order.
const MOVENET_LABELS: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// Decodes a `[1, 1, 17, 3]` MoveNet output of `(y, x, score)` triples.
///
/// A keypoint with a non-finite coordinate or score is reported as missing.
/// Returns `None` when the mean keypoint score is below `min_pose_score`.
fn decode_keypoints(data: &[f32], min_pose_score: f32) -> AnalysisResult<Option<PoseLandmarks>> {
    let expected = MOVENET_LABELS.len() * 3;
    if data.len() < expected {
        return Err(AnalysisError::Detector(format!(
            "expected at least {} output values, got {}",
            expected,
            data.len()
        )));
    }

    let mut total_score = 0.0f32;
    let mut keypoints = Vec::with_capacity(MOVENET_LABELS.len());
    for (i, label) in MOVENET_LABELS.iter().enumerate() {
        let joint = JointName::from_label(label)
            .ok_or_else(|| AnalysisError::Detector(format!("unknown keypoint label {}", label)))?;
        let (y, x, score) = (data[i * 3], data[i * 3 + 1], data[i * 3 + 2]);

        let keypoint = if x.is_finite() && y.is_finite() && score.is_finite() {
            let score = score.clamp(0.0, 1.0);
            total_score += score;
            Keypoint {
                x: x as f64,
                y: y as f64,
                score: Some(score as f64),
                name: Some(joint.as_str().to_string()),
            }
        } else {
            debug!("Keypoint {} has non-finite output, treating as missing", label);
            Keypoint {
                name: Some(joint.as_str().to_string()),
                ..Keypoint::missing()
            }
        };
        keypoints.push((joint, keypoint));
    }

    let mean_score = total_score / MOVENET_LABELS.len() as f32;
    if mean_score < min_pose_score {
        debug!("Pose rejected, mean score {:.3} < {:.3}", mean_score, min_pose_score);
        return Ok(None);
    }

    Ok(Some(PoseLandmarks::from_keypoints(keypoints)))
}
