//! The analysis assembler: video bytes in, [`VideoAnalysis`] out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{average_angles, calculate_range_of_motion};
use crate::angles::calculate_biomechanical_angles;
use crate::detector::PoseDetector;
use crate::error::{AnalysisError, AnalysisResult};
use crate::sampler::FrameSampler;
use crate::types::{AnalysisMetadata, AnalysisSummary, FrameAnalysis, PoseLandmarks, VideoAnalysis};

/// Cooperative abort signal, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs sampling, detection and aggregation for one video at a time.
///
/// Holds borrowed collaborators: a detector built once at startup can be
/// shared by any number of analyzers.
pub struct StrokeAnalyzer<'a> {
    sampler: &'a dyn FrameSampler,
    detector: &'a dyn PoseDetector,
}

impl<'a> StrokeAnalyzer<'a> {
    pub fn new(sampler: &'a dyn FrameSampler, detector: &'a dyn PoseDetector) -> Self {
        Self { sampler, detector }
    }

    pub fn analyze(&self, video: &[u8], fps: f64) -> AnalysisResult<VideoAnalysis> {
        self.analyze_with_cancel(video, fps, &CancelFlag::new())
    }

    /// Like [`analyze`](Self::analyze), but stops before the next frame once
    /// `cancel` is set. Frames gathered so far are discarded.
    #[instrument(skip(self, video, cancel), fields(bytes = video.len(), detector = %self.detector.name()))]
    pub fn analyze_with_cancel(
        &self,
        video: &[u8],
        fps: f64,
        cancel: &CancelFlag,
    ) -> AnalysisResult<VideoAnalysis> {
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!("sample rate must be positive, got {}", fps)));
        }

        let metadata = self.sampler.probe(video)?;
        debug!("Video is {:.2}s, {}x{}", metadata.duration_seconds, metadata.width, metadata.height);

        // Owns the scratch storage; released when this scope ends, on any path
        let frames = self.sampler.sample(video, fps)?;
        info!("Sampled {} frames at {} fps", frames.len(), fps);

        let mut detections = Vec::with_capacity(frames.len());
        for index in 0..frames.len() {
            if cancel.is_cancelled() {
                warn!("Analysis cancelled at frame {}", index);
                return Err(AnalysisError::Cancelled { processed: index });
            }
            let image = frames.load(index)?;
            detections.push(self.detector.detect(&image)?);
        }

        assemble(detections, fps, metadata.duration_seconds)
    }
}

/// Builds the analysis from per-frame detection results, given in sampled
/// order. `None` entries are frames without a pose: they are skipped, and
/// the frames after them keep their original index and timestamp.
pub fn assemble<I>(detections: I, fps: f64, duration: f64) -> AnalysisResult<VideoAnalysis>
where
    I: IntoIterator<Item = Option<PoseLandmarks>>,
{
    let mut sampled = 0usize;
    let mut frames = Vec::new();

    for (index, detection) in detections.into_iter().enumerate() {
        sampled += 1;
        let Some(landmarks) = detection else {
            warn!("No pose detected in frame {}, skipping", index);
            continue;
        };

        let angles = calculate_biomechanical_angles(&landmarks);
        frames.push(FrameAnalysis {
            frame_index: index as u32,
            timestamp: index as f64 / fps,
            landmarks,
            angles,
        });
    }

    if frames.is_empty() {
        return Err(AnalysisError::NoPoseDetected { sampled });
    }

    let all_angles: Vec<_> = frames.iter().map(|f| f.angles).collect();
    let summary = AnalysisSummary {
        avg_angles: average_angles(&all_angles)?,
        range_of_motion: calculate_range_of_motion(&all_angles)?,
    };

    info!("Analyzed {} of {} frames", frames.len(), sampled);
    let total_frames = frames.len() as u32;
    Ok(VideoAnalysis {
        frames,
        summary,
        metadata: AnalysisMetadata {
            duration,
            fps,
            total_frames,
        },
    })
}
