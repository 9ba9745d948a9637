use image::RgbImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tennis_coach::sampler::VideoMetadata;
use tennis_coach::synthetic::{stroke_landmarks, SyntheticSampler, SyntheticStrokeDetector};
use tennis_coach::{
    AnalysisError, AnalysisResult, CancelFlag, ErrorKind, FrameSampler, Keypoint, PoseDetector,
    PoseLandmarks, SampledFrames, ScratchDir, StrokeAnalyzer, Validate,
};

// =========================================================================
// Fakes
// =========================================================================

/// Writes `count` PNG frames into a scratch directory and remembers where.
struct DiskSampler {
    count: usize,
    last_dir: Mutex<Option<PathBuf>>,
}

impl DiskSampler {
    fn new(count: usize) -> Self {
        Self { count, last_dir: Mutex::new(None) }
    }

    fn last_dir(&self) -> PathBuf {
        self.last_dir.lock().unwrap().clone().unwrap()
    }
}

impl FrameSampler for DiskSampler {
    fn probe(&self, _video: &[u8]) -> AnalysisResult<VideoMetadata> {
        Ok(VideoMetadata { duration_seconds: self.count as f64 / 10.0, width: 8, height: 8 })
    }

    fn sample(&self, _video: &[u8], _fps: f64) -> AnalysisResult<SampledFrames> {
        let scratch = ScratchDir::new("stroke-test-")?;
        let mut paths = Vec::new();
        for i in 0..self.count {
            let path = scratch.path().join(format!("frame-{:04}.png", i + 1));
            RgbImage::new(8, 8).save(&path).unwrap();
            paths.push(path);
        }
        *self.last_dir.lock().unwrap() = Some(scratch.path().to_path_buf());
        Ok(SampledFrames::on_disk(scratch, paths))
    }
}

/// Replays a fixed list of detection outcomes, one per call.
struct ScriptedDetector {
    script: Vec<Result<Option<PoseLandmarks>, &'static str>>,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    fn new(script: Vec<Result<Option<PoseLandmarks>, &'static str>>) -> Self {
        Self { script, calls: AtomicUsize::new(0) }
    }
}

impl PoseDetector for ScriptedDetector {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn detect(&self, _frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.get(index) {
            Some(Ok(pose)) => Ok(pose.clone()),
            Some(Err(message)) => Err(AnalysisError::Detector(message.to_string())),
            None => Ok(None),
        }
    }
}

/// Sets a cancel flag once it has seen `after` frames.
struct CancellingDetector {
    flag: CancelFlag,
    after: usize,
    calls: AtomicUsize,
}

impl PoseDetector for CancellingDetector {
    fn name(&self) -> String {
        "cancelling".to_string()
    }

    fn detect(&self, _frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        let seen = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == self.after {
            self.flag.cancel();
        }
        Ok(Some(stroke_landmarks(seen, 10)))
    }
}

fn pose_with_right_wrist(x: f64, y: f64) -> PoseLandmarks {
    let mut pose = stroke_landmarks(0, 1);
    pose.right_shoulder = Keypoint::with_score(0.6, 0.35, 0.9);
    pose.right_elbow = Keypoint::with_score(0.65, 0.45, 0.9);
    pose.right_wrist = Keypoint::with_score(x, y, 0.9);
    pose
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn three_frame_forehand_summary() {
    let sampler = DiskSampler::new(3);
    let detector = ScriptedDetector::new(vec![
        Ok(Some(pose_with_right_wrist(0.70, 0.50))),
        Ok(Some(pose_with_right_wrist(0.75, 0.45))),
        Ok(Some(pose_with_right_wrist(0.85, 0.35))),
    ]);

    let analysis = StrokeAnalyzer::new(&sampler, &detector).analyze(b"video", 10.0).unwrap();
    analysis.validate().unwrap();

    let (min, max) = analysis.summary.range_of_motion.right_arm_range;
    let avg = analysis.summary.avg_angles.right_arm_angle;
    assert!(max - min > 0.0);
    assert!(min <= avg && avg <= max);
    assert_eq!(analysis.metadata.total_frames, 3);
    assert_eq!(analysis.frames[2].frame_index, 2);
    assert!((analysis.frames[2].timestamp - 0.2).abs() < 1e-12);
}

#[test]
fn skipped_frames_keep_their_positions() {
    let sampler = DiskSampler::new(4);
    let detector = ScriptedDetector::new(vec![
        Ok(Some(stroke_landmarks(0, 4))),
        Ok(None),
        Ok(None),
        Ok(Some(stroke_landmarks(3, 4))),
    ]);

    let analysis = StrokeAnalyzer::new(&sampler, &detector).analyze(b"video", 5.0).unwrap();

    let indices: Vec<u32> = analysis.frames.iter().map(|f| f.frame_index).collect();
    assert_eq!(indices, vec![0, 3]);
    assert!((analysis.frames[1].timestamp - 0.6).abs() < 1e-12);
    assert_eq!(analysis.metadata.total_frames, 2);
}

#[test]
fn video_without_anyone_is_no_detection() {
    let sampler = DiskSampler::new(3);
    let detector = ScriptedDetector::new(vec![Ok(None), Ok(None), Ok(None)]);

    let err = StrokeAnalyzer::new(&sampler, &detector).analyze(b"video", 10.0).unwrap_err();
    assert!(matches!(err, AnalysisError::NoPoseDetected { sampled: 3 }));
    assert_eq!(err.kind(), ErrorKind::NoDetection);
    assert!(!sampler.last_dir().exists());
}

#[test]
fn detector_failure_propagates_and_cleans_up() {
    let sampler = DiskSampler::new(3);
    let detector = ScriptedDetector::new(vec![
        Ok(Some(stroke_landmarks(0, 3))),
        Err("session crashed"),
    ]);

    let err = StrokeAnalyzer::new(&sampler, &detector).analyze(b"video", 10.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Collaborator);
    assert!(err.to_string().contains("session crashed"));
    assert!(!sampler.last_dir().exists(), "scratch directory should be gone");
}

#[test]
fn successful_run_cleans_up_scratch() {
    let sampler = DiskSampler::new(2);
    let detector = SyntheticStrokeDetector::new(2);

    StrokeAnalyzer::new(&sampler, &detector).analyze(b"video", 10.0).unwrap();
    assert!(!sampler.last_dir().exists());
}

#[test]
fn cancellation_stops_between_frames() {
    let flag = CancelFlag::new();
    let sampler = DiskSampler::new(6);
    let detector = CancellingDetector { flag: flag.clone(), after: 2, calls: AtomicUsize::new(0) };

    let err = StrokeAnalyzer::new(&sampler, &detector)
        .analyze_with_cancel(b"video", 10.0, &flag)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Cancelled { processed: 2 }));
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    assert!(!sampler.last_dir().exists());
}

#[test]
fn invalid_sample_rate_is_rejected_before_sampling() {
    let sampler = DiskSampler::new(1);
    let detector = SyntheticStrokeDetector::new(1);
    let analyzer = StrokeAnalyzer::new(&sampler, &detector);

    for fps in [0.0, -5.0, f64::NAN] {
        let err = analyzer.analyze(b"video", fps).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
    assert!(sampler.last_dir.lock().unwrap().is_none());
}

#[test]
fn synthetic_demo_run() {
    let sampler = SyntheticSampler { duration_seconds: 3.0 };
    let detector = SyntheticStrokeDetector::new(30).missing_every(4);

    let analysis = StrokeAnalyzer::new(&sampler, &detector).analyze(&[], 10.0).unwrap();
    analysis.validate().unwrap();

    // Calls 4, 8, ..., 28 miss: 7 of 30
    assert_eq!(detector.calls(), 30);
    assert_eq!(analysis.metadata.total_frames, 23);
    assert_eq!(analysis.metadata.duration, 3.0);
    assert!(analysis.frames.iter().all(|f| (f.frame_index + 1) % 4 != 0));

    let (min, max) = analysis.summary.range_of_motion.right_arm_range;
    assert!(max > min);
}

#[test]
fn shared_detector_serves_several_analyzers() {
    let detector = SyntheticStrokeDetector::new(10);
    let first = SyntheticSampler { duration_seconds: 1.0 };
    let second = SyntheticSampler { duration_seconds: 0.5 };

    std::thread::scope(|s| {
        let a = s.spawn(|| StrokeAnalyzer::new(&first, &detector).analyze(&[], 10.0));
        let b = s.spawn(|| StrokeAnalyzer::new(&second, &detector).analyze(&[], 10.0));
        assert_eq!(a.join().unwrap().unwrap().metadata.total_frames, 10);
        assert_eq!(b.join().unwrap().unwrap().metadata.total_frames, 5);
    });
    assert_eq!(detector.calls(), 15);
}
