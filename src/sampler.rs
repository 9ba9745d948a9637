//! Frame sampling: turning raw video bytes into an ordered set of stills.
//!
//! Decoded frames live in a scratch directory owned by [`SampledFrames`].
//! The directory is removed when the frames are dropped, on every exit
//! path, and a failed removal is logged rather than raised.

use image::RgbImage;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::config::FfmpegConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Basic facts about a video, from the probe step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
}

pub trait FrameSampler: Send + Sync {
    fn probe(&self, video: &[u8]) -> AnalysisResult<VideoMetadata>;

    /// Frames in presentation order, `fps` per second of video.
    fn sample(&self, video: &[u8], fps: f64) -> AnalysisResult<SampledFrames>;
}

/// A temporary directory removed exactly once, when dropped.
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> AnalysisResult<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self::from_temp_dir(dir))
    }

    pub fn from_temp_dir(dir: TempDir) -> Self {
        Self { dir: Some(dir) }
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed scratch directory {}", path.display()),
                Err(e) => warn!("Failed to remove scratch directory {}: {}", path.display(), e),
            }
        }
    }
}

enum FrameStore {
    Memory(Vec<RgbImage>),
    Disk {
        paths: Vec<PathBuf>,
        // Held only so the directory outlives the paths
        _scratch: ScratchDir,
    },
}

/// The sampled frames of one video.
pub struct SampledFrames {
    store: FrameStore,
}

impl SampledFrames {
    pub fn in_memory(frames: Vec<RgbImage>) -> Self {
        Self { store: FrameStore::Memory(frames) }
    }

    /// Frames stored as image files inside `scratch`, in the given order.
    pub fn on_disk(scratch: ScratchDir, paths: Vec<PathBuf>) -> Self {
        Self {
            store: FrameStore::Disk { paths, _scratch: scratch },
        }
    }

    pub fn len(&self) -> usize {
        match &self.store {
            FrameStore::Memory(frames) => frames.len(),
            FrameStore::Disk { paths, .. } => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes frame `index`. Disk frames are read lazily, one at a time.
    pub fn load(&self, index: usize) -> AnalysisResult<RgbImage> {
        match &self.store {
            FrameStore::Memory(frames) => frames
                .get(index)
                .cloned()
                .ok_or_else(|| AnalysisError::Decode(format!("frame {} out of range", index))),
            FrameStore::Disk { paths, .. } => {
                let path = paths
                    .get(index)
                    .ok_or_else(|| AnalysisError::Decode(format!("frame {} out of range", index)))?;
                let image = image::open(path)
                    .map_err(|e| AnalysisError::Decode(format!("{}: {}", path.display(), e)))?;
                Ok(image.to_rgb8())
            }
        }
    }
}

// =========================================================================
// ffmpeg / ffprobe
// =========================================================================

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Samples frames by shelling out to `ffmpeg` and `ffprobe`.
pub struct FfmpegSampler {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegSampler {
    pub fn new(config: &FfmpegConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_bin.clone(),
            ffprobe: config.ffprobe_bin.clone(),
        }
    }

    fn write_input(scratch: &ScratchDir, video: &[u8]) -> AnalysisResult<PathBuf> {
        let path = scratch.path().join("input.mp4");
        fs::write(&path, video)?;
        Ok(path)
    }

    fn run(command: &mut Command, tool: &Path) -> AnalysisResult<Vec<u8>> {
        let output = command
            .output()
            .map_err(|e| AnalysisError::Decode(format!("failed to launch {}: {}", tool.display(), e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::Decode(format!(
                "{} exited with {}: {}",
                tool.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Reads ffprobe's JSON report.
fn parse_probe(stdout: &[u8]) -> AnalysisResult<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| AnalysisError::Decode(format!("unreadable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| AnalysisError::Decode("no video stream found".to_string()))?;

    let duration_seconds = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    Ok(VideoMetadata {
        duration_seconds,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    })
}

fn sorted_frame_paths(dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "png"))
        .collect::<Vec<_>>();
    // frame-%04d names sort in presentation order
    paths.sort();
    Ok(paths)
}

impl FrameSampler for FfmpegSampler {
    #[instrument(skip(self, video), fields(bytes = video.len()))]
    fn probe(&self, video: &[u8]) -> AnalysisResult<VideoMetadata> {
        let scratch = ScratchDir::new("tennis-video-")?;
        let input = Self::write_input(&scratch, video)?;

        let stdout = Self::run(
            Command::new(&self.ffprobe)
                .args(["-v", "error", "-select_streams", "v:0"])
                .args(["-show_entries", "stream=width,height:format=duration"])
                .args(["-of", "json"])
                .arg(&input),
            &self.ffprobe,
        )?;
        parse_probe(&stdout)
    }

    #[instrument(skip(self, video), fields(bytes = video.len()))]
    fn sample(&self, video: &[u8], fps: f64) -> AnalysisResult<SampledFrames> {
        let scratch = ScratchDir::new("tennis-frames-")?;
        let input = Self::write_input(&scratch, video)?;
        let frames_dir = scratch.path().join("frames");
        fs::create_dir(&frames_dir)?;

        Self::run(
            Command::new(&self.ffmpeg)
                .args(["-hide_banner", "-loglevel", "error", "-i"])
                .arg(&input)
                .arg("-vf")
                .arg(format!("fps={}", fps))
                .arg(frames_dir.join("frame-%04d.png")),
            &self.ffmpeg,
        )?;

        let paths = sorted_frame_paths(&frames_dir)?;
        debug!("ffmpeg produced {} frames", paths.len());
        Ok(SampledFrames::on_disk(scratch, paths))
    }
}
