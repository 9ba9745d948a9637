use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod args;

use args::{Args, Command};
use tennis_coach::config::AnalysisConfig;
use tennis_coach::synthetic::{SyntheticSampler, SyntheticStrokeDetector};
use tennis_coach::{
    parse_chat_session, parse_video_analysis, AnalysisError, AppConfig, CannedTextGenerator, Coach,
    CommandTextGenerator, FfmpegSampler, MoveNetDetector, StrokeAnalyzer, TextGenerator, VideoAnalysis,
};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Rejects files the analyzer should never see: missing, wrong extension,
/// or over the size limit. Returns the file contents.
fn read_video(path: &Path, config: &AnalysisConfig) -> Result<Vec<u8>> {
    if !path.is_file() {
        bail!(AnalysisError::InvalidInput(format!("no video file at {}", path.display())));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !config.allowed_extensions.iter().any(|allowed| *allowed == extension) {
        bail!(AnalysisError::InvalidInput(format!(
            "unsupported video type '{}' (allowed: {})",
            extension,
            config.allowed_extensions.join(", ")
        )));
    }

    let size = fs::metadata(path)?.len();
    if size > config.max_upload_bytes {
        bail!(AnalysisError::InvalidInput(format!(
            "video is {} bytes, limit is {}",
            size, config.max_upload_bytes
        )));
    }

    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn build_generator(config: &AppConfig) -> Result<Box<dyn TextGenerator>> {
    match &config.coach.command {
        Some(argv) => Ok(Box::new(CommandTextGenerator::spawn(argv)?)),
        None => {
            info!("No coach command configured, using offline replies");
            Ok(Box::new(CannedTextGenerator))
        }
    }
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format!("Wrote {}", path.display()).green());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_summary(analysis: &VideoAnalysis) {
    let avg = &analysis.summary.avg_angles;
    let rom = &analysis.summary.range_of_motion;
    eprintln!(
        "{}",
        format!(
            "Analyzed {} frames ({:.1}s at {} fps)",
            analysis.metadata.total_frames, analysis.metadata.duration, analysis.metadata.fps
        )
        .green()
    );
    eprintln!("  Right arm   {:6.1}°  [{:.1}° - {:.1}°]", avg.right_arm_angle, rom.right_arm_range.0, rom.right_arm_range.1);
    eprintln!("  Left arm    {:6.1}°  [{:.1}° - {:.1}°]", avg.left_arm_angle, rom.left_arm_range.0, rom.left_arm_range.1);
    eprintln!("  Torso       {:6.1}°  [{:.1}° - {:.1}°]", avg.torso_rotation, rom.torso_rotation_range.0, rom.torso_rotation_range.1);
    eprintln!("  Knee flex   {:6.1}° / {:.1}°", avg.left_knee_flex, avg.right_knee_flex);
}

fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(&args.config)?;

    match args.command {
        Command::Analyze { video, fps, out } => {
            let bytes = read_video(&video, &config.analysis)?;
            let fps = fps.unwrap_or(config.analysis.sample_fps);

            // One detector per process, loaded on first frame
            let detector = MoveNetDetector::new(&config.detector);
            let sampler = FfmpegSampler::new(&config.ffmpeg);
            let analysis = StrokeAnalyzer::new(&sampler, &detector)
                .analyze(&bytes, fps)
                .with_context(|| format!("Failed to analyze {}", video.display()))?;

            print_summary(&analysis);
            write_json(&analysis, out.as_deref())?;
        }
        Command::Coach { analysis, out } => {
            let content = fs::read_to_string(&analysis)
                .with_context(|| format!("Failed to read {}", analysis.display()))?;
            let analysis = parse_video_analysis(&content)?;

            let generator = build_generator(&config)?;
            let feedback = Coach::new(generator.as_ref(), &config.coach).generate_feedback(&analysis)?;

            eprintln!("{}", feedback.summary.cyan());
            for tip in &feedback.tips {
                eprintln!("  [{}] {}", tip.priority.to_string().yellow(), tip.title);
            }
            write_json(&feedback, out.as_deref())?;
        }
        Command::Chat { session, message } => {
            let content = fs::read_to_string(&session)
                .with_context(|| format!("Failed to read {}", session.display()))?;
            let session = parse_chat_session(&content)?;
            debug!("Session {} has {} messages", session.session_id, session.messages.len());

            let generator = build_generator(&config)?;
            let reply = Coach::new(generator.as_ref(), &config.coach).reply(&session, &message)?;
            write_json(&reply, None)?;
        }
        Command::Demo { duration, fps } => {
            let fps = fps.unwrap_or(config.analysis.sample_fps);
            let sampler = SyntheticSampler { duration_seconds: duration };
            let total = (duration * fps).floor().max(0.0) as usize;
            let detector = SyntheticStrokeDetector::new(total);

            let analysis = StrokeAnalyzer::new(&sampler, &detector).analyze(&[], fps)?;
            print_summary(&analysis);
            write_json(&analysis, None)?;
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        let kind = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<AnalysisError>())
            .map(|err| err.kind().to_string())
            .unwrap_or_else(|| "error".to_string());
        eprintln!("{} {:#}", format!("[{}]", kind).red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_video_checks_extension_and_size() {
        let dir = tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.max_upload_bytes = 8;

        let ok = dir.path().join("serve.MP4");
        fs::write(&ok, b"1234").unwrap();
        assert_eq!(read_video(&ok, &config).unwrap(), b"1234");

        let wrong_type = dir.path().join("serve.gif");
        fs::write(&wrong_type, b"1234").unwrap();
        assert!(read_video(&wrong_type, &config).is_err());

        let too_big = dir.path().join("rally.mov");
        fs::write(&too_big, b"0123456789").unwrap();
        assert!(read_video(&too_big, &config).is_err());

        assert!(read_video(&dir.path().join("absent.mp4"), &config).is_err());
    }

    #[test]
    fn test_boundary_errors_classify_as_input() {
        let dir = tempdir().unwrap();
        let err = read_video(&dir.path().join("absent.mp4"), &AnalysisConfig::default()).unwrap_err();
        let kind = err.downcast_ref::<AnalysisError>().map(|e| e.kind());
        assert_eq!(kind, Some(tennis_coach::ErrorKind::Input));
    }
}
