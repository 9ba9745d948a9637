pub mod aggregate;
pub mod angles;
#[cfg(test)]
mod angles_tests;
pub mod coach;
pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod prompt;
pub mod sampler;
pub mod synthetic;
pub mod types;
pub mod validate;

pub use aggregate::{average_angles, calculate_range_of_motion};
pub use angles::calculate_biomechanical_angles;
pub use coach::{CannedTextGenerator, Coach, CommandTextGenerator, TextGenerator};
pub use config::AppConfig;
pub use detector::{MoveNetDetector, PoseDetector};
pub use error::{AnalysisError, AnalysisResult, ErrorKind};
pub use pipeline::{assemble, CancelFlag, StrokeAnalyzer};
pub use sampler::{FfmpegSampler, FrameSampler, SampledFrames, ScratchDir};
pub use types::*;
pub use validate::{parse_chat_session, parse_coach_feedback, parse_video_analysis, Validate};
