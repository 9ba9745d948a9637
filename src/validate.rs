//! Parsing and range checks for the JSON contracts exchanged with
//! consumers: `VideoAnalysis`, `CoachFeedback` and `ChatSession`.
//!
//! Field presence and names are enforced by the serde types; this module
//! adds the numeric ranges and cross-field rules serde cannot express.

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{
    BiomechanicalAngles, ChatMessage, ChatSession, CoachFeedback, FrameAnalysis, Keypoint,
    PoseLandmarks, RangeOfMotion, VideoAnalysis,
};

pub trait Validate {
    /// Name used in error messages.
    const CONTRACT: &'static str;

    fn validate_at(&self, path: &str) -> AnalysisResult<()>;

    fn validate(&self) -> AnalysisResult<()> {
        self.validate_at("$")
    }
}

fn child(path: &str, field: &str) -> String {
    format!("{}.{}", path, field)
}

fn check_finite(what: &'static str, path: &str, value: f64) -> AnalysisResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AnalysisError::validation(what, path, format!("expected a finite number, got {}", value)))
    }
}

fn check_range(what: &'static str, path: &str, value: f64, min: f64, max: f64) -> AnalysisResult<()> {
    check_finite(what, path, value)?;
    if value < min || value > max {
        return Err(AnalysisError::validation(
            what,
            path,
            format!("{} is outside [{}, {}]", value, min, max),
        ));
    }
    Ok(())
}

impl Validate for Keypoint {
    const CONTRACT: &'static str = "Keypoint";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        check_finite(Self::CONTRACT, &child(path, "x"), self.x)?;
        check_finite(Self::CONTRACT, &child(path, "y"), self.y)?;
        if let Some(score) = self.score {
            check_range(Self::CONTRACT, &child(path, "score"), score, 0.0, 1.0)?;
        }
        Ok(())
    }
}

impl Validate for PoseLandmarks {
    const CONTRACT: &'static str = "PoseLandmarks";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        for (joint, keypoint) in self.iter() {
            keypoint.validate_at(&child(path, joint.as_str()))?;
        }
        Ok(())
    }
}

impl Validate for BiomechanicalAngles {
    const CONTRACT: &'static str = "BiomechanicalAngles";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        for (name, value) in BiomechanicalAngles::FIELD_NAMES.iter().zip(self.to_array()) {
            let (min, max) = if *name == "torsoRotation" { (-180.0, 180.0) } else { (0.0, 180.0) };
            check_range(Self::CONTRACT, &child(path, name), value, min, max)?;
        }
        Ok(())
    }
}

impl Validate for FrameAnalysis {
    const CONTRACT: &'static str = "FrameAnalysis";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        check_range(Self::CONTRACT, &child(path, "timestamp"), self.timestamp, 0.0, f64::MAX)?;
        self.landmarks.validate_at(&child(path, "landmarks"))?;
        self.angles.validate_at(&child(path, "angles"))
    }
}

impl Validate for RangeOfMotion {
    const CONTRACT: &'static str = "RangeOfMotion";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        let ranges = [
            ("leftArmRange", self.left_arm_range),
            ("rightArmRange", self.right_arm_range),
            ("leftLegRange", self.left_leg_range),
            ("rightLegRange", self.right_leg_range),
            ("torsoRotationRange", self.torso_rotation_range),
        ];
        for (name, (min, max)) in ranges {
            let field = child(path, name);
            check_finite(Self::CONTRACT, &format!("{}[0]", field), min)?;
            check_finite(Self::CONTRACT, &format!("{}[1]", field), max)?;
            if min > max {
                return Err(AnalysisError::validation(
                    Self::CONTRACT,
                    field,
                    format!("min {} exceeds max {}", min, max),
                ));
            }
        }
        Ok(())
    }
}

impl Validate for VideoAnalysis {
    const CONTRACT: &'static str = "VideoAnalysis";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        let frames_path = child(path, "frames");
        let mut previous: Option<u32> = None;
        for (i, frame) in self.frames.iter().enumerate() {
            let frame_path = format!("{}[{}]", frames_path, i);
            frame.validate_at(&frame_path)?;
            if let Some(prev) = previous {
                if frame.frame_index <= prev {
                    return Err(AnalysisError::validation(
                        Self::CONTRACT,
                        child(&frame_path, "frameIndex"),
                        format!("{} does not follow {}", frame.frame_index, prev),
                    ));
                }
            }
            previous = Some(frame.frame_index);
        }

        let summary = child(path, "summary");
        self.summary.avg_angles.validate_at(&child(&summary, "avgAngles"))?;
        self.summary.range_of_motion.validate_at(&child(&summary, "rangeOfMotion"))?;

        let metadata = child(path, "metadata");
        check_range(Self::CONTRACT, &child(&metadata, "duration"), self.metadata.duration, 0.0, f64::MAX)?;
        check_finite(Self::CONTRACT, &child(&metadata, "fps"), self.metadata.fps)?;
        if self.metadata.fps <= 0.0 {
            return Err(AnalysisError::validation(
                Self::CONTRACT,
                child(&metadata, "fps"),
                "must be positive",
            ));
        }
        if self.metadata.total_frames as usize != self.frames.len() {
            return Err(AnalysisError::validation(
                Self::CONTRACT,
                child(&metadata, "totalFrames"),
                format!("{} does not match {} frames", self.metadata.total_frames, self.frames.len()),
            ));
        }
        Ok(())
    }
}

impl Validate for CoachFeedback {
    const CONTRACT: &'static str = "CoachFeedback";

    // Strings and priorities are fully checked by serde
    fn validate_at(&self, _path: &str) -> AnalysisResult<()> {
        Ok(())
    }
}

impl Validate for ChatMessage {
    const CONTRACT: &'static str = "ChatMessage";

    fn validate_at(&self, _path: &str) -> AnalysisResult<()> {
        Ok(())
    }
}

impl Validate for ChatSession {
    const CONTRACT: &'static str = "ChatSession";

    fn validate_at(&self, path: &str) -> AnalysisResult<()> {
        for (i, message) in self.messages.iter().enumerate() {
            message.validate_at(&format!("{}.messages[{}]", path, i))?;
        }
        if let Some(context) = &self.context {
            let context_path = child(path, "context");
            if let Some(analysis) = &context.last_analysis {
                analysis.validate_at(&child(&context_path, "lastAnalysis"))?;
            }
            if let Some(feedback) = &context.last_feedback {
                feedback.validate_at(&child(&context_path, "lastFeedback"))?;
            }
        }
        Ok(())
    }
}

/// Deserializes then range-checks a payload.
pub fn parse<T>(json: &str) -> AnalysisResult<T>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_str(json).map_err(|e| {
        AnalysisError::validation(
            T::CONTRACT,
            format!("line {} column {}", e.line(), e.column()),
            e.to_string(),
        )
    })?;
    value.validate()?;
    Ok(value)
}

pub fn parse_video_analysis(json: &str) -> AnalysisResult<VideoAnalysis> {
    parse(json)
}

pub fn parse_chat_session(json: &str) -> AnalysisResult<ChatSession> {
    parse(json)
}

/// Parses generator output into feedback. Accepts bare JSON, JSON inside a
/// markdown code fence, or JSON surrounded by prose.
pub fn parse_coach_feedback(text: &str) -> AnalysisResult<CoachFeedback> {
    parse(extract_json_object(text))
}

fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();

    if let Ok(fence) = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```") {
        if let Some(body) = fence.captures(trimmed).and_then(|caps| caps.get(1)) {
            return body.as_str();
        }
    }

    // First `{` that starts a complete JSON object wins
    for (start, _) in trimmed.match_indices('{') {
        let candidate = &trimmed[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
        if let Some(Ok(value)) = stream.next() {
            if value.is_object() {
                return &candidate[..stream.byte_offset()];
            }
        }
    }
    trimmed
}
