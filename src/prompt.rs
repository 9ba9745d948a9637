//! Fixed prompt templates for the text generator.

use std::fmt::Write;

use crate::types::{AnalysisSummary, ChatContext};

pub const FEEDBACK_SYSTEM_PROMPT: &str =
    "You are a professional tennis coach and biomechanics expert. Reply ONLY with valid JSON.";

/// Prompt asking for `CoachFeedback` JSON about one stroke.
pub fn feedback_prompt(summary: &AnalysisSummary) -> String {
    let avg = &summary.avg_angles;
    let rom = &summary.range_of_motion;

    format!(
        "Act as a professional tennis coach. Analyze the following biomechanical data from one stroke:

**Average angles:**
- Left arm: {:.1}°
- Right arm: {:.1}°
- Left leg: {:.1}°
- Right leg: {:.1}°
- Torso rotation: {:.1}°
- Left knee flex: {:.1}°
- Right knee flex: {:.1}°

**Range of motion:**
- Right arm: {:.1}° - {:.1}°
- Torso rotation: {:.1}° - {:.1}°

**Your task:**
1. Write a short summary (2-3 sentences) of the stroke
2. Give the three most important observations, prioritized (high/medium/low)
3. Suggest two practical drills to improve

Reply ONLY with a valid JSON object of this shape:
{{
  \"summary\": \"string\",
  \"tips\": [
    {{\"title\": \"string\", \"description\": \"string\", \"priority\": \"high|medium|low\"}}
  ],
  \"drills\": [
    {{\"name\": \"string\", \"description\": \"string\", \"repetitions\": \"string (optional)\"}}
  ]
}}

Keep the tone motivating and concise. 200 words at most.",
        avg.left_arm_angle,
        avg.right_arm_angle,
        avg.left_leg_angle,
        avg.right_leg_angle,
        avg.torso_rotation,
        avg.left_knee_flex,
        avg.right_knee_flex,
        rom.right_arm_range.0,
        rom.right_arm_range.1,
        rom.torso_rotation_range.0,
        rom.torso_rotation_range.1,
    )
}

/// System prompt for the follow-up chat, with whatever context the
/// session carries.
pub fn chat_system_prompt(context: Option<&ChatContext>) -> String {
    let mut prompt = String::from(
        "You are a professional tennis coach, expert in biomechanics and technique. Your name is Coach AI.

Your communication style is:
- Motivating and positive
- Technically precise
- Concise and direct
- Focused on practical actions
",
    );

    let analysis = context.and_then(|c| c.last_analysis.as_ref());
    let feedback = context.and_then(|c| c.last_feedback.as_ref());

    // Writing into a String cannot fail
    if let Some(analysis) = analysis {
        let avg = &analysis.summary.avg_angles;
        let _ = write!(
            prompt,
            "
**Recent analysis context:**
- Average right arm angle: {:.1}°
- Torso rotation: {:.1}°
- Knee flex: {:.1}°
",
            avg.right_arm_angle, avg.torso_rotation, avg.left_knee_flex
        );
    }

    if let Some(feedback) = feedback {
        let _ = write!(prompt, "\n**Feedback you already gave:**\n{}\n\nKey points mentioned:\n", feedback.summary);
        for tip in &feedback.tips {
            let _ = writeln!(prompt, "- {}", tip.title);
        }
    }

    prompt.push_str(
        "\nAnswer the user's questions based on this context and your tennis expertise. Keep answers brief (150 words at most).",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AnalysisMetadata, BiomechanicalAngles, CoachFeedback, CoachTip, Priority, RangeOfMotion,
        VideoAnalysis,
    };

    fn summary() -> AnalysisSummary {
        AnalysisSummary {
            avg_angles: BiomechanicalAngles {
                left_arm_angle: 161.04,
                right_arm_angle: 163.96,
                left_leg_angle: 171.0,
                right_leg_angle: 172.5,
                torso_rotation: -3.24,
                left_knee_flex: 171.0,
                right_knee_flex: 172.5,
            },
            range_of_motion: RangeOfMotion {
                left_arm_range: (160.0, 162.0),
                right_arm_range: (150.0, 175.55),
                left_leg_range: (170.0, 172.0),
                right_leg_range: (171.0, 174.0),
                torso_rotation_range: (-8.0, 2.0),
            },
        }
    }

    #[test]
    fn test_feedback_prompt_embeds_all_figures() {
        let prompt = feedback_prompt(&summary());

        for expected in [
            "- Left arm: 161.0°",
            "- Right arm: 164.0°",
            "- Left leg: 171.0°",
            "- Right leg: 172.5°",
            "- Torso rotation: -3.2°",
            "- Left knee flex: 171.0°",
            "- Right knee flex: 172.5°",
            "- Right arm: 150.0° - 175.6°",
            "- Torso rotation: -8.0° - 2.0°",
            "\"priority\": \"high|medium|low\"",
        ] {
            assert!(prompt.contains(expected), "missing {:?} in:\n{}", expected, prompt);
        }
    }

    #[test]
    fn test_chat_prompt_without_context_has_no_blocks() {
        let prompt = chat_system_prompt(None);
        assert!(prompt.starts_with("You are a professional tennis coach"));
        assert!(!prompt.contains("Recent analysis context"));
        assert!(!prompt.contains("Feedback you already gave"));
        assert!(prompt.ends_with("(150 words at most)."));
    }

    #[test]
    fn test_chat_prompt_with_full_context() {
        let context = ChatContext {
            last_analysis: Some(VideoAnalysis {
                frames: Vec::new(),
                summary: summary(),
                metadata: AnalysisMetadata { duration: 1.0, fps: 10.0, total_frames: 0 },
            }),
            last_feedback: Some(CoachFeedback {
                summary: "Nice swing.".to_string(),
                tips: vec![CoachTip {
                    title: "Bend your knees".to_string(),
                    description: "Lower stance.".to_string(),
                    priority: Priority::High,
                }],
                drills: Vec::new(),
            }),
        };
        let prompt = chat_system_prompt(Some(&context));

        assert!(prompt.contains("- Average right arm angle: 164.0°"));
        assert!(prompt.contains("- Knee flex: 171.0°"));
        assert!(prompt.contains("Nice swing.\n\nKey points mentioned:\n- Bend your knees\n"));
    }
}
