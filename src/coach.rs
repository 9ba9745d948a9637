use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::CoachConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::prompt::{chat_system_prompt, feedback_prompt, FEEDBACK_SYSTEM_PROMPT};
use crate::types::{ChatMessage, ChatRole, ChatSession, CoachFeedback, CoachTip, Drill, Priority, VideoAnalysis};
use crate::validate::{parse_coach_feedback, Validate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self { role: role.to_string(), content: content.into() }
    }
}

/// One call to the text generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask for a JSON object instead of prose
    pub json_response: bool,
}

pub trait TextGenerator: Send + Sync {
    fn name(&self) -> String;
    fn complete(&self, request: &CompletionRequest) -> AnalysisResult<String>;
}

fn generation_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::TextGeneration(e.to_string())
}

// =========================================================================
// Helper process generator
// =========================================================================

#[derive(Deserialize, Debug)]
struct GeneratorResponse {
    status: String,
    content: Option<String>,
    error: Option<String>,
}

struct GeneratorProcess {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Talks to a long-lived helper process: one JSON request per line on its
/// stdin, one JSON response per line on its stdout.
pub struct CommandTextGenerator {
    program: String,
    inner: Mutex<GeneratorProcess>,
}

impl CommandTextGenerator {
    pub fn spawn(argv: &[String]) -> AnalysisResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AnalysisError::TextGeneration("empty generator command".to_string()))?;

        info!("Launching text generator: {}", argv.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AnalysisError::TextGeneration(format!("failed to spawn {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| generation_error("failed to open generator stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| generation_error("failed to open generator stdout"))?;

        Ok(Self {
            program: program.clone(),
            inner: Mutex::new(GeneratorProcess {
                process: child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
        })
    }
}

impl TextGenerator for CommandTextGenerator {
    fn name(&self) -> String {
        format!("process:{}", self.program)
    }

    fn complete(&self, request: &CompletionRequest) -> AnalysisResult<String> {
        let mut proc = self
            .inner
            .lock()
            .map_err(|_| generation_error("generator lock poisoned"))?;

        let line = serde_json::to_string(request).map_err(generation_error)?;
        writeln!(proc.stdin, "{}", line).map_err(generation_error)?;
        proc.stdin.flush().map_err(generation_error)?;

        // Blocks until the helper answers
        let mut response_line = String::new();
        let read = proc.stdout.read_line(&mut response_line).map_err(generation_error)?;
        if read == 0 {
            return Err(generation_error("generator closed its output"));
        }

        let response: GeneratorResponse = serde_json::from_str(&response_line)
            .map_err(|e| AnalysisError::TextGeneration(format!("unreadable generator response: {}", e)))?;
        if response.status != "success" {
            return Err(AnalysisError::TextGeneration(
                response.error.unwrap_or_else(|| format!("generator status {}", response.status)),
            ));
        }

        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| generation_error("empty response from generator"))
    }
}

impl Drop for CommandTextGenerator {
    fn drop(&mut self) {
        // Reap the helper even if a request panicked
        let proc = self.inner.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = proc.process.kill() {
            debug!("Text generator already gone: {}", e);
        }
        let _ = proc.process.wait();
    }
}

// =========================================================================
// Offline generator
// =========================================================================

/// Fixed answers for running without a language model.
pub struct CannedTextGenerator;

impl CannedTextGenerator {
    pub fn feedback() -> CoachFeedback {
        CoachFeedback {
            summary: "Good work overall. Your torso rotation is solid and your arm extension is consistent. \
                      There is room to gain power by bending your knees more."
                .to_string(),
            tips: vec![
                CoachTip {
                    title: "Bend your knees more".to_string(),
                    description: "Your knees stay fairly straight through the stroke. Lower your center of \
                                  gravity to drive power from your legs."
                        .to_string(),
                    priority: Priority::High,
                },
                CoachTip {
                    title: "Extend your hitting arm".to_string(),
                    description: "Your extension is good but can be fuller at contact. That gives you more \
                                  reach and control."
                        .to_string(),
                    priority: Priority::Medium,
                },
                CoachTip {
                    title: "Keep the torso turn".to_string(),
                    description: "Your torso rotation is in a good range. Keep it fluid on every stroke."
                        .to_string(),
                    priority: Priority::Low,
                },
            ],
            drills: vec![
                Drill {
                    name: "Squats with shadow swing".to_string(),
                    description: "Squat while miming the stroke to build muscle memory for knee bend."
                        .to_string(),
                    repetitions: Some("3 sets of 15".to_string()),
                },
                Drill {
                    name: "Resistance band extension".to_string(),
                    description: "Anchor a band and swing against it, focusing on full arm extension."
                        .to_string(),
                    repetitions: Some("3 sets of 20 per arm".to_string()),
                },
            ],
        }
    }

    pub fn chat_reply(message: &str) -> String {
        let lower = message.to_lowercase();
        if lower.contains("knee") || lower.contains("leg") {
            "Great question about your legs. Knee bend is key to generating power. Practice the squat \
             with shadow swing drill: start with 3 sets of 10 and build up. Any doubts about the technique?"
        } else if lower.contains("arm") || lower.contains("extension") {
            "Arm extension is key for control and power. Keep your eyes on the ball and extend fully at \
             contact. The resistance band drill will help you build that muscle memory."
        } else if lower.contains("torso") || lower.contains("rotation") {
            "Your torso rotation looks good. Keep it fluid and start the turn from your hips. Rotation \
             creates the power that then transfers to your arm. Try swinging without a ball, focusing only on the turn."
        } else {
            "Got it. Remember that tennis technique is built through consistent practice. Focus on posture \
             and balance first, then rotation, and finally contact. Is there a specific area you want to dig into?"
        }
        .to_string()
    }
}

impl TextGenerator for CannedTextGenerator {
    fn name(&self) -> String {
        "canned".to_string()
    }

    fn complete(&self, request: &CompletionRequest) -> AnalysisResult<String> {
        if request.json_response {
            return serde_json::to_string(&Self::feedback()).map_err(generation_error);
        }
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User.as_str())
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(Self::chat_reply(last_user))
    }
}

// =========================================================================
// Coach
// =========================================================================

/// Turns analyses into feedback, and answers chat turns, through a
/// [`TextGenerator`].
pub struct Coach<'a> {
    generator: &'a dyn TextGenerator,
    config: &'a CoachConfig,
}

impl<'a> Coach<'a> {
    pub fn new(generator: &'a dyn TextGenerator, config: &'a CoachConfig) -> Self {
        Self { generator, config }
    }

    #[instrument(skip_all, fields(generator = %self.generator.name()))]
    pub fn generate_feedback(&self, analysis: &VideoAnalysis) -> AnalysisResult<CoachFeedback> {
        analysis.validate()?;

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                PromptMessage::new("system", FEEDBACK_SYSTEM_PROMPT),
                PromptMessage::new("user", feedback_prompt(&analysis.summary)),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.feedback_max_tokens,
            json_response: true,
        };

        let text = self.generator.complete(&request)?;
        let feedback = parse_coach_feedback(&text).map_err(|e| {
            warn!("Generator returned feedback of the wrong shape: {}", e);
            e
        })?;
        info!("Feedback with {} tips, {} drills", feedback.tips.len(), feedback.drills.len());
        Ok(feedback)
    }

    /// Answers `message` in the context of `session`. The session itself is
    /// not modified; appending both turns is up to the caller.
    #[instrument(skip_all, fields(session = %session.session_id, generator = %self.generator.name()))]
    pub fn reply(&self, session: &ChatSession, message: &str) -> AnalysisResult<ChatMessage> {
        if message.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("message is required".to_string()));
        }
        session.validate()?;

        let mut messages = vec![PromptMessage::new("system", chat_system_prompt(session.context.as_ref()))];
        messages.extend(
            session
                .messages
                .iter()
                .map(|m| PromptMessage::new(m.role.as_str(), m.content.clone())),
        );
        messages.push(PromptMessage::new(ChatRole::User.as_str(), message));

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.chat_max_tokens,
            json_response: false,
        };

        let content = self.generator.complete(&request)?;
        let reply = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            role: ChatRole::Assistant,
            content: content.trim().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        reply.validate()?;
        Ok(reply)
    }
}
