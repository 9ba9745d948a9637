use serde::{Deserialize, Serialize};

/// A single detected landmark in normalized image coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, score: None, name: None }
    }

    pub fn with_score(x: f64, y: f64, score: f64) -> Self {
        Self { x, y, score: Some(score), name: None }
    }

    /// Stand-in for a joint the detector did not report.
    pub fn missing() -> Self {
        Self::with_score(0.0, 0.0, 0.0)
    }
}

/// The 17 body joints, in MoveNet / COCO output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const ALL: [JointName; 17] = [
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
    ];

    /// Wire name, as used for the `PoseLandmarks` JSON keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Nose => "nose",
            JointName::LeftEye => "leftEye",
            JointName::RightEye => "rightEye",
            JointName::LeftEar => "leftEar",
            JointName::RightEar => "rightEar",
            JointName::LeftShoulder => "leftShoulder",
            JointName::RightShoulder => "rightShoulder",
            JointName::LeftElbow => "leftElbow",
            JointName::RightElbow => "rightElbow",
            JointName::LeftWrist => "leftWrist",
            JointName::RightWrist => "rightWrist",
            JointName::LeftHip => "leftHip",
            JointName::RightHip => "rightHip",
            JointName::LeftKnee => "leftKnee",
            JointName::RightKnee => "rightKnee",
            JointName::LeftAnkle => "leftAnkle",
            JointName::RightAnkle => "rightAnkle",
        }
    }

    /// Accepts both detector labels (`left_shoulder`) and wire names (`leftShoulder`).
    pub fn from_label(label: &str) -> Option<Self> {
        let folded: String = label
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        JointName::ALL
            .iter()
            .copied()
            .find(|joint| joint.as_str().to_ascii_lowercase() == folded)
    }
}

impl std::fmt::Display for JointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One full pose. Every joint is always present; unreported joints hold
/// [`Keypoint::missing`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PoseLandmarks {
    pub nose: Keypoint,
    pub left_eye: Keypoint,
    pub right_eye: Keypoint,
    pub left_ear: Keypoint,
    pub right_ear: Keypoint,
    pub left_shoulder: Keypoint,
    pub right_shoulder: Keypoint,
    pub left_elbow: Keypoint,
    pub right_elbow: Keypoint,
    pub left_wrist: Keypoint,
    pub right_wrist: Keypoint,
    pub left_hip: Keypoint,
    pub right_hip: Keypoint,
    pub left_knee: Keypoint,
    pub right_knee: Keypoint,
    pub left_ankle: Keypoint,
    pub right_ankle: Keypoint,
}

impl PoseLandmarks {
    /// Builds a pose from whatever joints a detector reported. Later
    /// duplicates of a joint overwrite earlier ones.
    pub fn from_keypoints<I>(keypoints: I) -> Self
    where
        I: IntoIterator<Item = (JointName, Keypoint)>,
    {
        let mut pose = Self::empty();
        for (joint, keypoint) in keypoints {
            *pose.get_mut(joint) = keypoint;
        }
        pose
    }

    /// All 17 joints at the origin with zero confidence.
    pub fn empty() -> Self {
        let m = Keypoint::missing;
        Self {
            nose: m(),
            left_eye: m(),
            right_eye: m(),
            left_ear: m(),
            right_ear: m(),
            left_shoulder: m(),
            right_shoulder: m(),
            left_elbow: m(),
            right_elbow: m(),
            left_wrist: m(),
            right_wrist: m(),
            left_hip: m(),
            right_hip: m(),
            left_knee: m(),
            right_knee: m(),
            left_ankle: m(),
            right_ankle: m(),
        }
    }

    pub fn get(&self, joint: JointName) -> &Keypoint {
        match joint {
            JointName::Nose => &self.nose,
            JointName::LeftEye => &self.left_eye,
            JointName::RightEye => &self.right_eye,
            JointName::LeftEar => &self.left_ear,
            JointName::RightEar => &self.right_ear,
            JointName::LeftShoulder => &self.left_shoulder,
            JointName::RightShoulder => &self.right_shoulder,
            JointName::LeftElbow => &self.left_elbow,
            JointName::RightElbow => &self.right_elbow,
            JointName::LeftWrist => &self.left_wrist,
            JointName::RightWrist => &self.right_wrist,
            JointName::LeftHip => &self.left_hip,
            JointName::RightHip => &self.right_hip,
            JointName::LeftKnee => &self.left_knee,
            JointName::RightKnee => &self.right_knee,
            JointName::LeftAnkle => &self.left_ankle,
            JointName::RightAnkle => &self.right_ankle,
        }
    }

    fn get_mut(&mut self, joint: JointName) -> &mut Keypoint {
        match joint {
            JointName::Nose => &mut self.nose,
            JointName::LeftEye => &mut self.left_eye,
            JointName::RightEye => &mut self.right_eye,
            JointName::LeftEar => &mut self.left_ear,
            JointName::RightEar => &mut self.right_ear,
            JointName::LeftShoulder => &mut self.left_shoulder,
            JointName::RightShoulder => &mut self.right_shoulder,
            JointName::LeftElbow => &mut self.left_elbow,
            JointName::RightElbow => &mut self.right_elbow,
            JointName::LeftWrist => &mut self.left_wrist,
            JointName::RightWrist => &mut self.right_wrist,
            JointName::LeftHip => &mut self.left_hip,
            JointName::RightHip => &mut self.right_hip,
            JointName::LeftKnee => &mut self.left_knee,
            JointName::RightKnee => &mut self.right_knee,
            JointName::LeftAnkle => &mut self.left_ankle,
            JointName::RightAnkle => &mut self.right_ankle,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointName, &Keypoint)> + '_ {
        JointName::ALL.iter().map(move |joint| (*joint, self.get(*joint)))
    }
}

/// Joint and segment angles for one pose, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomechanicalAngles {
    pub left_arm_angle: f64,
    pub right_arm_angle: f64,
    pub left_leg_angle: f64,
    pub right_leg_angle: f64,
    pub torso_rotation: f64,
    pub left_knee_flex: f64,
    pub right_knee_flex: f64,
}

impl BiomechanicalAngles {
    pub const FIELD_NAMES: [&'static str; 7] = [
        "leftArmAngle",
        "rightArmAngle",
        "leftLegAngle",
        "rightLegAngle",
        "torsoRotation",
        "leftKneeFlex",
        "rightKneeFlex",
    ];

    /// Fields in `FIELD_NAMES` order.
    pub fn to_array(&self) -> [f64; 7] {
        [
            self.left_arm_angle,
            self.right_arm_angle,
            self.left_leg_angle,
            self.right_leg_angle,
            self.torso_rotation,
            self.left_knee_flex,
            self.right_knee_flex,
        ]
    }

    pub fn from_array(values: [f64; 7]) -> Self {
        Self {
            left_arm_angle: values[0],
            right_arm_angle: values[1],
            left_leg_angle: values[2],
            right_leg_angle: values[3],
            torso_rotation: values[4],
            left_knee_flex: values[5],
            right_knee_flex: values[6],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    /// Position in the originally sampled sequence; gaps mark skipped frames.
    pub frame_index: u32,
    pub timestamp: f64,
    pub landmarks: PoseLandmarks,
    pub angles: BiomechanicalAngles,
}

/// `[min, max]` per angle. Knee flexion ranges are not part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeOfMotion {
    pub left_arm_range: (f64, f64),
    pub right_arm_range: (f64, f64),
    pub left_leg_range: (f64, f64),
    pub right_leg_range: (f64, f64),
    pub torso_rotation_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub avg_angles: BiomechanicalAngles,
    pub range_of_motion: RangeOfMotion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Seconds, as reported by the frame sampler.
    pub duration: f64,
    /// Sample rate used to extract frames.
    pub fps: f64,
    /// Frames that produced a pose, i.e. `frames.len()`.
    pub total_frames: u32,
}

/// The result of analyzing one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub frames: Vec<FrameAnalysis>,
    pub summary: AnalysisSummary,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachTip {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drill {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachFeedback {
    pub summary: String,
    pub tips: Vec<CoachTip>,
    pub drills: Vec<Drill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis: Option<VideoAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_feedback: Option<CoachFeedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}
