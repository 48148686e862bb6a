use serde::{Serialize, Deserialize};
use serde_with::skip_serializing_none;
use std::{fmt, str::FromStr};

// --- Generation preferences ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Balanced,
    Detailed,
    #[serde(other)]
    Unknown,
}

impl Complexity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Simple => "Low",
            Self::Detailed => "High",
            Self::Balanced | Self::Unknown => "Medium",
        }
    }

    /// Rough effort per task used for duration and scope heuristics.
    pub fn days_per_task(self) -> i64 {
        match self {
            Self::Simple => 2,
            Self::Detailed => 5,
            Self::Balanced | Self::Unknown => 3,
        }
    }

    pub fn default_team_size(self) -> u32 {
        match self {
            Self::Simple => 2,
            Self::Detailed => 6,
            Self::Balanced | Self::Unknown => 4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Development,
    Design,
    Testing,
    Planning,
    #[default]
    All,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    #[default]
    Agile,
    Waterfall,
    Kanban,
    Custom,
    #[serde(other)]
    Unknown,
}

impl TemplateStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agile => "agile",
            Self::Waterfall => "waterfall",
            Self::Kanban => "kanban",
            Self::Custom => "custom",
            Self::Unknown => "unknown",
        }
    }

    /// Styles that get the preference-aware prompt; anything else uses the basic one.
    pub fn uses_enhanced_prompt(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

fn default_task_count() -> i64 { 8 }
fn default_true() -> bool { true }
fn default_creativity() -> i64 { 50 }
fn default_detail() -> i64 { 70 }

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub project_id: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub focus_area: FocusArea,
    // Wide integers so out-of-range values reach validation instead of failing extraction.
    #[serde(default = "default_task_count")]
    pub task_count: i64,
    #[serde(default)]
    pub template_style: TemplateStyle,
    #[serde(default = "default_true")]
    pub include_timelines: bool,
    #[serde(default)]
    pub auto_assign: bool,
    // Advisory only; accepted so clients can send them.
    #[serde(default)]
    pub include_subtasks: bool,
    #[serde(default)]
    pub include_dependencies: bool,
    #[serde(default)]
    pub risk_assessment: bool,
    #[serde(default = "default_creativity")]
    pub creativity_level: i64,
    #[serde(default = "default_detail")]
    pub detail_level: i64,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub project_context: Option<ProjectContext>,
}

#[cfg(test)]
impl GenerationRequest {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            complexity: Complexity::default(),
            focus_area: FocusArea::default(),
            task_count: default_task_count(),
            template_style: TemplateStyle::default(),
            include_timelines: true,
            auto_assign: false,
            include_subtasks: false,
            include_dependencies: false,
            risk_assessment: false,
            creativity_level: default_creativity(),
            detail_level: default_detail(),
            custom_instructions: None,
            project_context: None,
        }
    }
}

impl GenerationRequest {
    /// Requested draft count; non-positive values read as zero and are rejected by validation.
    pub fn task_count(&self) -> u32 {
        self.task_count.clamp(0, u32::MAX as i64) as u32
    }

    pub fn creativity(&self) -> u8 {
        self.creativity_level.clamp(0, 100) as u8
    }

    pub fn detail(&self) -> u8 {
        self.detail_level.clamp(20, 100) as u8
    }

    pub fn custom_instructions(&self) -> Option<&str> {
        self.custom_instructions.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn snapshot(&self) -> PreferencesSnapshot {
        PreferencesSnapshot {
            complexity: self.complexity,
            focus_area: self.focus_area,
            task_count: self.task_count(),
            creativity_level: self.creativity(),
            detail_level: self.detail(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub industry_type: Option<String>,
}

/// Project data the generator works from, whether it came from the request or the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectFacts {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub team_size: Option<u32>,
    pub technologies: Vec<String>,
    pub industry_type: Option<String>,
}

impl ProjectFacts {
    /// Both dates present, as (start, end) epoch millis.
    pub fn date_range(&self) -> Option<(i64, i64)> {
        self.start_date.zip(self.end_date)
    }
}

impl From<&Project> for ProjectFacts {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
            ..Self::default()
        }
    }
}

// --- Drafts ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Lenient parse for model output; anything unrecognised is MEDIUM.
    pub fn from_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "URGENT" | "CRITICAL" => Self::High,
            "LOW" => Self::Low,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_days: Option<u32>,
}

impl DraftTask {
    pub fn new(title: &str, description: &str, priority: Priority, estimated_days: u32) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            estimated_days: Some(estimated_days),
        }
    }
}

// --- Generation result ---

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub message: String,
    pub generated_tasks: Vec<TaskResponse>,
    pub analysis: Option<ProjectAnalysis>,
    pub metadata: Option<GenerationMetadata>,
}

impl GenerationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            generated_tasks: Vec::new(),
            analysis: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub project_complexity: String,
    pub estimated_duration: String,
    pub recommended_team_size: u32,
    pub risk_factors: Vec<String>,
    pub key_milestones: Vec<String>,
    pub optimization_suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// Wall-clock time of the whole call, in milliseconds.
    pub generation_time: u64,
    pub ai_model: String,
    pub confidence_score: f64,
    pub preferences_used: PreferencesSnapshot,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesSnapshot {
    pub complexity: Complexity,
    pub focus_area: FocusArea,
    pub task_count: u32,
    pub creativity_level: u8,
    pub detail_level: u8,
}

// --- Projects & tasks ---

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub end_date: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    InReview,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ToDo => "TO_DO",
            Self::InProgress => "IN_PROGRESS",
            Self::InReview => "IN_REVIEW",
            Self::Done => "DONE",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TO_DO" => Ok(Self::ToDo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "IN_REVIEW" => Ok(Self::InReview),
            "DONE" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<i64>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee_ids: Vec<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectTasks {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LegacyGenerationResponse {
    pub project: Project,
    pub generated_tasks: Vec<TaskResponse>,
    pub message: String,
}
