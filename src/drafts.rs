use crate::{
    error::DraftParseError,
    gemini::TextGenerationClient,
    models::{Complexity, DraftTask, FocusArea, GenerationRequest, Priority, ProjectFacts, TemplateStyle},
    timeline::DAY_MS,
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

const MAX_TITLE_CHARS: usize = 60;
const PLAIN_TEXT_TITLE_CHARS: usize = 50;
const PLAIN_TEXT_ESTIMATE_DAYS: u32 = 3;
const ACCEPTANCE_CRITERIA: &str = "\n\nAcceptance Criteria:\n\
- Deliverables reviewed and approved by the team\n\
- Work documented and linked to the project\n\
- No open blocking issues remain";

/// Turns project facts and preferences into draft tasks, via the model when it
/// cooperates and via a deterministic template when it does not.
pub struct TaskTemplateGenerator {
    client: Arc<dyn TextGenerationClient>,
    model: String,
    timeout: Duration,
}

impl TaskTemplateGenerator {
    pub fn new(client: Arc<dyn TextGenerationClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self { client, model: model.into(), timeout }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Preference-aware generation. Never fails; returns at most `task_count` drafts.
    pub async fn generate_drafts(&self, facts: &ProjectFacts, req: &GenerationRequest) -> Vec<DraftTask> {
        let prompt = build_enhanced_prompt(facts, req);
        info!("🎯 Generating {} {} drafts for '{}'", req.task_count, req.template_style.as_str(), facts.name);

        let drafts = self.complete_or_fallback(&prompt, &facts.name).await;
        let mut drafts = post_process(drafts, req);
        drafts.truncate(req.task_count() as usize);
        drafts
    }

    /// Name and description only, no preferences. Never fails.
    pub async fn generate_basic(&self, name: &str, description: Option<&str>) -> Vec<DraftTask> {
        let prompt = build_basic_prompt(name, description);
        info!("🎯 Generating basic drafts for '{}'", name);
        self.complete_or_fallback(&prompt, name).await
    }

    async fn complete_or_fallback(&self, prompt: &str, project_name: &str) -> Vec<DraftTask> {
        match self.client.generate(&self.model, prompt, self.timeout).await {
            Ok(text) => {
                debug!("AI response: {}", text);
                parse_drafts(&text).unwrap_or_else(|reason| {
                    warn!("⚠️ Could not parse AI response ({}), using fallback template", reason);
                    fallback_tasks(project_name)
                })
            }
            Err(e) => {
                error!("❌ Error generating tasks with AI: {}", e);
                info!("🔄 Falling back to template tasks");
                fallback_tasks(project_name)
            }
        }
    }
}

// --- Prompts ---

pub fn build_enhanced_prompt(facts: &ProjectFacts, req: &GenerationRequest) -> String {
    let mut context = format!(
        "Project Name: {}\nProject Description: {}\n",
        facts.name,
        facts.description.as_deref().unwrap_or("No description provided"),
    );
    if let Some(team) = facts.team_size {
        context.push_str(&format!("Team Size: {team}\n"));
    }
    if !facts.technologies.is_empty() {
        context.push_str(&format!("Technologies: {}\n", facts.technologies.join(", ")));
    }
    if let Some(industry) = facts.industry_type.as_deref() {
        context.push_str(&format!("Industry: {industry}\n"));
    }
    if let Some((start, end)) = facts.date_range() {
        context.push_str(&format!("Timeline: {} days\n", end.saturating_sub(start) / DAY_MS));
    }

    let style = match (req.template_style, req.custom_instructions()) {
        (TemplateStyle::Custom, Some(instructions)) => format!("Follow these custom instructions from the team: {instructions}"),
        (style, _) => style_instruction(style).to_string(),
    };

    format!(
        "You are a project management assistant. Based on the following project information, \
generate exactly {count} realistic and actionable tasks using a {style_name} approach.

{context}
Guidelines:
- {complexity}
- {focus}
- {style}
- {creativity}
- {detail}

Please respond with a JSON object in this exact format:
{{
  \"tasks\": [
    {{
      \"title\": \"Task title (concise, max {max_title} characters)\",
      \"description\": \"Detailed description of what needs to be done\",
      \"priority\": \"HIGH\" | \"MEDIUM\" | \"LOW\",
      \"estimatedDays\": number
    }}
  ]
}}

Return exactly {count} tasks and only the JSON object, no additional text or formatting.",
        count = req.task_count,
        style_name = req.template_style.as_str(),
        complexity = complexity_instruction(req.complexity),
        focus = focus_instruction(req.focus_area),
        creativity = creativity_instruction(req.creativity()),
        detail = detail_instruction(req.detail()),
        max_title = MAX_TITLE_CHARS,
    )
}

pub fn build_basic_prompt(name: &str, description: Option<&str>) -> String {
    format!(
        "You are a project management assistant. Based on the following project information, \
generate 5-8 realistic and actionable tasks that would be needed to complete this project.

Project Name: {name}
Project Description: {description}

Please respond with a JSON object in this exact format:
{{
  \"tasks\": [
    {{
      \"title\": \"Task title (keep it concise, max 50 characters)\",
      \"description\": \"Detailed description of what needs to be done\",
      \"priority\": \"HIGH\" | \"MEDIUM\" | \"LOW\",
      \"estimatedDays\": number (1-30 days realistic estimate)
    }}
  ]
}}

Guidelines:
- Include planning, development, testing, and deployment phases
- Vary priorities based on task importance
- Provide realistic time estimates

Return only the JSON object, no additional text or formatting.",
        description = description.unwrap_or("No description provided"),
    )
}

fn complexity_instruction(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Simple => "Keep tasks high-level and straightforward; avoid fine-grained steps.",
        Complexity::Detailed => "Break the work into granular, well-scoped tasks with clear technical detail.",
        Complexity::Balanced | Complexity::Unknown => "Balance high-level milestones with concrete, actionable work items.",
    }
}

fn focus_instruction(focus: FocusArea) -> &'static str {
    match focus {
        FocusArea::Development => "Concentrate on implementation, integration and deployment work.",
        FocusArea::Design => "Concentrate on UX research, UI design, prototyping and design reviews.",
        FocusArea::Testing => "Concentrate on test planning, automation, QA and release verification.",
        FocusArea::Planning => "Concentrate on requirements, scoping, estimation and stakeholder alignment.",
        FocusArea::All | FocusArea::Unknown => "Cover the full lifecycle from planning through deployment.",
    }
}

fn style_instruction(style: TemplateStyle) -> &'static str {
    match style {
        TemplateStyle::Agile => "Organise the work as iterative, sprint-sized increments that each deliver user value.",
        TemplateStyle::Waterfall => "Organise the work as sequential phases from requirements through verification and maintenance.",
        TemplateStyle::Kanban => "Organise the work as small, independent cards that can flow continuously across the board.",
        TemplateStyle::Custom | TemplateStyle::Unknown => "Organise the work in whatever order best suits the project.",
    }
}

fn creativity_instruction(level: u8) -> &'static str {
    if level >= 70 {
        "Feel free to propose innovative or unconventional approaches."
    } else if level >= 40 {
        "Mix proven practices with a few fresh ideas."
    } else {
        "Stick to conventional, well-established practices."
    }
}

fn detail_instruction(level: u8) -> &'static str {
    if level >= 80 {
        "Write thorough descriptions (3-4 sentences) covering scope, approach and deliverables."
    } else if level >= 60 {
        "Write descriptions of 2-3 sentences."
    } else {
        "Keep each description to one concise sentence."
    }
}

// --- Parsing chain: JSON -> plain text -> fixed template ---

#[derive(Debug, Deserialize)]
struct RawTaskList {
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    estimated_days: Option<serde_json::Value>,
}

impl RawTask {
    fn into_draft(self) -> Option<DraftTask> {
        let title = truncate_chars(self.title.trim(), MAX_TITLE_CHARS);
        if title.is_empty() {
            return None;
        }
        Some(DraftTask {
            title,
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            priority: self.priority.as_deref().map(Priority::from_loose).unwrap_or_default(),
            estimated_days: self.estimated_days.as_ref().and_then(positive_days),
        })
    }
}

fn positive_days(value: &serde_json::Value) -> Option<u32> {
    let days = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (days >= 1.0 && days <= u32::MAX as f64).then(|| days.round() as u32)
}

pub fn parse_drafts(text: &str) -> Result<Vec<DraftTask>, DraftParseError> {
    decode_json(text).or_else(|reason| {
        debug!("JSON decode failed ({}), trying plain-text parse", reason);
        parse_plain_text(text)
    })
}

/// Decodes the outermost `{...}` of the response as `{"tasks": [...]}`.
pub fn decode_json(text: &str) -> Result<Vec<DraftTask>, DraftParseError> {
    let start = text.find('{').ok_or(DraftParseError::NoJsonObject)?;
    let end = text.rfind('}').filter(|&end| end > start).ok_or(DraftParseError::NoJsonObject)?;

    let list: RawTaskList = serde_json::from_str(&text[start..=end])
        .map_err(|e| DraftParseError::InvalidJson(e.to_string()))?;
    let drafts: Vec<DraftTask> = list.tasks.into_iter().filter_map(RawTask::into_draft).collect();
    if drafts.is_empty() {
        return Err(DraftParseError::NoTasks);
    }
    Ok(drafts)
}

/// Bullet or numbered lines start a task; following lines become its description.
pub fn parse_plain_text(text: &str) -> Result<Vec<DraftTask>, DraftParseError> {
    let mut drafts = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines().map(str::trim) {
        if let Some(title) = strip_task_marker(line) {
            if let Some(done) = current.take() {
                drafts.push(plain_draft(done));
            }
            current = Some((title.to_string(), String::new()));
        } else if let Some((_, description)) = current.as_mut().filter(|_| !line.is_empty()) {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(line);
        }
    }
    if let Some(done) = current {
        drafts.push(plain_draft(done));
    }

    drafts.retain(|d| !d.title.is_empty());
    if drafts.is_empty() {
        return Err(DraftParseError::NoTasks);
    }
    Ok(drafts)
}

fn strip_task_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        return line[digits..].strip_prefix('.').map(str::trim);
    }
    None
}

fn plain_draft((title, description): (String, String)) -> DraftTask {
    DraftTask {
        title: truncate_chars(&title, PLAIN_TEXT_TITLE_CHARS),
        description: if description.is_empty() { "AI generated task".to_string() } else { description },
        priority: Priority::Medium,
        estimated_days: Some(PLAIN_TEXT_ESTIMATE_DAYS),
    }
}

pub fn fallback_tasks(project_name: &str) -> Vec<DraftTask> {
    vec![
        DraftTask::new(
            "Project Planning & Requirements",
            &format!("Define project scope, requirements, and create initial project plan for {project_name}"),
            Priority::High,
            2,
        ),
        DraftTask::new("System Design & Architecture", "Design system architecture and technical specifications", Priority::High, 3),
        DraftTask::new("Core Development Setup", "Set up development environment and implement core functionality", Priority::Medium, 5),
        DraftTask::new("Feature Implementation", "Implement main features and functionality", Priority::Medium, 7),
        DraftTask::new("Testing & Quality Assurance", "Perform comprehensive testing and quality checks", Priority::Medium, 3),
        DraftTask::new("Documentation & Deployment", "Create documentation and deploy the project", Priority::Low, 2),
    ]
}

fn post_process(drafts: Vec<DraftTask>, req: &GenerationRequest) -> Vec<DraftTask> {
    let add_criteria = req.detail() >= 70;
    let lift_low = req.creativity() > 80;
    drafts
        .into_iter()
        .map(|mut draft| {
            if add_criteria {
                draft.description.push_str(ACCEPTANCE_CRITERIA);
            }
            if lift_low && draft.priority == Priority::Low {
                draft.priority = Priority::Medium;
            }
            draft
        })
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::{CannedClient, FailingClient};
    use pretty_assertions::assert_eq;

    fn facts() -> ProjectFacts {
        ProjectFacts {
            id: "p1".into(),
            name: "Demo".into(),
            description: Some("A demo project".into()),
            ..ProjectFacts::default()
        }
    }

    fn generator(client: Arc<dyn TextGenerationClient>) -> TaskTemplateGenerator {
        TaskTemplateGenerator::new(client, "test-model", Duration::from_secs(1))
    }

    #[test]
    fn json_is_found_inside_fenced_output() {
        let text = "Sure! Here you go:\n```json\n{\"tasks\":[{\"title\":\"Set up CI\",\"description\":\"GitHub Actions\",\"priority\":\"high\",\"estimatedDays\":2},{\"title\":\"Write docs\",\"priority\":\"LOW\",\"estimatedDays\":\"4\"}]}\n```";
        let drafts = decode_json(text).unwrap();
        assert_eq!(drafts, vec![
            DraftTask::new("Set up CI", "GitHub Actions", Priority::High, 2),
            DraftTask::new("Write docs", "", Priority::Low, 4),
        ]);
    }

    #[test]
    fn json_titles_are_capped_and_bad_estimates_dropped() {
        let long = "x".repeat(80);
        let text = format!(r#"{{"tasks":[{{"title":"{long}","estimatedDays":-2}},{{"title":"   "}}]}}"#);
        let drafts = decode_json(&text).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title.chars().count(), 60);
        assert_eq!(drafts[0].estimated_days, None);
        assert_eq!(drafts[0].priority, Priority::Medium);
    }

    #[test]
    fn decode_reports_why_it_failed() {
        assert_eq!(decode_json("no braces here"), Err(DraftParseError::NoJsonObject));
        assert!(matches!(decode_json("{not json}"), Err(DraftParseError::InvalidJson(_))));
        assert_eq!(decode_json(r#"{"tasks":[]}"#), Err(DraftParseError::NoTasks));
    }

    #[test]
    fn plain_text_bullets_become_tasks() {
        let text = "Here is a plan:\n\n1. Gather requirements\nTalk to stakeholders\nand write them down\n- Build the prototype\n* Ship it\n";
        let drafts = parse_plain_text(text).unwrap();
        assert_eq!(drafts, vec![
            DraftTask::new("Gather requirements", "Talk to stakeholders and write them down", Priority::Medium, 3),
            DraftTask::new("Build the prototype", "AI generated task", Priority::Medium, 3),
            DraftTask::new("Ship it", "AI generated task", Priority::Medium, 3),
        ]);
    }

    #[test]
    fn plain_text_titles_are_capped_at_fifty() {
        let text = format!("- {}", "y".repeat(70));
        assert_eq!(parse_plain_text(&text).unwrap()[0].title.len(), 50);
    }

    #[test]
    fn plain_text_without_markers_has_no_tasks() {
        assert_eq!(parse_plain_text("just prose\nwith no list"), Err(DraftParseError::NoTasks));
    }

    #[test]
    fn enhanced_prompt_embeds_preferences() {
        let mut req = GenerationRequest::new("p1");
        req.complexity = Complexity::Detailed;
        req.focus_area = FocusArea::Testing;
        req.template_style = TemplateStyle::Waterfall;
        req.creativity_level = 90;
        req.detail_level = 30;
        req.task_count = 5;
        let mut facts = facts();
        facts.team_size = Some(3);
        facts.technologies = vec!["Rust".into(), "Postgres".into()];
        facts.start_date = Some(0);
        facts.end_date = Some(30 * DAY_MS);

        let prompt = build_enhanced_prompt(&facts, &req);
        for needle in [
            "exactly 5 realistic",
            "waterfall approach",
            "Project Name: Demo",
            "Team Size: 3",
            "Technologies: Rust, Postgres",
            "Timeline: 30 days",
            complexity_instruction(Complexity::Detailed),
            focus_instruction(FocusArea::Testing),
            style_instruction(TemplateStyle::Waterfall),
            "innovative or unconventional",
            "one concise sentence",
            "\"tasks\"",
        ] {
            assert!(prompt.contains(needle), "prompt missing {needle:?}");
        }
    }

    #[test]
    fn widest_possible_timeline_is_reported_without_overflow() {
        let mut facts = facts();
        facts.start_date = Some(i64::MIN);
        facts.end_date = Some(i64::MAX);
        let prompt = build_enhanced_prompt(&facts, &GenerationRequest::new("p1"));
        assert!(prompt.contains(&format!("Timeline: {} days", i64::MAX / DAY_MS)));
    }

    #[tokio::test]
    async fn stalled_upstream_falls_back_to_the_template() {
        let client = crate::gemini::GeminiClient::new("test-key".into(), crate::gemini::testing::silent_endpoint().await);
        let generator = TaskTemplateGenerator::new(Arc::new(client), "test-model", Duration::from_millis(200));
        assert_eq!(generator.generate_basic("Demo", None).await, fallback_tasks("Demo"));
    }

    #[test]
    fn custom_style_uses_custom_instructions() {
        let mut req = GenerationRequest::new("p1");
        req.template_style = TemplateStyle::Custom;
        req.custom_instructions = Some("Plan around two-week hardware lead times".into());
        let prompt = build_enhanced_prompt(&facts(), &req);
        assert!(prompt.contains("Plan around two-week hardware lead times"));
    }

    #[test]
    fn level_bands() {
        assert_eq!(creativity_instruction(70), creativity_instruction(100));
        assert_eq!(creativity_instruction(40), creativity_instruction(69));
        assert_ne!(creativity_instruction(39), creativity_instruction(40));
        assert_eq!(detail_instruction(80), detail_instruction(100));
        assert_eq!(detail_instruction(60), detail_instruction(79));
        assert_ne!(detail_instruction(59), detail_instruction(60));
    }

    #[test]
    fn post_processing_adds_criteria_and_only_lifts_low() {
        let mut req = GenerationRequest::new("p1");
        req.detail_level = 70;
        req.creativity_level = 81;
        let out = post_process(
            vec![
                DraftTask::new("a", "low", Priority::Low, 1),
                DraftTask::new("b", "high", Priority::High, 1),
            ],
            &req,
        );
        assert_eq!(out[0].priority, Priority::Medium);
        assert_eq!(out[1].priority, Priority::High);
        assert!(out[0].description.starts_with("low\n\nAcceptance Criteria:"));

        req.detail_level = 69;
        req.creativity_level = 80;
        let out = post_process(vec![DraftTask::new("a", "low", Priority::Low, 1)], &req);
        assert_eq!(out[0], DraftTask::new("a", "low", Priority::Low, 1));
    }

    #[tokio::test]
    async fn failing_client_yields_truncated_fallback() {
        let mut req = GenerationRequest::new("p1");
        req.task_count = 3;
        let drafts = generator(Arc::new(FailingClient)).generate_drafts(&facts(), &req).await;
        let titles: Vec<&str> = drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Project Planning & Requirements", "System Design & Architecture", "Core Development Setup"]);
    }

    #[tokio::test]
    async fn failing_client_never_pads() {
        let mut req = GenerationRequest::new("p1");
        req.task_count = 20;
        let drafts = generator(Arc::new(FailingClient)).generate_drafts(&facts(), &req).await;
        assert_eq!(drafts.len(), 6);
    }

    #[tokio::test]
    async fn unparseable_reply_uses_fallback() {
        let client = Arc::new(CannedClient::new("I'm sorry, I can't help with that."));
        let drafts = generator(client).generate_basic("Demo", None).await;
        assert_eq!(drafts, fallback_tasks("Demo"));
    }

    #[tokio::test]
    async fn model_reply_is_used_and_prompt_sent() {
        let client = Arc::new(CannedClient::new(
            r#"{"tasks":[{"title":"One","description":"d","priority":"LOW","estimatedDays":1},{"title":"Two","description":"d","priority":"HIGH","estimatedDays":2},{"title":"Three","description":"d","priority":"MEDIUM","estimatedDays":3}]}"#,
        ));
        let mut req = GenerationRequest::new("p1");
        req.task_count = 2;
        req.detail_level = 50;
        let drafts = generator(client.clone()).generate_drafts(&facts(), &req).await;
        assert_eq!(drafts, vec![
            DraftTask::new("One", "d", Priority::Low, 1),
            DraftTask::new("Two", "d", Priority::High, 2),
        ]);
        assert!(client.prompts.lock()[0].contains("exactly 2 realistic"));
    }
}
