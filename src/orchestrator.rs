use crate::{
    analyzer::analyze,
    drafts::TaskTemplateGenerator,
    error::{AppError, AppResult},
    models::{
        Complexity, DraftTask, FocusArea, GenerationMetadata, GenerationRequest, GenerationResult,
        LegacyGenerationResponse, ProjectFacts, TaskRequest, TaskStatus, TemplateStyle,
    },
    store::Store,
    timeline::{distribute, TimelineBounds, DAY_MS},
};
use chrono::{DateTime, NaiveDate, Utc};
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

const BASE_CONFIDENCE: f64 = 0.80;

/// Resolves the project, drafts tasks, schedules them and stores the batch.
pub struct TaskGenerationService {
    generator: TaskTemplateGenerator,
    store: Arc<dyn Store>,
}

impl TaskGenerationService {
    pub fn new(generator: TaskTemplateGenerator, store: Arc<dyn Store>) -> Self {
        Self { generator, store }
    }

    /// Never fails: every error becomes a `success: false` result.
    pub async fn generate(&self, req: &GenerationRequest) -> GenerationResult {
        self.generate_at(req, Utc::now().timestamp_millis()).await
    }

    pub async fn generate_at(&self, req: &GenerationRequest, now: i64) -> GenerationResult {
        let started = Instant::now();
        match self.try_generate(req, now, started).await {
            Ok(result) => result,
            Err(e) => {
                error!("❌ AI task generation for project {} failed: {}", req.project_id, e);
                GenerationResult::failure(format!("Failed to generate AI tasks: {e}"))
            }
        }
    }

    async fn try_generate(&self, req: &GenerationRequest, now: i64, started: Instant) -> AppResult<GenerationResult> {
        validate(req)?;
        let facts = self.resolve_facts(req, now).await?;
        let analysis = analyze(&facts, req);

        let drafts = if req.template_style.uses_enhanced_prompt() {
            self.generator.generate_drafts(&facts, req).await
        } else {
            let mut drafts = self.generator.generate_basic(&facts.name, facts.description.as_deref()).await;
            drafts.truncate(req.task_count() as usize);
            drafts
        };

        let due_dates: Vec<Option<i64>> = if req.include_timelines {
            let bounds = TimelineBounds::resolve(facts.start_date, facts.end_date, now);
            distribute(bounds, &drafts).into_iter().map(|t| Some(t.due_date)).collect()
        } else {
            vec![None; drafts.len()]
        };

        if req.auto_assign {
            // TODO: pick assignees from workspace member skills once membership data is exposed to this service.
            debug!("autoAssign requested for project {}; tasks stay unassigned", facts.id);
        }

        let batch = drafts
            .into_iter()
            .zip(due_dates)
            .enumerate()
            .map(|(i, (draft, due_date))| (task_request(&facts.id, draft, due_date), now + i as i64))
            .collect();
        let created = self.store.create_tasks_atomic(batch).await?;
        info!("✅ Generated {} tasks for project '{}'", created.len(), facts.name);

        let metadata = GenerationMetadata {
            generation_time: started.elapsed().as_millis() as u64,
            ai_model: self.generator.model().to_string(),
            confidence_score: confidence_score(req),
            preferences_used: req.snapshot(),
        };

        Ok(GenerationResult {
            success: true,
            message: format!("Generated {} AI tasks for project: {}", created.len(), facts.name),
            generated_tasks: created,
            analysis: Some(analysis),
            metadata: Some(metadata),
        })
    }

    async fn resolve_facts(&self, req: &GenerationRequest, now: i64) -> AppResult<ProjectFacts> {
        if let Some(ctx) = &req.project_context {
            return Ok(ProjectFacts {
                id: req.project_id.clone(),
                name: ctx.name.clone(),
                description: ctx.description.clone(),
                start_date: ctx.start_date.as_deref().and_then(|raw| parse_context_date(raw, now)),
                end_date: ctx.end_date.as_deref().and_then(|raw| parse_context_date(raw, now)),
                team_size: ctx.team_size,
                technologies: ctx.technologies.clone(),
                industry_type: ctx.industry_type.clone(),
            });
        }

        let project = self
            .store
            .find_project(&req.project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project not found: {}", req.project_id)))?;
        Ok(ProjectFacts::from(&project))
    }

    /// Preference-free generation for an existing project; due dates come from each draft's estimate.
    pub async fn generate_for_project(&self, project_id: &str) -> AppResult<LegacyGenerationResponse> {
        let now = Utc::now().timestamp_millis();
        let project = self
            .store
            .find_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project not found: {project_id}")))?;

        let drafts = self.generator.generate_basic(&project.name, project.description.as_deref()).await;
        let batch = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                let due_date = draft.estimated_days.map(|days| now + days as i64 * DAY_MS);
                (task_request(project_id, draft, due_date), now + i as i64)
            })
            .collect();
        let created = self.store.create_tasks_atomic(batch).await?;

        Ok(LegacyGenerationResponse {
            message: format!("Generated {} AI tasks for project: {}", created.len(), project.name),
            project,
            generated_tasks: created,
        })
    }
}

fn validate(req: &GenerationRequest) -> AppResult<()> {
    if req.task_count <= 0 {
        return Err(AppError::InvalidInput("taskCount must be a positive integer".into()));
    }
    if req.template_style == TemplateStyle::Custom && req.custom_instructions().is_none() {
        return Err(AppError::InvalidInput("customInstructions are required for the custom template style".into()));
    }
    Ok(())
}

fn task_request(project_id: &str, draft: DraftTask, due_date: Option<i64>) -> TaskRequest {
    TaskRequest {
        project_id: project_id.to_string(),
        title: draft.title,
        description: Some(draft.description),
        assignee_ids: Vec::new(),
        status: TaskStatus::ToDo,
        priority: draft.priority,
        due_date,
    }
}

/// Accepts epoch millis, `YYYY-MM-DD` (UTC midnight) or an RFC 3339 instant.
/// Blank input means no date; anything else unreadable falls back to `now`.
pub fn parse_context_date(raw: &str, now: i64) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        return Some(midnight.and_utc().timestamp_millis());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.timestamp_millis());
    }
    warn!("⚠️ Unrecognised project date {:?}, using current time", raw);
    Some(now)
}

pub fn confidence_score(req: &GenerationRequest) -> f64 {
    let mut score = BASE_CONFIDENCE;
    match req.complexity {
        Complexity::Simple => score += 0.1,
        Complexity::Detailed => score -= 0.1,
        Complexity::Balanced | Complexity::Unknown => {}
    }
    if req.focus_area != FocusArea::All {
        score += 0.05;
    }
    if (5..=12).contains(&req.task_count) {
        score += 0.05;
    }
    score.clamp(0.0, 1.0)
}
