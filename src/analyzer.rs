//! Heuristic project summary returned alongside generated tasks.
//!
//! Purely informational: nothing here feeds back into generation.

use crate::{
    models::{Complexity, FocusArea, GenerationRequest, ProjectAnalysis, ProjectFacts, TemplateStyle},
    timeline::DAY_MS,
};

pub fn analyze(facts: &ProjectFacts, req: &GenerationRequest) -> ProjectAnalysis {
    let project_days = facts.date_range().map(|(start, end)| (end.saturating_sub(start) / DAY_MS).max(0));
    let estimated_work_days = req.task_count() as i64 * req.complexity.days_per_task();
    let team_size = facts.team_size.unwrap_or_else(|| req.complexity.default_team_size());

    ProjectAnalysis {
        project_complexity: req.complexity.label().to_string(),
        estimated_duration: render_duration(project_days.unwrap_or(estimated_work_days)),
        recommended_team_size: team_size,
        risk_factors: risk_factors(req, project_days, estimated_work_days),
        key_milestones: milestones(req.template_style).iter().map(|m| m.to_string()).collect(),
        optimization_suggestions: suggestions(req, project_days, team_size),
    }
}

/// Truncating conversion into the coarsest sensible unit.
pub fn render_duration(days: i64) -> String {
    match days {
        d if d <= 14 => plural(d, "day"),
        d if d <= 60 => plural(d / 7, "week"),
        d if d <= 365 => plural(d / 30, "month"),
        d => plural(d / 365, "year"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
}

fn risk_factors(req: &GenerationRequest, project_days: Option<i64>, work_days: i64) -> Vec<String> {
    let mut risks = Vec::new();
    if req.task_count > 15 {
        risks.push(format!("Large scope: {} tasks may be hard to track without clear prioritisation", req.task_count));
    }
    if req.complexity == Complexity::Detailed {
        risks.push("High complexity requires experienced team members".to_string());
    }
    if req.creativity() > 70 {
        risks.push("High creativity setting may produce unconventional tasks that need extra review".to_string());
    }
    if let Some(days) = project_days {
        if work_days > days {
            risks.push(format!("Tight timeline: about {work_days} days of work planned in a {days}-day window"));
        }
        if days < 14 {
            risks.push("Short project duration requires intensive coordination".to_string());
        }
    }
    if req.template_style == TemplateStyle::Waterfall && req.task_count > 10 {
        risks.push("Many sequential waterfall phases increase the risk of late delivery".to_string());
    }
    risks
}

fn milestones(style: TemplateStyle) -> &'static [&'static str] {
    match style {
        TemplateStyle::Agile => &["Sprint 0: Backlog & Setup", "MVP Release", "Feature Complete", "Production Release"],
        TemplateStyle::Waterfall => &["Requirements Sign-off", "Design Approval", "Implementation Complete", "Testing Complete", "Deployment"],
        TemplateStyle::Kanban => &["Board & WIP Limits Defined", "First Items Delivered", "Flow Stabilised", "Continuous Delivery"],
        TemplateStyle::Custom | TemplateStyle::Unknown => &["Project Kickoff", "Mid-point Review", "Final Delivery"],
    }
}

fn suggestions(req: &GenerationRequest, project_days: Option<i64>, team_size: u32) -> Vec<String> {
    let mut out = Vec::new();
    if req.focus_area == FocusArea::All {
        out.push("Consider narrowing the focus area for more targeted tasks".to_string());
    }
    if !req.include_timelines {
        out.push("Enable timelines to spread due dates across the project window".to_string());
    }
    if req.detail() < 50 {
        out.push("Increase the detail level for clearer task descriptions".to_string());
    }
    if let Some(days) = project_days {
        if days > 90 && req.template_style != TemplateStyle::Agile {
            out.push("Long projects benefit from Agile iterations and regular feedback".to_string());
        }
        if days < 30 && req.task_count > 8 {
            out.push(format!("Reduce scope or extend the timeline: {} tasks in {} days", req.task_count, days));
        }
    }
    if req.template_style == TemplateStyle::Kanban && !req.include_dependencies {
        out.push("Enable dependencies to surface blockers on the Kanban board".to_string());
    }
    if req.auto_assign && team_size > 1 {
        out.push("Verify team member skills are up to date before relying on auto-assignment".to_string());
    }
    out
}
