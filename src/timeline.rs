use crate::models::DraftTask;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const HALF_DAY_MS: i64 = DAY_MS / 2;
const DEFAULT_WINDOW_DAYS: i64 = 90;

/// Inclusive window that due dates are spread over, in epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineBounds {
    pub start: i64,
    pub end: i64,
}

impl TimelineBounds {
    /// Missing start defaults to `now`, missing end to start + 90 days.
    /// Windows shorter than a day (or inverted) are widened to one day.
    pub fn resolve(project_start: Option<i64>, project_end: Option<i64>, now: i64) -> Self {
        let start = project_start.unwrap_or(now);
        let mut end = project_end.unwrap_or_else(|| start.saturating_add(DEFAULT_WINDOW_DAYS * DAY_MS));
        if end.saturating_sub(start) < DAY_MS {
            end = start.saturating_add(DAY_MS);
        }
        Self { start, end }
    }

    fn span(&self) -> i128 {
        self.end as i128 - self.start as i128
    }

    fn clamp(&self, due: i64) -> i64 {
        if due < self.start {
            self.start.saturating_add(HALF_DAY_MS)
        } else if due > self.end {
            self.end
        } else {
            due
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTimeline {
    pub due_date: i64,
}

/// Spreads drafts evenly across the window: first at `start`, last at `end`,
/// a lone draft at the midpoint.
pub fn distribute(bounds: TimelineBounds, drafts: &[DraftTask]) -> Vec<TaskTimeline> {
    let n = drafts.len() as i128;
    let span = bounds.span();

    (0..drafts.len())
        .map(|i| {
            let offset = if n == 1 { span / 2 } else { span * i as i128 / (n - 1) };
            let raw = bounds.start as i128 + offset;
            let due = i64::try_from(raw).unwrap_or(bounds.end);
            TaskTimeline { due_date: bounds.clamp(due) }
        })
        .collect()
}
