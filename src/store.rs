use crate::{
    error::{AppError, AppResult},
    models::{ListProjectTasks, Project, ProjectRequest, TaskRequest, TaskResponse, TaskStatus},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 10;

/// Persistence for projects and tasks.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_project(&self, req: ProjectRequest, now: i64) -> AppResult<Project>;
    async fn find_project(&self, id: &str) -> AppResult<Option<Project>>;
    async fn list_projects(&self) -> AppResult<Vec<Project>>;
    /// Removes the project and every task that belongs to it.
    async fn delete_project(&self, id: &str) -> AppResult<()>;

    async fn create_task_with_timestamp(&self, req: TaskRequest, created_at: i64) -> AppResult<TaskResponse>;
    /// All-or-nothing: either every task is stored or none is.
    async fn create_tasks_atomic(&self, batch: Vec<(TaskRequest, i64)>) -> AppResult<Vec<TaskResponse>>;
    async fn find_task(&self, id: &str) -> AppResult<Option<TaskResponse>>;
    /// Newest first, filtered by project and search text, paginated.
    async fn list_tasks_by_project(&self, query: &ListProjectTasks) -> AppResult<Vec<TaskResponse>>;
    async fn update_task(&self, task: TaskResponse, now: i64) -> AppResult<TaskResponse>;
    async fn update_task_status(&self, id: &str, status: TaskStatus, now: i64) -> AppResult<TaskResponse>;
    async fn delete_task(&self, id: &str) -> AppResult<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    tasks: RwLock<HashMap<String, TaskResponse>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn task_ids_for(&self, project_id: &str) -> Vec<String> {
        let tasks = self.tasks.read();
        let mut owned: Vec<&TaskResponse> = tasks.values().filter(|t| t.project_id == project_id).collect();
        owned.sort_by_key(|t| t.created_at);
        owned.into_iter().map(|t| t.id.clone()).collect()
    }

    fn with_task_ids(&self, mut project: Project) -> Project {
        project.task_ids = self.task_ids_for(&project.id);
        project
    }
}

fn validate_task(req: &TaskRequest) -> AppResult<()> {
    if req.project_id.trim().is_empty() {
        return Err(AppError::InvalidInput("Task projectId must not be blank".into()));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Task title must not be blank".into()));
    }
    Ok(())
}

fn build_task(req: TaskRequest, created_at: i64) -> TaskResponse {
    TaskResponse {
        id: Uuid::new_v4().to_string(),
        project_id: req.project_id,
        title: req.title.trim().to_string(),
        description: req.description,
        assignee_ids: req.assignee_ids,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
        created_at,
        updated_at: created_at,
    }
}

fn matches_search(task: &TaskResponse, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.description.as_deref().is_some_and(|d| d.to_lowercase().contains(needle))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_project(&self, req: ProjectRequest, now: i64) -> AppResult<Project> {
        if req.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Project name must not be blank".into()));
        }
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            task_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.projects.write().insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: &str) -> AppResult<Option<Project>> {
        let project = self.projects.read().get(id).cloned();
        Ok(project.map(|p| self.with_task_ids(p)))
    }

    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects.into_iter().map(|p| self.with_task_ids(p)).collect())
    }

    async fn delete_project(&self, id: &str) -> AppResult<()> {
        let mut projects = self.projects.write();
        if projects.remove(id).is_none() {
            return Err(AppError::NotFound(format!("No project found with ID: {id}")));
        }
        self.tasks.write().retain(|_, t| t.project_id != id);
        Ok(())
    }

    async fn create_task_with_timestamp(&self, req: TaskRequest, created_at: i64) -> AppResult<TaskResponse> {
        validate_task(&req)?;
        let task = build_task(req, created_at);
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn create_tasks_atomic(&self, batch: Vec<(TaskRequest, i64)>) -> AppResult<Vec<TaskResponse>> {
        for (req, _) in &batch {
            validate_task(req)?;
        }
        let created: Vec<TaskResponse> = batch.into_iter().map(|(req, at)| build_task(req, at)).collect();

        let mut tasks = self.tasks.write();
        for task in &created {
            tasks.insert(task.id.clone(), task.clone());
        }
        Ok(created)
    }

    async fn find_task(&self, id: &str) -> AppResult<Option<TaskResponse>> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn list_tasks_by_project(&self, query: &ListProjectTasks) -> AppResult<Vec<TaskResponse>> {
        let project_id = query.project_id.as_deref().filter(|p| !p.trim().is_empty());
        let needle = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        let page = query.page.unwrap_or(1).max(1);
        let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);

        let mut found: Vec<TaskResponse> = self
            .tasks
            .read()
            .values()
            .filter(|t| project_id.map_or(true, |p| t.project_id == p))
            .filter(|t| needle.as_deref().map_or(true, |n| matches_search(t, n)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found.into_iter().skip((page - 1).saturating_mul(size)).take(size).collect())
    }

    async fn update_task(&self, task: TaskResponse, now: i64) -> AppResult<TaskResponse> {
        if task.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Task title must not be blank".into()));
        }
        let mut tasks = self.tasks.write();
        let existing = tasks
            .get_mut(&task.id)
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {}", task.id)))?;
        existing.title = task.title;
        existing.description = task.description;
        existing.assignee_ids = task.assignee_ids;
        existing.status = task.status;
        existing.priority = task.priority;
        existing.due_date = task.due_date;
        existing.updated_at = now;
        Ok(existing.clone())
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus, now: i64) -> AppResult<TaskResponse> {
        let mut tasks = self.tasks.write();
        let existing = tasks
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {id}")))?;
        existing.status = status;
        existing.updated_at = now;
        Ok(existing.clone())
    }

    async fn delete_task(&self, id: &str) -> AppResult<()> {
        match self.tasks.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Task not found: {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use pretty_assertions::assert_eq;

    fn task(project: &str, title: &str) -> TaskRequest {
        TaskRequest {
            project_id: project.into(),
            title: title.into(),
            description: None,
            assignee_ids: vec![],
            status: TaskStatus::ToDo,
            priority: Priority::Medium,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn batch_with_a_bad_item_stores_nothing() {
        let store = InMemoryStore::new();
        let batch = vec![(task("p1", "Plan"), 1), (task("p1", "  "), 2), (task("p1", "Ship"), 3)];
        let err = store.create_tasks_atomic(batch).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let all = store.list_tasks_by_project(&ListProjectTasks::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn batch_keeps_explicit_timestamps() {
        let store = InMemoryStore::new();
        let created = store
            .create_tasks_atomic(vec![(task("p1", "A"), 100), (task("p1", "B"), 101)])
            .await
            .unwrap();
        assert_eq!(created.iter().map(|t| t.created_at).collect::<Vec<_>>(), vec![100, 101]);

        let listed = store
            .list_tasks_by_project(&ListProjectTasks { project_id: Some("p1".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn listing_filters_searches_and_paginates() {
        let store = InMemoryStore::new();
        for i in 0..12 {
            store.create_task_with_timestamp(task("p1", &format!("Task {i}")), i).await.unwrap();
        }
        store.create_task_with_timestamp(task("p2", "Other project"), 50).await.unwrap();

        let second_page = store
            .list_tasks_by_project(&ListProjectTasks { project_id: Some("p1".into()), page: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(second_page.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Task 1", "Task 0"]);

        let searched = store
            .list_tasks_by_project(&ListProjectTasks { search: Some("OTHER".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn huge_page_numbers_return_an_empty_page() {
        let store = InMemoryStore::new();
        store.create_task_with_timestamp(task("p1", "A"), 1).await.unwrap();
        let page = store
            .list_tasks_by_project(&ListProjectTasks { page: Some(usize::MAX), size: Some(10), ..Default::default() })
            .await
            .unwrap();
        assert!(page.is_empty());

        let unbounded = store
            .list_tasks_by_project(&ListProjectTasks { page: Some(2), size: Some(usize::MAX), ..Default::default() })
            .await
            .unwrap();
        assert!(unbounded.is_empty());
    }

    #[tokio::test]
    async fn project_lookup_reports_its_tasks() {
        let store = InMemoryStore::new();
        let project = store
            .create_project(ProjectRequest { name: "Demo".into(), description: None, start_date: None, end_date: None }, 7)
            .await
            .unwrap();
        let t = store.create_task_with_timestamp(task(&project.id, "A"), 8).await.unwrap();

        let found = store.find_project(&project.id).await.unwrap().unwrap();
        assert_eq!(found.task_ids, vec![t.id.clone()]);

        store.delete_project(&project.id).await.unwrap();
        assert!(store.find_project(&project.id).await.unwrap().is_none());
        assert!(store.find_task(&t.id).await.unwrap().is_none());
        assert!(matches!(store.delete_project(&project.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn status_updates_touch_updated_at() {
        let store = InMemoryStore::new();
        let t = store.create_task_with_timestamp(task("p1", "A"), 1).await.unwrap();
        let updated = store.update_task_status(&t.id, TaskStatus::Done, 99).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.updated_at, 99);
        assert_eq!(updated.created_at, 1);
        assert!(store.update_task_status("missing", TaskStatus::Done, 1).await.is_err());
    }

    #[tokio::test]
    async fn full_update_replaces_editable_fields() {
        let store = InMemoryStore::new();
        let mut t = store.create_task_with_timestamp(task("p1", "A"), 1).await.unwrap();
        t.title = "Renamed".into();
        t.priority = Priority::High;
        t.assignee_ids = vec!["u1".into()];
        let updated = store.update_task(t.clone(), 5).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.assignee_ids, vec!["u1".to_string()]);
        assert_eq!(updated.updated_at, 5);

        store.delete_task(&t.id).await.unwrap();
        assert!(matches!(store.delete_task(&t.id).await, Err(AppError::NotFound(_))));
    }
}
