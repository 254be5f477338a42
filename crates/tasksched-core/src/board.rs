//! The board owns the cached task list and every flag the screen shows.
//!
//! It is the only place the list is mutated: wholesale on fetch, and
//! incrementally (prepend, replace in place, remove) after a mutation call
//! succeeds. There is no re-fetch after a mutation and no reconciliation
//! with changes made by other clients.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiError, TaskService};
use crate::filter::Filter;
use crate::task::{Task, TaskCreate, TaskId, TaskPatch};

pub const FORMAT_ERROR: &str = "Invalid data format received from server";

/// A titled task list on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Overdue,
    Today,
    Pending,
    Completed,
    Filtered(Filter),
}

impl Section {
    pub fn title(&self) -> String {
        match self {
            Section::Overdue => "Overdue Tasks".to_string(),
            Section::Today => "Today's Tasks".to_string(),
            Section::Pending => "To Do".to_string(),
            Section::Completed => "Completed".to_string(),
            Section::Filtered(filter) => format!("{} Tasks", filter.label()),
        }
    }

    /// Only completed lists offer the bulk clear action.
    pub fn allows_bulk_clear(&self) -> bool {
        matches!(
            self,
            Section::Completed | Section::Filtered(Filter::Completed)
        )
    }
}

/// Views derived from the cached list, recomputed on demand.
#[derive(Debug, Default)]
pub struct TaskGroups<'a> {
    pub pending: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
    pub overdue: Vec<&'a Task>,
    pub today: Vec<&'a Task>,
    pub scheduled: Vec<&'a Task>,
}

impl<'a> TaskGroups<'a> {
    pub fn from_tasks(tasks: &'a [Task]) -> Self {
        let mut groups = Self::default();
        for task in tasks {
            if task.is_done {
                groups.completed.push(task);
            } else {
                groups.pending.push(task);
            }
            if task.is_overdue {
                groups.overdue.push(task);
            }
            if task.is_today() {
                groups.today.push(task);
            }
            if task.is_scheduled_pending() {
                groups.scheduled.push(task);
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
    pub today: usize,
    pub scheduled: usize,
    pub completion_rate: u8,
}

/// Rounded percentage of completed tasks; 0 for an empty list.
pub fn completion_rate(tasks: &[Task]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.is_done).count();
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Accepts a bare array or a `{"results": [...]}` envelope.
pub fn tasks_from_payload(payload: Value) -> Option<Vec<Task>> {
    let list = match payload {
        Value::Array(_) => payload,
        Value::Object(mut envelope) => match envelope.remove("results") {
            Some(results @ Value::Array(_)) => results,
            _ => return None,
        },
        _ => return None,
    };

    match serde_json::from_value(list) {
        Ok(tasks) => Some(tasks),
        Err(err) => {
            warn!(error = %err, "task list entries did not decode");
            None
        }
    }
}

pub struct Board<S> {
    service: S,
    tasks: Vec<Task>,
    loading: bool,
    submitting: bool,
    error: Option<String>,
    active_filter: Filter,
}

impl<S: TaskService> Board<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            tasks: Vec::new(),
            loading: true,
            submitting: false,
            error: None,
            active_filter: Filter::All,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn active_filter(&self) -> Filter {
        self.active_filter
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn groups(&self) -> TaskGroups<'_> {
        TaskGroups::from_tasks(&self.tasks)
    }

    pub fn stats(&self) -> BoardStats {
        let groups = self.groups();
        BoardStats {
            total: self.tasks.len(),
            pending: groups.pending.len(),
            completed: groups.completed.len(),
            overdue: groups.overdue.len(),
            today: groups.today.len(),
            scheduled: groups.scheduled.len(),
            completion_rate: completion_rate(&self.tasks),
        }
    }

    /// Non-empty lists to show for the active filter, in display order.
    pub fn sections(&self) -> Vec<(Section, Vec<&Task>)> {
        if self.active_filter != Filter::All {
            if self.tasks.is_empty() {
                return vec![];
            }
            return vec![(
                Section::Filtered(self.active_filter),
                self.tasks.iter().collect(),
            )];
        }

        let groups = self.groups();
        [
            (Section::Overdue, groups.overdue),
            (Section::Today, groups.today),
            (Section::Pending, groups.pending),
            (Section::Completed, groups.completed),
        ]
        .into_iter()
        .filter(|(_, tasks)| !tasks.is_empty())
        .collect()
    }

    /// Initial unfiltered load.
    pub async fn mount(&mut self) {
        self.fetch(Filter::All).await;
    }

    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn fetch(&mut self, filter: Filter) {
        self.loading = true;
        self.error = None;

        match self.service.list_tasks(filter).await {
            Ok(payload) => match tasks_from_payload(payload) {
                Some(tasks) => {
                    debug!(count = tasks.len(), "replaced cached task list");
                    self.tasks = tasks;
                }
                None => {
                    error!("task list response had an unexpected shape");
                    self.tasks.clear();
                    self.error = Some(FORMAT_ERROR.to_string());
                }
            },
            Err(ApiError::Decode(detail)) => {
                error!(%detail, "task list response was not JSON");
                self.tasks.clear();
                self.error = Some(FORMAT_ERROR.to_string());
            }
            Err(err) => {
                error!(error = %err, "fetching tasks failed");
                self.tasks.clear();
                self.error = Some(format!("Failed to fetch tasks: {err}"));
            }
        }

        self.loading = false;
    }

    /// Records the filter and asks the server for that subset.
    pub async fn change_filter(&mut self, filter: Filter) {
        info!(filter = %filter, "filter changed");
        self.active_filter = filter;
        self.fetch(filter).await;
    }

    pub async fn refresh(&mut self) {
        self.fetch(self.active_filter).await;
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len()))]
    pub async fn create(&mut self, create: TaskCreate) {
        self.submitting = true;
        self.error = None;

        match self.service.create_task(&create).await {
            Ok(task) => {
                info!(id = task.id, "task created");
                self.tasks.insert(0, task);
            }
            Err(err) => {
                error!(error = %err, "creating task failed");
                let message = match err.validation_message() {
                    Some(message) => message.to_string(),
                    None if err.is_bad_request() => "Failed to create task".to_string(),
                    None => format!("Failed to create task: {err}"),
                };
                self.error = Some(message);
            }
        }

        self.submitting = false;
    }

    /// Sends the inverse of `current` and swaps in the server's copy.
    #[instrument(skip(self))]
    pub async fn toggle(&mut self, id: TaskId, current: bool) {
        let patch = TaskPatch::completion(!current);
        self.update(id, patch).await;
    }

    /// Server-side flip for a task whose cached flag is unknown.
    #[instrument(skip(self))]
    pub async fn flip(&mut self, id: TaskId) {
        match self.service.toggle_task(id).await {
            Ok(task) => self.replace(task),
            Err(err) => {
                error!(error = %err, "toggling task failed");
                self.error = Some(format!("Failed to update task: {err}"));
            }
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&mut self, id: TaskId, patch: TaskPatch) {
        match self.service.update_task(id, &patch).await {
            Ok(task) => self.replace(task),
            Err(err) => {
                error!(error = %err, "updating task failed");
                self.error = Some(format!("Failed to update task: {err}"));
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: TaskId) {
        match self.service.delete_task(id).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.tasks.retain(|task| task.id != id);
            }
            Err(err) => {
                error!(error = %err, "deleting task failed");
                self.error = Some(format!("Failed to delete task: {err}"));
            }
        }
    }

    /// Deletes concurrently and waits for every call. The local list only
    /// changes when all of them succeed.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn bulk_delete(&mut self, ids: &[TaskId]) {
        let service = &self.service;
        let outcomes = join_all(ids.iter().map(|id| service.delete_task(*id))).await;

        let failures: Vec<ApiError> = outcomes.into_iter().filter_map(Result::err).collect();
        if let Some(first) = failures.first() {
            error!(failed = failures.len(), error = %first, "bulk delete failed");
            self.error = Some(format!("Failed to delete tasks: {first}"));
            return;
        }

        info!(count = ids.len(), "tasks deleted");
        self.tasks.retain(|task| !ids.contains(&task.id));
    }

    fn replace(&mut self, updated: Task) {
        for task in self.tasks.iter_mut().filter(|task| task.id == updated.id) {
            *task = updated.clone();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use serde_json::{Value, json};

    use super::{Board, FORMAT_ERROR, Section, TaskGroups, completion_rate, tasks_from_payload};
    use crate::api::{ApiError, TaskService};
    use crate::filter::Filter;
    use crate::task::{Priority, Task, TaskCreate, TaskId, TaskPatch};

    pub(crate) fn task(id: TaskId, done: bool) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            is_done: done,
            due_date: None,
            scheduled_date: None,
            priority: Priority::Medium,
            priority_order: None,
            created_at: None,
            updated_at: None,
            completed_at: None,
            is_overdue: false,
            is_due_today: false,
            is_scheduled_for_today: false,
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeService {
        pub(crate) server: RefCell<Vec<Task>>,
        pub(crate) payload: Option<Value>,
        pub(crate) fail_all: bool,
        pub(crate) fail_delete: Vec<TaskId>,
        pub(crate) validation: Option<String>,
        pub(crate) calls: RefCell<Vec<String>>,
        pub(crate) patches: RefCell<Vec<Value>>,
    }

    impl FakeService {
        pub(crate) fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                server: RefCell::new(tasks),
                ..Self::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        fn failure(&self) -> ApiError {
            ApiError::Status {
                status: 500,
                validation: None,
            }
        }
    }

    impl TaskService for FakeService {
        async fn list_tasks(&self, filter: Filter) -> Result<Value, ApiError> {
            self.record(format!("list {filter}"));
            if self.fail_all {
                return Err(self.failure());
            }
            if let Some(payload) = &self.payload {
                return Ok(payload.clone());
            }
            serde_json::to_value(&*self.server.borrow())
                .map_err(|err| ApiError::Decode(err.to_string()))
        }

        async fn create_task(&self, create: &TaskCreate) -> Result<Task, ApiError> {
            self.record(format!("create {}", create.title));
            if let Some(message) = &self.validation {
                return Err(ApiError::Status {
                    status: 400,
                    validation: Some(message.clone()),
                });
            }
            if self.fail_all {
                return Err(self.failure());
            }
            let mut created = task(99, false);
            created.title = create.title.clone();
            created.priority = create.priority;
            self.server.borrow_mut().push(created.clone());
            Ok(created)
        }

        async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
            self.record(format!("update {id}"));
            if let Ok(body) = serde_json::to_value(patch) {
                self.patches.borrow_mut().push(body);
            }
            if self.fail_all {
                return Err(self.failure());
            }
            let mut server = self.server.borrow_mut();
            let found = server
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(ApiError::Status {
                    status: 404,
                    validation: None,
                })?;
            // Same rule as the real endpoint: no `is_done` means flip and
            // ignore the rest of the body.
            let Some(done) = patch.is_done else {
                found.is_done = !found.is_done;
                return Ok(found.clone());
            };
            found.is_done = done;
            if let Some(title) = &patch.title {
                found.title = title.clone();
            }
            Ok(found.clone())
        }

        async fn toggle_task(&self, id: TaskId) -> Result<Task, ApiError> {
            self.record(format!("toggle {id}"));
            self.update_task(id, &TaskPatch::default()).await
        }

        async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
            self.record(format!("delete {id}"));
            if self.fail_all || self.fail_delete.contains(&id) {
                return Err(self.failure());
            }
            self.server.borrow_mut().retain(|task| task.id != id);
            Ok(())
        }
    }

    async fn mounted(service: FakeService) -> Board<FakeService> {
        let mut board = Board::new(service);
        board.mount().await;
        board
    }

    fn ids(tasks: &[Task]) -> Vec<TaskId> {
        tasks.iter().map(|task| task.id).collect()
    }

    #[test]
    fn pending_and_completed_partition_the_list() {
        let tasks: Vec<Task> = (1..=7).map(|id| task(id, id % 3 == 0)).collect();
        let groups = TaskGroups::from_tasks(&tasks);

        assert_eq!(groups.pending.len() + groups.completed.len(), tasks.len());
        assert!(groups.pending.iter().all(|task| !task.is_done));
        assert!(groups.completed.iter().all(|task| task.is_done));
        for task in &tasks {
            let in_pending = groups.pending.iter().any(|t| t.id == task.id);
            let in_completed = groups.completed.iter().any(|t| t.id == task.id);
            assert!(in_pending ^ in_completed);
        }
    }

    #[test]
    fn derived_groups_trust_server_flags() {
        let mut overdue = task(1, false);
        overdue.is_overdue = true;
        let mut scheduled_today = task(2, false);
        scheduled_today.is_scheduled_for_today = true;
        scheduled_today.scheduled_date = Some(chrono::Utc::now());
        let mut scheduled_done = task(3, true);
        scheduled_done.scheduled_date = Some(chrono::Utc::now());
        let tasks = vec![overdue, scheduled_today, scheduled_done];

        let groups = TaskGroups::from_tasks(&tasks);
        assert_eq!(groups.overdue.len(), 1);
        assert_eq!(groups.today.len(), 1);
        assert_eq!(groups.scheduled.len(), 1);
        assert_eq!(groups.scheduled[0].id, 2);
    }

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(&[]), 0);
        let one_of_three = vec![task(1, true), task(2, false), task(3, false)];
        assert_eq!(completion_rate(&one_of_three), 33);
        let two_of_three = vec![task(1, true), task(2, true), task(3, false)];
        assert_eq!(completion_rate(&two_of_three), 67);
        let one_of_eight: Vec<Task> = (1..=8).map(|id| task(id, id == 1)).collect();
        assert_eq!(completion_rate(&one_of_eight), 13);
    }

    #[test]
    fn payload_shapes() {
        let bare = json!([{"id": 1, "title": "a"}]);
        assert_eq!(tasks_from_payload(bare).map(|t| t.len()), Some(1));
        let envelope = json!({"count": 1, "results": [{"id": 2, "title": "b"}]});
        assert_eq!(tasks_from_payload(envelope).map(|t| t.len()), Some(1));
        assert!(tasks_from_payload(json!({"items": []})).is_none());
        assert!(tasks_from_payload(json!("nope")).is_none());
        assert!(tasks_from_payload(json!([{"title": "missing id"}])).is_none());
    }

    #[tokio::test]
    async fn mount_loads_the_list() {
        let board = mounted(FakeService::with_tasks(vec![task(1, false), task(2, true)])).await;
        assert!(!board.is_loading());
        assert_eq!(ids(board.tasks()), vec![1, 2]);
        assert_eq!(board.error(), None);
        assert_eq!(board.service().calls.borrow().as_slice(), ["list all"]);
    }

    #[tokio::test]
    async fn unexpected_shape_clears_list_with_format_error() {
        let mut board = mounted(FakeService::with_tasks(vec![task(1, false)])).await;
        assert_eq!(board.tasks().len(), 1);

        board.service.payload = Some(json!({"tasks": []}));
        board.refresh().await;
        assert!(board.tasks().is_empty());
        assert_eq!(board.error(), Some(FORMAT_ERROR));
    }

    #[tokio::test]
    async fn fetch_failure_clears_list() {
        let service = FakeService {
            fail_all: true,
            ..FakeService::with_tasks(vec![task(1, false)])
        };
        let board = mounted(service).await;
        assert!(board.tasks().is_empty());
        assert_eq!(
            board.error(),
            Some("Failed to fetch tasks: request failed with status code 500")
        );
    }

    #[tokio::test]
    async fn change_filter_fetches_that_subset() {
        let mut board = mounted(FakeService::with_tasks(vec![task(1, false)])).await;
        board.change_filter(Filter::Overdue).await;
        assert_eq!(board.active_filter(), Filter::Overdue);
        board.refresh().await;
        assert_eq!(
            board.service().calls.borrow().as_slice(),
            ["list all", "list overdue", "list overdue"]
        );
    }

    #[tokio::test]
    async fn create_prepends_server_copy() {
        let mut board = mounted(FakeService::with_tasks(vec![task(1, false)])).await;
        board
            .create(TaskCreate {
                title: "fresh".to_string(),
                description: String::new(),
                priority: Priority::High,
                due_date: None,
                scheduled_date: None,
            })
            .await;

        assert!(!board.is_submitting());
        assert_eq!(ids(board.tasks()), vec![99, 1]);
        assert_eq!(board.tasks()[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn create_validation_error_becomes_banner() {
        let service = FakeService {
            validation: Some("Due date cannot be in the past.".to_string()),
            ..FakeService::default()
        };
        let mut board = mounted(service).await;
        board
            .create(TaskCreate {
                title: "late".to_string(),
                description: String::new(),
                priority: Priority::Medium,
                due_date: None,
                scheduled_date: None,
            })
            .await;

        assert!(board.tasks().is_empty());
        assert_eq!(board.error(), Some("Due date cannot be in the past."));
        board.dismiss_error();
        assert_eq!(board.error(), None);
    }

    #[tokio::test]
    async fn toggle_replaces_exactly_one_entry() {
        let mut board =
            mounted(FakeService::with_tasks(vec![task(1, false), task(2, false), task(3, true)]))
                .await;
        let before = board.tasks().to_vec();

        board.toggle(2, false).await;

        assert_eq!(board.tasks().len(), before.len());
        assert_eq!(ids(board.tasks()), vec![1, 2, 3]);
        assert!(board.task(2).map(|t| t.is_done).unwrap_or(false));
        assert_eq!(board.tasks()[0], before[0]);
        assert_eq!(board.tasks()[2], before[2]);
    }

    #[tokio::test]
    async fn flip_lets_the_server_decide() {
        let mut board = mounted(FakeService::with_tasks(vec![task(1, true)])).await;
        board.flip(1).await;
        assert_eq!(board.task(1).map(|t| t.is_done), Some(false));
        assert!(board.service().calls.borrow().contains(&"toggle 1".to_string()));
    }

    #[tokio::test]
    async fn failed_update_keeps_list_and_sets_banner() {
        let mut board = mounted(FakeService::with_tasks(vec![task(1, false)])).await;
        board.update(5, TaskPatch::completion(true)).await;
        assert_eq!(ids(board.tasks()), vec![1]);
        assert_eq!(
            board.error(),
            Some("Failed to update task: request failed with status code 404")
        );
    }

    #[tokio::test]
    async fn delete_removes_one_and_keeps_order() {
        let mut board = mounted(FakeService::with_tasks(
            (1..=5).map(|id| task(id, false)).collect(),
        ))
        .await;
        board.delete(3).await;
        assert_eq!(ids(board.tasks()), vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn bulk_delete_all_succeed() {
        let mut board = mounted(FakeService::with_tasks(vec![
            task(1, true),
            task(2, true),
            task(3, true),
            task(4, false),
        ]))
        .await;
        board.bulk_delete(&[1, 2, 3]).await;
        assert_eq!(ids(board.tasks()), vec![4]);
        assert_eq!(board.error(), None);
    }

    #[tokio::test]
    async fn bulk_delete_with_one_rejection_changes_nothing() {
        let service = FakeService {
            fail_delete: vec![2],
            ..FakeService::with_tasks(vec![task(1, true), task(2, true), task(3, true)])
        };
        let mut board = mounted(service).await;
        board.bulk_delete(&[1, 2, 3]).await;

        assert_eq!(ids(board.tasks()), vec![1, 2, 3]);
        assert_eq!(
            board.error(),
            Some("Failed to delete tasks: request failed with status code 500")
        );
        let calls = board.service().calls.borrow();
        assert!(calls.contains(&"delete 1".to_string()));
        assert!(calls.contains(&"delete 3".to_string()));
    }

    #[tokio::test]
    async fn sections_follow_active_filter() {
        let mut overdue = task(1, false);
        overdue.is_overdue = true;
        let mut board =
            mounted(FakeService::with_tasks(vec![overdue, task(2, false), task(3, true)])).await;

        let titles: Vec<Section> = board.sections().into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            titles,
            vec![Section::Overdue, Section::Pending, Section::Completed]
        );

        board.change_filter(Filter::Completed).await;
        let sections = board.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0.title(), "Completed Tasks");
        assert!(sections[0].0.allows_bulk_clear());
    }
}
