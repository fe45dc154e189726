//! HTTP consumer of the task API plus a local list model that reports
//! outcomes as toast notifications.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Priority, TaskDocument, TaskSummary};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// ISO 8601 date or date-time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Body of an update request; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/tasks{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiClientError> {
        let resp = request.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskDocument>, ApiClientError> {
        self.send(self.http.get(self.url(""))).await
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<TaskDocument, ApiClientError> {
        self.send(self.http.post(self.url("")).json(draft)).await
    }

    pub async fn update_task(
        &self,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<TaskDocument, ApiClientError> {
        self.send(self.http.put(self.url(&format!("/{id}"))).json(changes))
            .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ApiClientError> {
        let _: serde_json::Value = self
            .send(self.http.delete(self.url(&format!("/{id}"))))
            .await?;
        Ok(())
    }

    pub async fn summary(&self) -> Result<TaskSummary, ApiClientError> {
        self.send(self.http.get(self.url("/summary"))).await
    }
}

/// Sink for user-facing toast messages.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    All,
    Completed,
    Pending,
}

/// `None` means "all" for tag and priority.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteFilters {
    pub status: CompletionFilter,
    pub tag: Option<String>,
    pub priority: Option<Priority>,
}

impl RemoteFilters {
    pub fn matches(&self, task: &TaskDocument) -> bool {
        let status_ok = match self.status {
            CompletionFilter::All => true,
            CompletionFilter::Completed => task.is_completed,
            CompletionFilter::Pending => !task.is_completed,
        };
        status_ok
            && self.tag.as_ref().is_none_or(|tag| task.tags.contains(tag))
            && self.priority.is_none_or(|p| task.priority == p)
    }
}

/// Locally cached task list backed by the remote API.
pub struct RemoteTasks {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    tasks: Vec<TaskDocument>,
    loading: bool,
    last_error: Option<String>,
    pub filters: RemoteFilters,
}

impl RemoteTasks {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            tasks: Vec::new(),
            loading: false,
            last_error: None,
            filters: RemoteFilters::default(),
        }
    }

    pub fn tasks(&self) -> &[TaskDocument] {
        &self.tasks
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn filtered(&self) -> Vec<&TaskDocument> {
        self.tasks.iter().filter(|t| self.filters.matches(t)).collect()
    }

    pub async fn fetch(&mut self) -> Result<(), ApiClientError> {
        self.loading = true;
        let result = self.client.list_tasks().await;
        self.loading = false;
        match result {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.notifier.error("Failed to load tasks");
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, draft: &TaskDraft) -> Result<(), ApiClientError> {
        match self.client.create_task(draft).await {
            Ok(task) => {
                self.tasks.insert(0, task);
                self.notifier.success("Task created!");
                Ok(())
            }
            Err(err) => {
                log::warn!("create task failed: {err}");
                self.notifier.error("Failed to create task");
                Err(err)
            }
        }
    }

    /// On failure the cached list is left as it was.
    pub async fn update(&mut self, id: &str, changes: &TaskChanges) -> Result<(), ApiClientError> {
        match self.client.update_task(id, changes).await {
            Ok(updated) => {
                if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == id) {
                    *slot = updated;
                }
                self.notifier.success("Task updated!");
                Ok(())
            }
            Err(err) => {
                log::warn!("update task id={id} failed: {err}");
                self.notifier.error("Failed to update task");
                Err(err)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ApiClientError> {
        match self.client.delete_task(id).await {
            Ok(()) => {
                self.tasks.retain(|t| t.id != id);
                self.notifier.success("Task deleted!");
                Ok(())
            }
            Err(err) => {
                log::warn!("delete task id={id} failed: {err}");
                self.notifier.error("Failed to delete task");
                Err(err)
            }
        }
    }

    /// Flips completion of a cached task. Unknown ids are ignored.
    pub async fn toggle_complete(&mut self, id: &str) -> Result<(), ApiClientError> {
        let Some(current) = self.tasks.iter().find(|t| t.id == id).map(|t| t.is_completed) else {
            return Ok(());
        };
        let changes = TaskChanges {
            is_completed: Some(!current),
            ..TaskChanges::default()
        };
        self.update(id, &changes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::tests::{start_test_server, TOKEN};
    use crate::server::TaskRepository;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.messages.lock().unwrap())
        }
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("ok: {message}"));
        }

        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("err: {message}"));
        }
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            ..TaskDraft::default()
        }
    }

    #[tokio::test]
    async fn remote_list_tracks_server_results() {
        let (base, handle) = start_test_server(TaskRepository::in_memory()).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let mut remote = RemoteTasks::new(ApiClient::new(&base, TOKEN).unwrap(), notifier.clone());

        remote.create(&draft("first")).await.unwrap();
        remote
            .create(&TaskDraft {
                tags: vec!["home".into()],
                priority: Some(Priority::High),
                ..draft("second")
            })
            .await
            .unwrap();
        assert_eq!(notifier.take(), vec!["ok: Task created!", "ok: Task created!"]);
        // Newest first.
        assert_eq!(remote.tasks()[0].title, "second");

        let id = remote.tasks()[1].id.clone();
        remote.toggle_complete(&id).await.unwrap();
        assert!(remote.tasks()[1].is_completed);

        remote.filters.status = CompletionFilter::Pending;
        let titles: Vec<&str> = remote.filtered().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["second"]);
        remote.filters = RemoteFilters {
            tag: Some("work".into()),
            ..RemoteFilters::default()
        };
        assert!(remote.filtered().is_empty());

        remote.fetch().await.unwrap();
        assert_eq!(remote.tasks().len(), 2);
        assert!(!remote.loading());

        remote.delete(&id).await.unwrap();
        assert_eq!(remote.tasks().len(), 1);
        assert_eq!(notifier.take(), vec!["ok: Task updated!", "ok: Task deleted!"]);

        let client = ApiClient::new(&base, TOKEN).unwrap();
        assert_eq!(client.summary().await.unwrap().total, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn failures_toast_and_keep_local_state() {
        let (base, handle) = start_test_server(TaskRepository::in_memory()).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let mut remote = RemoteTasks::new(ApiClient::new(&base, TOKEN).unwrap(), notifier.clone());
        remote.create(&draft("keep me")).await.unwrap();
        notifier.take();

        let id = remote.tasks()[0].id.clone();
        let err = remote
            .update(
                &id,
                &TaskChanges {
                    priority: None,
                    title: Some(String::new()),
                    ..TaskChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiClientError::Status { status: 422, .. }));
        assert_eq!(remote.tasks()[0].title, "keep me");

        assert!(remote.create(&draft("")).await.is_err());
        assert!(remote.delete("6f1c1f0e-5a4b-4c7a-9f2e-0d7b8c9a1b2c").await.is_err());
        assert_eq!(
            notifier.take(),
            vec![
                "err: Failed to update task",
                "err: Failed to create task",
                "err: Failed to delete task"
            ]
        );

        // Unknown ids are a silent no-op.
        remote.toggle_complete("missing").await.unwrap();
        assert!(notifier.take().is_empty());

        let mut unauthorized =
            RemoteTasks::new(ApiClient::new(&base, "bad-token").unwrap(), notifier.clone());
        assert!(unauthorized.fetch().await.is_err());
        assert!(unauthorized.last_error().is_some());
        assert_eq!(notifier.take(), vec!["err: Failed to load tasks"]);
        handle.abort();
    }
}
