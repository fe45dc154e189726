use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{DocumentsFile, Priority, TaskDocument, TaskSummary, Timestamp};
use crate::storage::{Storage, StorageError};

const SCHEMA_VERSION: u32 = 1;

/// A validated create request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub due_date: Option<Timestamp>,
    pub is_completed: bool,
}

/// A validated partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Timestamp>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    pub category: Option<String>,
    pub completed: Option<bool>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

impl TaskQuery {
    fn matches(&self, doc: &TaskDocument) -> bool {
        if let Some(category) = &self.category {
            if doc.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if doc.is_completed != completed {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !doc.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Task documents shared by all request handlers, scoped by owner on every
/// read and write. With storage attached, each mutation is snapshotted to
/// `tasks.json` before it becomes visible.
#[derive(Clone, Default)]
pub struct TaskRepository {
    docs: Arc<Mutex<Vec<TaskDocument>>>,
    storage: Option<Storage>,
}

impl TaskRepository {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `tasks.json`. A missing or unreadable file starts empty.
    pub fn open(storage: Storage) -> Self {
        let docs = match storage.load_documents() {
            Ok(file) => file.tasks,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => {
                log::warn!("could not load task documents, starting empty: {err}");
                Vec::new()
            }
        };
        log::info!("loaded {} task documents", docs.len());
        Self {
            docs: Arc::new(Mutex::new(docs)),
            storage: Some(storage),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskDocument>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(
        &self,
        docs: &mut MutexGuard<'_, Vec<TaskDocument>>,
        next: Vec<TaskDocument>,
    ) -> Result<(), StorageError> {
        if let Some(storage) = &self.storage {
            storage.ensure_dirs()?;
            storage.save_documents(&DocumentsFile {
                schema_version: SCHEMA_VERSION,
                tasks: next.clone(),
            })?;
        }
        **docs = next;
        Ok(())
    }

    pub fn list(&self, user_id: &str, query: &TaskQuery) -> Vec<TaskDocument> {
        self.lock()
            .iter()
            .filter(|doc| doc.user_id == user_id && query.matches(doc))
            .cloned()
            .collect()
    }

    pub fn create(
        &self,
        user_id: &str,
        input: NewDocument,
        now: Timestamp,
    ) -> Result<TaskDocument, StorageError> {
        let doc = TaskDocument {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: input.title,
            description: input.description,
            category: input.category,
            tags: input.tags,
            priority: input.priority,
            due_date: input.due_date,
            is_completed: input.is_completed,
            created_at: now,
            updated_at: now,
        };
        let mut docs = self.lock();
        let mut next = docs.clone();
        next.push(doc.clone());
        self.commit(&mut docs, next)?;
        Ok(doc)
    }

    /// Returns `None` when no document with `id` belongs to `user_id`.
    pub fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: DocumentPatch,
        now: Timestamp,
    ) -> Result<Option<TaskDocument>, StorageError> {
        let mut docs = self.lock();
        let Some(index) = docs
            .iter()
            .position(|doc| doc.id == id && doc.user_id == user_id)
        else {
            return Ok(None);
        };
        let mut next = docs.clone();
        let doc = &mut next[index];
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(description) = patch.description {
            doc.description = description;
        }
        if let Some(category) = patch.category {
            doc.category = category;
        }
        if let Some(tags) = patch.tags {
            doc.tags = tags;
        }
        if let Some(priority) = patch.priority {
            doc.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            doc.due_date = Some(due_date);
        }
        if let Some(is_completed) = patch.is_completed {
            doc.is_completed = is_completed;
        }
        doc.updated_at = now;
        let updated = doc.clone();
        self.commit(&mut docs, next)?;
        Ok(Some(updated))
    }

    /// Returns `false` when no document with `id` belongs to `user_id`.
    pub fn delete(&self, user_id: &str, id: &str) -> Result<bool, StorageError> {
        let mut docs = self.lock();
        if !docs.iter().any(|doc| doc.id == id && doc.user_id == user_id) {
            return Ok(false);
        }
        let next = docs
            .iter()
            .filter(|doc| !(doc.id == id && doc.user_id == user_id))
            .cloned()
            .collect();
        self.commit(&mut docs, next)?;
        Ok(true)
    }

    pub fn summary(&self, user_id: &str) -> TaskSummary {
        let docs = self.lock();
        let (completed, pending) = docs
            .iter()
            .filter(|doc| doc.user_id == user_id)
            .fold((0, 0), |(done, open), doc| {
                if doc.is_completed {
                    (done + 1, open)
                } else {
                    (done, open + 1)
                }
            });
        TaskSummary {
            total: completed + pending,
            completed,
            pending,
        }
    }

    /// Incomplete documents of every user due at or before `cutoff`, overdue included.
    pub fn due_by(&self, cutoff: Timestamp) -> Vec<TaskDocument> {
        self.lock()
            .iter()
            .filter(|doc| !doc.is_completed && doc.due_date.is_some_and(|due| due <= cutoff))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            description: None,
            category: None,
            tags: Vec::new(),
            priority: Priority::Medium,
            due_date: None,
            is_completed: false,
        }
    }

    #[test]
    fn documents_are_scoped_to_their_owner() {
        let repo = TaskRepository::in_memory();
        let mine = repo.create("alice", input("mine"), 1).unwrap();
        repo.create("bob", input("theirs"), 1).unwrap();

        let listed = repo.list("alice", &TaskQuery::default());
        assert_eq!(listed, vec![mine.clone()]);

        let patch = DocumentPatch {
            is_completed: Some(true),
            ..DocumentPatch::default()
        };
        assert_eq!(repo.update("bob", &mine.id, patch.clone(), 2).unwrap(), None);
        assert!(!repo.delete("bob", &mine.id).unwrap());

        let updated = repo.update("alice", &mine.id, patch, 2).unwrap().unwrap();
        assert!(updated.is_completed);
        assert_eq!(updated.updated_at, 2);
        assert_eq!(updated.created_at, 1);

        assert!(repo.delete("alice", &mine.id).unwrap());
        assert!(repo.list("alice", &TaskQuery::default()).is_empty());
        assert_eq!(repo.list("bob", &TaskQuery::default()).len(), 1);
    }

    #[test]
    fn query_filters_combine() {
        let repo = TaskRepository::in_memory();
        let mut work = input("Write Report");
        work.category = Some("work".into());
        repo.create("u", work, 1).unwrap();
        let mut done = input("report archive");
        done.category = Some("work".into());
        done.is_completed = true;
        repo.create("u", done, 1).unwrap();
        repo.create("u", input("groceries"), 1).unwrap();

        let titles = |query: TaskQuery| -> Vec<String> {
            repo.list("u", &query).into_iter().map(|d| d.title).collect()
        };
        assert_eq!(
            titles(TaskQuery {
                search: Some("REPORT".into()),
                ..TaskQuery::default()
            }),
            vec!["Write Report", "report archive"]
        );
        assert_eq!(
            titles(TaskQuery {
                category: Some("work".into()),
                completed: Some(false),
                ..TaskQuery::default()
            }),
            vec!["Write Report"]
        );
    }

    #[test]
    fn summary_counts_owned_documents() {
        let repo = TaskRepository::in_memory();
        let a = repo.create("u", input("a"), 1).unwrap();
        repo.create("u", input("b"), 1).unwrap();
        repo.create("other", input("c"), 1).unwrap();
        repo.update(
            "u",
            &a.id,
            DocumentPatch {
                is_completed: Some(true),
                ..DocumentPatch::default()
            },
            2,
        )
        .unwrap();

        assert_eq!(
            repo.summary("u"),
            TaskSummary {
                total: 2,
                completed: 1,
                pending: 1
            }
        );
        assert_eq!(repo.summary("nobody").total, 0);
    }

    #[test]
    fn due_by_includes_overdue_and_skips_completed() {
        let repo = TaskRepository::in_memory();
        let mut overdue = input("overdue");
        overdue.due_date = Some(10);
        repo.create("u", overdue, 0).unwrap();
        let mut soon = input("soon");
        soon.due_date = Some(100);
        repo.create("v", soon, 0).unwrap();
        let mut later = input("later");
        later.due_date = Some(1_000);
        repo.create("u", later, 0).unwrap();
        let mut finished = input("finished");
        finished.due_date = Some(5);
        finished.is_completed = true;
        repo.create("u", finished, 0).unwrap();
        repo.create("u", input("undated"), 0).unwrap();

        let titles: Vec<String> = repo.due_by(100).into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["overdue", "soon"]);
    }

    #[test]
    fn snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("data"));
        let repo = TaskRepository::open(storage.clone());
        let doc = repo.create("u", input("persisted"), 7).unwrap();

        let reopened = TaskRepository::open(storage);
        assert_eq!(reopened.list("u", &TaskQuery::default()), vec![doc]);
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tasks.json"), b"{oops").unwrap();
        let repo = TaskRepository::open(Storage::new(dir.path().to_path_buf()));
        assert!(repo.list("u", &TaskQuery::default()).is_empty());
    }

    #[test]
    fn failed_snapshot_leaves_documents_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the snapshot file makes every save fail.
        std::fs::create_dir_all(dir.path().join("tasks.json")).unwrap();
        let repo = TaskRepository::open(Storage::new(dir.path().to_path_buf()));

        assert!(repo.create("u", input("lost"), 1).is_err());
        assert!(repo.list("u", &TaskQuery::default()).is_empty());
    }
}
