use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SettingsFile;
use crate::models::DocumentsFile;
use crate::store::{RootState, StateVersion, StoreObserver};

/// Key of the slot holding the serialized client state tree.
pub const STATE_KEY: &str = "taskManagerState";
const DOCUMENTS_FILE: &str = "tasks.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(format!("{STATE_KEY}.json"))
    }

    pub fn load_state(&self) -> Result<RootState, StorageError> {
        self.load_json(self.state_path())
    }

    pub fn save_state(&self, state: &RootState) -> Result<(), StorageError> {
        self.write_atomic(self.state_path(), state)
    }

    pub fn load_documents(&self) -> Result<DocumentsFile, StorageError> {
        self.load_json(self.root.join(DOCUMENTS_FILE))
    }

    pub fn save_documents(&self, data: &DocumentsFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(DOCUMENTS_FILE), data)
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    pub fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

/// Rehydrates the client state. A missing or unreadable slot yields the default state.
pub fn load_initial_state(storage: &Storage) -> RootState {
    match storage.load_state() {
        Ok(state) => state,
        Err(err) if err.is_not_found() => RootState::default(),
        Err(err) => {
            log::warn!("could not load state, starting empty: {err}");
            RootState::default()
        }
    }
}

/// Store observer that writes a snapshot after every transition. Failures are logged only.
///
/// Writes are serialized, and a snapshot older than the last one written is skipped.
pub struct PersistenceBridge {
    storage: Storage,
    last_written: Mutex<StateVersion>,
}

impl PersistenceBridge {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            last_written: Mutex::new(0),
        }
    }
}

impl StoreObserver for PersistenceBridge {
    fn on_change(&self, state: &RootState, version: StateVersion) {
        let mut last_written = self
            .last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if version <= *last_written {
            log::trace!("skipping stale snapshot version={version} last={last_written}");
            return;
        }
        match self
            .storage
            .ensure_dirs()
            .and_then(|_| self.storage.save_state(state))
        {
            Ok(()) => *last_written = version,
            Err(err) => log::error!("could not save state: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthUser, NewTask, TaskCategory, TaskStatus};
    use crate::store::{ActivityAction, AuthAction, Store, TasksAction};
    use std::sync::Arc;

    fn populated_store() -> Store {
        let store = Store::new(RootState::default());
        store.dispatch(TasksAction::add(NewTask {
            title: "persist me".into(),
            description: "with details".into(),
            status: TaskStatus::InProgress,
            category: TaskCategory::Urgent,
            due_date: Some(1_700_000_000_000),
            attachments: Vec::new(),
        }));
        let id = store.tasks().tasks[0].id.clone();
        store.dispatch(TasksAction::ToggleSelection(id.clone()));
        store.dispatch(ActivityAction::add(&id, "Task Updated", "Task details were updated"));
        store.dispatch(AuthAction::SetUser(Some(AuthUser {
            uid: "u1".into(),
            email: Some("a@b.c".into()),
            display_name: None,
            photo_url: Some("https://img".into()),
        })));
        store
    }

    #[test]
    fn state_round_trips_through_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let state = populated_store().state();

        storage.save_state(&state).unwrap();
        assert!(dir.path().join("taskManagerState.json").is_file());
        assert_eq!(storage.load_state().unwrap(), state);
        assert_eq!(load_initial_state(&storage), state);
    }

    #[test]
    fn load_initial_state_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        assert_eq!(load_initial_state(&storage), RootState::default());

        fs::write(dir.path().join("taskManagerState.json"), b"{not json").unwrap();
        assert!(storage.load_state().is_err());
        assert_eq!(load_initial_state(&storage), RootState::default());
    }

    #[test]
    fn bridge_mirrors_every_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("nested"));
        let store = populated_store();
        store.subscribe(Arc::new(PersistenceBridge::new(storage.clone())));

        store.dispatch(TasksAction::ClearSelection);
        assert_eq!(storage.load_state().unwrap(), store.state());

        store.dispatch(AuthAction::Logout);
        let reloaded = storage.load_state().unwrap();
        assert!(!reloaded.auth.is_authenticated);
        assert_eq!(reloaded, store.state());
    }

    #[test]
    fn bridge_keeps_newest_snapshot_under_concurrent_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let store = Store::new(RootState::default());
        store.subscribe(Arc::new(PersistenceBridge::new(storage.clone())));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..20 {
                        store.dispatch(TasksAction::add(NewTask {
                            title: format!("w{worker}-{n}"),
                            description: String::new(),
                            status: TaskStatus::Todo,
                            category: TaskCategory::Work,
                            due_date: None,
                            attachments: Vec::new(),
                        }));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let state = store.state();
        assert_eq!(state.tasks.tasks.len(), 160);
        assert_eq!(storage.load_state().unwrap(), state);
    }

    #[test]
    fn bridge_ignores_older_versions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let bridge = PersistenceBridge::new(storage.clone());
        let newer = populated_store().state();

        bridge.on_change(&newer, 2);
        bridge.on_change(&RootState::default(), 1);
        assert_eq!(storage.load_state().unwrap(), newer);
    }

    #[test]
    fn bridge_swallows_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the slot file should be makes every write fail.
        fs::create_dir_all(dir.path().join("taskManagerState.json")).unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let store = Store::new(RootState::default());
        store.subscribe(Arc::new(PersistenceBridge::new(storage)));

        store.dispatch(TasksAction::SelectAll);
        assert!(store.tasks().selected_tasks.is_empty());
    }

    #[test]
    fn documents_and_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        assert!(storage.load_documents().unwrap_err().is_not_found());

        storage
            .save_documents(&DocumentsFile {
                schema_version: 1,
                tasks: Vec::new(),
            })
            .unwrap();
        assert_eq!(storage.load_documents().unwrap().schema_version, 1);

        let settings = SettingsFile::default();
        storage.save_settings(&settings).unwrap();
        assert_eq!(
            storage.load_settings().unwrap().settings.bind_addr,
            settings.settings.bind_addr
        );
    }
}
