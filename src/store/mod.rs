//! Client state core: pure reducers over [`RootState`] plus a shared [`Store`]
//! that applies them and notifies observers after every transition.

pub mod activity;
pub mod auth;
pub mod tasks;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Timestamp;

pub use activity::{ActivityAction, ActivityState};
pub use auth::{AuthAction, AuthState};
pub use tasks::{TasksAction, TasksState};

/// The whole client state tree, persisted as one blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RootState {
    #[serde(default)]
    pub tasks: TasksState,
    #[serde(default)]
    pub auth: AuthState,
    #[serde(default)]
    pub activity: ActivityState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tasks(TasksAction),
    Activity(ActivityAction),
    Auth(AuthAction),
}

impl From<TasksAction> for Action {
    fn from(value: TasksAction) -> Self {
        Action::Tasks(value)
    }
}

impl From<ActivityAction> for Action {
    fn from(value: ActivityAction) -> Self {
        Action::Activity(value)
    }
}

impl From<AuthAction> for Action {
    fn from(value: AuthAction) -> Self {
        Action::Auth(value)
    }
}

/// Applies one action. `now` is the only clock reading a transition sees.
pub fn reduce(state: &mut RootState, action: Action, now: Timestamp) {
    match action {
        Action::Tasks(action) => tasks::reduce(&mut state.tasks, action, now),
        Action::Activity(action) => activity::reduce(&mut state.activity, action, now),
        Action::Auth(action) => auth::reduce(&mut state.auth, action),
    }
}

/// Receives a snapshot after every dispatched action.
///
/// Concurrent dispatches may deliver snapshots out of order; `version`
/// increases with every transition, so the highest one seen is the newest state.
pub trait StoreObserver: Send + Sync {
    fn on_change(&self, state: &RootState, version: StateVersion);
}

pub type ObserverId = u64;
pub type StateVersion = u64;

#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<StoreData>>,
}

impl Store {
    pub fn new(state: RootState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreData {
                state,
                observers: Vec::new(),
                next_observer_id: 0,
                version: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RootState {
        self.lock().state.clone()
    }

    pub fn tasks(&self) -> TasksState {
        self.lock().state.tasks.clone()
    }

    pub fn select<T>(&self, selector: impl FnOnce(&RootState) -> T) -> T {
        selector(&self.lock().state)
    }

    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) -> ObserverId {
        let mut guard = self.lock();
        let id = guard.next_observer_id;
        guard.next_observer_id += 1;
        guard.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        let mut guard = self.lock();
        guard.observers.retain(|(observer_id, _)| *observer_id != id);
    }

    pub fn dispatch(&self, action: impl Into<Action>) {
        self.dispatch_at(action.into(), Utc::now().timestamp_millis());
    }

    pub fn dispatch_all(&self, actions: Vec<Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    pub fn dispatch_at(&self, action: Action, now: Timestamp) {
        let (snapshot, version, observers) = {
            let mut guard = self.lock();
            reduce(&mut guard.state, action, now);
            guard.version += 1;
            if guard.observers.is_empty() {
                return;
            }
            let observers: Vec<Arc<dyn StoreObserver>> = guard
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            (guard.state.clone(), guard.version, observers)
        };
        // Observers run unlocked so they may read or dispatch again.
        for observer in observers {
            observer.on_change(&snapshot, version);
        }
    }
}

struct StoreData {
    state: RootState,
    observers: Vec<(ObserverId, Arc<dyn StoreObserver>)>,
    next_observer_id: ObserverId,
    version: StateVersion,
}
