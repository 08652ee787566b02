use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{Status, Task};
use crate::time::now_secs as now;

use super::{StoreError, TaskStore};

/// The volatile state store variant: a bounded, TTL-evicting concurrent
/// map. Suitable for single-replica deployments (§4.1). A `DashMap` gives
/// the "one writer, many readers" concurrency the spec requires without a
/// single global mutex serializing every query.
pub struct MemoryStore {
    tasks: DashMap<String, Task>,
    /// Insertion order, oldest first, for the capacity eviction rule.
    order: Mutex<VecDeque<String>>,
    cap: usize,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new(cap: usize, ttl: Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            cap,
            ttl,
        }
    }

    pub fn with_history_ttl(history_ttl_secs: u64) -> Self {
        Self::new(100, Duration::from_secs(history_ttl_secs))
    }

    /// Drops entries past their TTL. Observed lazily on every read, as
    /// permitted by §4.1 — no dedicated sweeper task is required.
    fn evict_expired(&self) {
        let now = now();
        let ttl = self.ttl.as_secs_f64();
        self.tasks.retain(|_, task| now - task.created <= ttl);
    }

    fn evict_over_capacity(&self) {
        let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
        while self.tasks.len() > self.cap {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.tasks.remove(&oldest);
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn set_current_task(&self, mut task: Task, status: Status) -> Result<(), StoreError> {
        if self.tasks.contains_key(&task.id) {
            return Err(StoreError::Conflict(task.id));
        }

        task.created = now();
        task.updated = task.created;
        task.status = status;

        self.order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(task.id.clone());
        self.tasks.insert(task.id.clone(), task);

        self.evict_over_capacity();
        Ok(())
    }

    async fn get_task_status(&self, id: &str) -> Result<Status, StoreError> {
        self.evict_expired();
        Ok(self
            .tasks
            .get(id)
            .map_or(Status::TaskNotFound, |task| task.status))
    }

    async fn update_task(&self, id: &str, status: Status) -> Result<(), StoreError> {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.status = status;
            task.updated = now();
        }
        Ok(())
    }

    async fn get_state(
        &self,
        from_ts: f64,
        to_ts: Option<f64>,
        app: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        self.evict_expired();
        let to_ts = to_ts.unwrap_or_else(now);
        Ok(self
            .tasks
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|task| task.created >= from_ts && task.created <= to_ts)
            .filter(|task| app.map_or(true, |app| task.app == app))
            .collect())
    }

    async fn get_app_list(&self) -> Result<HashSet<String>, StoreError> {
        self.evict_expired();
        Ok(self.tasks.iter().map(|entry| entry.value().app.clone()).collect())
    }

    async fn health(&self) -> bool {
        true
    }
}
