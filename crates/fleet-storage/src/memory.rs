//! In-memory store backend.
//!
//! Implements every store seam over concurrent maps. Job transitions are
//! applied under the map's per-entry guard, which gives the same
//! compare-and-swap guarantee a relational backend provides with a
//! conditional `UPDATE ... WHERE status = ?`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use fleet_core::{Error, Result};

use crate::command_log::{CommandLog, DeviceResult, GroupCommandStatus};
use crate::device::Device;
use crate::job::{Job, JobStatus, NewJob};
use crate::state::{merge_patch, DeviceStateSnapshot, StateMeta};
use crate::traits::{
    CommandLogStore, DeviceDirectory, DeviceEventRecord, DeviceEventSink, DeviceStateStore,
    JobStore,
};

#[derive(Clone)]
struct StoredJob {
    seq: u64,
    job: Job,
}

/// In-memory implementation of all store seams.
#[derive(Default)]
pub struct MemoryStore {
    devices: DashMap<String, Device>,
    groups: DashMap<String, Vec<String>>,
    jobs: DashMap<String, StoredJob>,
    job_seq: AtomicU64,
    command_logs: DashMap<String, CommandLog>,
    states: DashMap<String, DeviceStateSnapshot>,
    events: Mutex<Vec<DeviceEventRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a device.
    pub fn put_device(&self, device: Device) {
        self.devices.insert(device.id.clone(), device);
    }

    /// Remove a device. Jobs referencing it are left in place.
    pub fn remove_device(&self, id: &str) {
        self.devices.remove(id);
    }

    /// Define a group as an ordered list of member device ids.
    pub fn put_group(&self, group_id: impl Into<String>, member_ids: Vec<String>) {
        self.groups.insert(group_id.into(), member_ids);
    }

    /// All recorded audit entries, oldest first.
    pub fn recorded_events(&self) -> Vec<DeviceEventRecord> {
        self.events.lock().clone()
    }

    /// Audit entries for one device, oldest first.
    pub fn events_for(&self, device_id: &str) -> Vec<DeviceEventRecord> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.device_id == device_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeviceDirectory for MemoryStore {
    async fn device(&self, id: &str) -> Result<Option<Device>> {
        Ok(self.devices.get(id).map(|entry| entry.clone()))
    }

    async fn managed_devices(&self) -> Result<Vec<Device>> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|entry| entry.managed)
            .map(|entry| entry.clone())
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<Device>> {
        let member_ids = match self.groups.get(group_id) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        let mut members = Vec::with_capacity(member_ids.len());
        for id in member_ids {
            if let Some(device) = self.devices.get(&id) {
                members.push(device.clone());
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, new: NewJob) -> Result<Job> {
        let job = new.into_job();
        let seq = self.job_seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(
            job.id.clone(),
            StoredJob {
                seq,
                job: job.clone(),
            },
        );
        Ok(job)
    }

    async fn job(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.jobs.get(id).map(|entry| entry.job.clone()))
    }

    async fn pending(&self, limit: usize) -> Result<Vec<Job>> {
        let mut pending: Vec<StoredJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.job.status == JobStatus::Pending)
            .map(|entry| entry.clone())
            .collect();
        pending.sort_by_key(|stored| stored.seq);
        pending.truncate(limit);
        Ok(pending.into_iter().map(|stored| stored.job).collect())
    }

    async fn transition(
        &self,
        id: &str,
        expected: JobStatus,
        next: JobStatus,
        error: Option<String>,
    ) -> Result<Option<Job>> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("job {id} not found")))?;
        if entry.job.status != expected {
            return Ok(None);
        }
        entry.job.status = next;
        entry.job.error = error;
        entry.job.updated_at = Utc::now();
        Ok(Some(entry.job.clone()))
    }
}

#[async_trait]
impl CommandLogStore for MemoryStore {
    async fn create(&self, log: CommandLog) -> Result<CommandLog> {
        self.command_logs.insert(log.id.clone(), log.clone());
        Ok(log)
    }

    async fn command_log(&self, id: &str) -> Result<Option<CommandLog>> {
        Ok(self.command_logs.get(id).map(|entry| entry.clone()))
    }

    async fn set_status(
        &self,
        id: &str,
        status: GroupCommandStatus,
        results: Option<Vec<DeviceResult>>,
        error: Option<String>,
    ) -> Result<CommandLog> {
        let mut entry = self
            .command_logs
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("command log {id} not found")))?;
        entry.status = status;
        if let Some(results) = results {
            entry.results = results;
        }
        if error.is_some() {
            entry.error = error;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[async_trait]
impl DeviceStateStore for MemoryStore {
    async fn snapshot(&self, device_id: &str) -> Result<Option<DeviceStateSnapshot>> {
        Ok(self.states.get(device_id).map(|entry| entry.clone()))
    }

    async fn upsert(
        &self,
        device_id: &str,
        patch: Value,
        meta: StateMeta,
    ) -> Result<DeviceStateSnapshot> {
        let mut entry = self
            .states
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceStateSnapshot::unknown(device_id));
        entry.state = merge_patch(&entry.state, &patch);
        if let Some(status) = meta.status {
            if status == "online" {
                entry.offline_reason = None;
            }
            entry.status = status;
        }
        if let Some(last_seen) = meta.last_seen {
            entry.last_seen = Some(last_seen);
        }
        if let Some(reason) = meta.offline_reason {
            entry.offline_reason = Some(reason);
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[async_trait]
impl DeviceEventSink for MemoryStore {
    async fn record(&self, event: DeviceEventRecord) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use serde_json::json;
    use std::sync::Arc;

    fn new_job(device_id: &str) -> NewJob {
        NewJob {
            device_id: device_id.to_string(),
            command: "play".to_string(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn test_pending_is_oldest_first_and_bounded() {
        let store = MemoryStore::new();
        let first = JobStore::create(&store, new_job("dev-1")).await.unwrap();
        let second = JobStore::create(&store, new_job("dev-2")).await.unwrap();
        let _third = JobStore::create(&store, new_job("dev-3")).await.unwrap();

        let batch = store.pending(2).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
        assert_eq!(batch[1].id, second.id);
    }

    #[tokio::test]
    async fn test_transition_applies_only_on_expected_status() {
        let store = MemoryStore::new();
        let job = JobStore::create(&store, new_job("dev-1")).await.unwrap();

        let claimed = store
            .transition(&job.id, JobStatus::Pending, JobStatus::Running, None)
            .await
            .unwrap();
        assert_eq!(claimed.unwrap().status, JobStatus::Running);

        // Second claim observes the CAS miss.
        let missed = store
            .transition(&job.id, JobStatus::Pending, JobStatus::Running, None)
            .await
            .unwrap();
        assert!(missed.is_none());
    }

    #[tokio::test]
    async fn test_transition_unknown_job_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .transition("missing", JobStatus::Pending, JobStatus::Running, None)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_claims_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let job = JobStore::create(&*store, new_job("dev-1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = job.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transition(&id, JobStatus::Pending, JobStatus::Running, None)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_state_upsert_merges() {
        let store = MemoryStore::new();
        store
            .upsert(
                "dev-1",
                json!({"snapshot": {"volume": 10}, "probe": {"path": "/healthz"}}),
                StateMeta::online(Utc::now()),
            )
            .await
            .unwrap();

        let snapshot = store
            .upsert(
                "dev-1",
                json!({"snapshot": {"playing": true}}),
                StateMeta::offline("timeout"),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.status, "offline");
        assert_eq!(snapshot.offline_reason.as_deref(), Some("timeout"));
        // Earlier fields survive the merge.
        assert_eq!(snapshot.state["snapshot"]["volume"], 10);
        assert_eq!(snapshot.state["snapshot"]["playing"], true);
        assert_eq!(snapshot.state["probe"]["path"], "/healthz");
        // last_seen from the online cycle is preserved.
        assert!(snapshot.last_seen.is_some());
    }

    #[tokio::test]
    async fn test_online_clears_offline_reason() {
        let store = MemoryStore::new();
        store
            .upsert("dev-1", json!({}), StateMeta::offline("connect"))
            .await
            .unwrap();
        let snapshot = store
            .upsert("dev-1", json!({}), StateMeta::online(Utc::now()))
            .await
            .unwrap();
        assert_eq!(snapshot.status, "online");
        assert!(snapshot.offline_reason.is_none());
    }

    #[tokio::test]
    async fn test_group_members_follow_membership_order() {
        let store = MemoryStore::new();
        store.put_device(Device::new("b", DeviceKind::Audio, "http://b"));
        store.put_device(Device::new("a", DeviceKind::Audio, "http://a"));
        store.put_group("g1", vec!["b".to_string(), "a".to_string()]);

        let members = store.group_members("g1").await.unwrap();
        let ids: Vec<&str> = members.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_unknown_group_is_empty() {
        let store = MemoryStore::new();
        assert!(store.group_members("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_managed_devices_filters_unmanaged() {
        let store = MemoryStore::new();
        let mut unmanaged = Device::new("u", DeviceKind::Video, "http://u");
        unmanaged.managed = false;
        store.put_device(unmanaged);
        store.put_device(Device::new("m", DeviceKind::Video, "http://m"));

        let managed = store.managed_devices().await.unwrap();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].id, "m");
    }
}
