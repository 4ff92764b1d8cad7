//! crates/flower_timer_core/src/store.rs
//!
//! The persistence store. Owns the single durable document (stats, settings,
//! garden) and reads-modifies-writes it as a whole on every mutation.
//!
//! Nothing here fails outward: an unreadable or corrupt document is replaced by
//! defaults, and a failed write is reported as `false` from `save`.
//!
//! Every load-to-save sequence runs under `write_lock`, so concurrent callers
//! never overwrite each other's changes.

use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{
    CompletedSession, FlowerRecord, GardenOrder, PersistedDocument, Settings, SettingsUpdate,
    Species, Stats, SCHEMA_VERSION,
};
use crate::ports::{Clock, PortResult, StorageBackend};

/// The key the document has always been stored under.
pub const DEFAULT_STORAGE_KEY: &str = "flowerPomodoro";

pub struct PersistenceStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    key: String,
    write_lock: Mutex<()>,
}

impl PersistenceStore {
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            key: DEFAULT_STORAGE_KEY.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Returns the stored document, or fresh defaults if there is none or it
    /// cannot be read. A stale `lastSessionDate` zeroes the daily counters and
    /// the correction is written back before returning.
    pub async fn load(&self) -> PersistedDocument {
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> PersistedDocument {
        let today = self.clock.today();
        let mut doc = match self.read_document().await {
            Ok(Some(doc)) => doc,
            Ok(None) => return PersistedDocument::defaults(today),
            Err(e) => {
                warn!("Discarding unreadable document '{}': {}", self.key, e);
                return PersistedDocument::defaults(today);
            }
        };

        doc.settings = doc.settings.normalized();
        if doc.stats.roll_over(today) {
            info!("New day {}: daily counters reset", today);
            self.save_locked(&doc).await;
        }
        doc
    }

    async fn read_document(&self) -> PortResult<Option<PersistedDocument>> {
        match self.backend.read(&self.key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes and writes the whole document. Returns `false` if the
    /// backend refused the write.
    pub async fn save(&self, doc: &PersistedDocument) -> bool {
        let _guard = self.write_lock.lock().await;
        self.save_locked(doc).await
    }

    async fn save_locked(&self, doc: &PersistedDocument) -> bool {
        let mut doc = doc.clone();
        doc.version = SCHEMA_VERSION;
        let result = match serde_json::to_string(&doc) {
            Ok(raw) => self.backend.write(&self.key, &raw).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save document '{}': {}", self.key, e);
                false
            }
        }
    }

    pub async fn get_stats(&self) -> Stats {
        self.load().await.stats
    }

    /// Credits one finished work session and plants its flower.
    pub async fn record_completed_session(
        &self,
        minutes: u32,
        species: Species,
    ) -> CompletedSession {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_locked().await;
        doc.stats.record_session(minutes, self.clock.today());

        let flower = FlowerRecord {
            id: generate_flower_id(self.clock.now_millis()),
            species,
            completed_at: self.clock.now_utc(),
            duration_minutes: minutes,
        };
        doc.garden.push(flower.clone());
        self.save_locked(&doc).await;

        CompletedSession {
            stats: doc.stats,
            flower,
        }
    }

    pub async fn get_settings(&self) -> Settings {
        self.load().await.settings
    }

    pub async fn save_settings(&self, update: &SettingsUpdate) -> Settings {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_locked().await;
        doc.settings = doc.settings.apply(update);
        self.save_locked(&doc).await;
        doc.settings
    }

    /// Restores and persists the default document.
    pub async fn reset_all(&self) -> PersistedDocument {
        let doc = PersistedDocument::defaults(self.clock.today());
        self.save(&doc).await;
        doc
    }

    //=====================================================================================
    // Garden
    //=====================================================================================

    /// All flowers in planting order.
    pub async fn get_garden(&self) -> Vec<FlowerRecord> {
        self.load().await.garden
    }

    pub async fn garden_sorted(&self, order: GardenOrder) -> Vec<FlowerRecord> {
        let mut garden = self.get_garden().await;
        // Stable, so equal timestamps keep planting order.
        match order {
            GardenOrder::Oldest => garden.sort_by(|a, b| a.completed_at.cmp(&b.completed_at)),
            GardenOrder::Newest => garden.sort_by(|a, b| b.completed_at.cmp(&a.completed_at)),
        }
        garden
    }

    pub async fn find_flower(&self, id: &str) -> Option<FlowerRecord> {
        self.get_garden().await.into_iter().find(|f| f.id == id)
    }

    /// Removes the flower with `id`. Returns `false` (and writes nothing) if no
    /// such flower exists.
    pub async fn delete_flower(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_locked().await;
        let before = doc.garden.len();
        doc.garden.retain(|f| f.id != id);
        if doc.garden.len() == before {
            return false;
        }
        self.save_locked(&doc).await;
        true
    }

    /// Empties the garden, returning how many flowers were removed.
    pub async fn clear_garden(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load_locked().await;
        let removed = doc.garden.len();
        doc.garden.clear();
        self.save_locked(&doc).await;
        removed
    }
}

/// `<base36 millis><base36 random suffix>`: unique enough for one local list.
pub fn generate_flower_id(now_millis: i64) -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!(
        "{}{}",
        to_base36(now_millis.max(0) as u64),
        to_base36(suffix)
    )
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStorage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    /// Hands control back to the runtime around every access, the way a real
    /// filesystem write does.
    struct YieldingStorage(MemoryStorage);

    #[async_trait]
    impl StorageBackend for YieldingStorage {
        async fn read(&self, key: &str) -> PortResult<Option<String>> {
            let raw = self.0.read(key).await;
            tokio::task::yield_now().await;
            raw
        }

        async fn write(&self, key: &str, value: &str) -> PortResult<()> {
            tokio::task::yield_now().await;
            self.0.write(key, value).await
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn fixture() -> (Arc<MemoryStorage>, Arc<ManualClock>, PersistenceStore) {
        let backend = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(1_714_550_400_000, day(1)));
        let store = PersistenceStore::new(backend.clone(), clock.clone());
        (backend, clock, store)
    }

    #[tokio::test]
    async fn first_load_returns_defaults_without_writing() {
        let (backend, _clock, store) = fixture();
        let doc = store.load().await;
        assert_eq!(doc, PersistedDocument::defaults(day(1)));
        assert_eq!(doc.settings.work_duration_minutes, 25);
        assert_eq!(doc.settings.break_duration_minutes, 5);
        assert!(backend.get_raw(DEFAULT_STORAGE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_document_falls_back_to_defaults() {
        let (backend, _clock, store) = fixture();
        backend.put_raw(DEFAULT_STORAGE_KEY, "{not json").unwrap();
        assert_eq!(store.load().await, PersistedDocument::defaults(day(1)));
    }

    #[tokio::test]
    async fn recording_a_session_updates_stats_and_garden_once() {
        let (_backend, _clock, store) = fixture();
        let completed = store.record_completed_session(25, Species::Tulip).await;
        assert_eq!(completed.stats.total_sessions, 1);
        assert_eq!(completed.stats.total_minutes, 25);
        assert_eq!(completed.stats.today_sessions, 1);
        assert_eq!(completed.stats.today_minutes, 25);
        assert_eq!(completed.flower.species, Species::Tulip);
        assert_eq!(completed.flower.duration_minutes, 25);

        let garden = store.get_garden().await;
        assert_eq!(garden, vec![completed.flower]);
        assert_eq!(store.get_stats().await, completed.stats);
    }

    #[tokio::test]
    async fn yesterday_counters_roll_over_on_load() {
        let (backend, clock, store) = fixture();
        store.record_completed_session(25, Species::Rose).await;
        store.record_completed_session(25, Species::Daisy).await;

        clock.set_today(day(2));
        let doc = store.load().await;
        assert_eq!(doc.stats.today_sessions, 0);
        assert_eq!(doc.stats.today_minutes, 0);
        assert_eq!(doc.stats.total_sessions, 2);
        assert_eq!(doc.stats.total_minutes, 50);
        assert_eq!(doc.stats.last_session_date, day(2));

        // The correction was persisted, not just returned.
        let raw = backend.get_raw(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        let stored: PersistedDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.stats.last_session_date, day(2));
        assert_eq!(stored.stats.today_sessions, 0);
    }

    #[tokio::test]
    async fn save_reports_storage_failure() {
        let (backend, _clock, store) = fixture();
        backend.reject_writes(true);
        let doc = store.load().await;
        assert!(!store.save(&doc).await);

        // Recording still returns the computed stats even though nothing stuck.
        let completed = store.record_completed_session(25, Species::Lotus).await;
        assert_eq!(completed.stats.total_sessions, 1);
        backend.reject_writes(false);
        assert!(store.get_garden().await.is_empty());
    }

    #[tokio::test]
    async fn save_settings_coerces_each_field() {
        let (_backend, _clock, store) = fixture();
        let settings = store
            .save_settings(&SettingsUpdate {
                work_duration: Some(json!("abc")),
                break_duration: Some(json!(10)),
            })
            .await;
        assert_eq!(settings.work_duration_minutes, 25);
        assert_eq!(settings.break_duration_minutes, 10);
        assert_eq!(store.get_settings().await, settings);

        let settings = store
            .save_settings(&SettingsUpdate {
                work_duration: Some(json!("50")),
                break_duration: None,
            })
            .await;
        assert_eq!(settings.work_duration_minutes, 50);
        assert_eq!(settings.break_duration_minutes, 10);
    }

    #[tokio::test]
    async fn delete_flower_keeps_the_rest_in_order() {
        let (_backend, clock, store) = fixture();
        let mut ids = Vec::new();
        for species in [Species::Rose, Species::Poppy, Species::Cherry] {
            ids.push(store.record_completed_session(25, species).await.flower.id);
            clock.advance_secs(60);
        }

        assert!(!store.delete_flower("missing").await);
        assert_eq!(store.get_garden().await.len(), 3);

        assert!(store.delete_flower(&ids[1]).await);
        let remaining: Vec<String> = store.get_garden().await.into_iter().map(|f| f.id).collect();
        assert_eq!(remaining, vec![ids[0].clone(), ids[2].clone()]);
    }

    #[tokio::test]
    async fn garden_sorts_by_completion_time() {
        let (_backend, clock, store) = fixture();
        let first = store.record_completed_session(25, Species::Rose).await.flower;
        clock.advance_secs(3600);
        let second = store.record_completed_session(30, Species::Lavender).await.flower;

        let newest = store.garden_sorted(GardenOrder::Newest).await;
        assert_eq!(newest, vec![second.clone(), first.clone()]);
        let oldest = store.garden_sorted(GardenOrder::Oldest).await;
        assert_eq!(oldest, vec![first.clone(), second]);
        assert_eq!(store.find_flower(&first.id).await, Some(first));
    }

    #[tokio::test]
    async fn clear_garden_leaves_stats_alone() {
        let (_backend, _clock, store) = fixture();
        store.record_completed_session(25, Species::Rose).await;
        store.record_completed_session(25, Species::Rose).await;
        assert_eq!(store.clear_garden().await, 2);
        assert!(store.get_garden().await.is_empty());
        assert_eq!(store.get_stats().await.total_sessions, 2);

        let doc = store.reset_all().await;
        assert_eq!(doc, PersistedDocument::defaults(day(1)));
        assert_eq!(store.get_stats().await.total_sessions, 0);
    }

    #[tokio::test]
    async fn overlapping_writers_keep_each_others_changes() {
        let clock = Arc::new(ManualClock::new(1_714_550_400_000, day(1)));
        let store = PersistenceStore::new(Arc::new(YieldingStorage(MemoryStorage::new())), clock);

        let update = SettingsUpdate {
            work_duration: Some(json!(40)),
            break_duration: None,
        };
        let (completed, settings) = tokio::join!(
            store.record_completed_session(25, Species::Rose),
            store.save_settings(&update),
        );
        assert_eq!(settings.work_duration_minutes, 40);

        let doc = store.load().await;
        assert_eq!(doc.garden, vec![completed.flower]);
        assert_eq!(doc.stats.total_sessions, 1);
        assert_eq!(doc.settings.work_duration_minutes, 40);

        let (removed, _) = tokio::join!(
            store.clear_garden(),
            store.record_completed_session(30, Species::Lotus),
        );
        assert_eq!(removed, 1);
        assert_eq!(store.get_garden().await.len(), 1);
        assert_eq!(store.get_stats().await.total_sessions, 2);
    }

    #[tokio::test]
    async fn out_of_range_settings_do_not_discard_the_document() {
        let (backend, _clock, store) = fixture();
        let raw = json!({
            "stats": {
                "totalSessions": 3,
                "totalMinutes": 75,
                "todaySessions": 1,
                "todayMinutes": 25,
                "lastSessionDate": "2024-05-01"
            },
            "settings": { "workDuration": -5, "breakDuration": "10" },
            "garden": [{
                "id": "lw1abc",
                "type": "daisy",
                "completedAt": "2024-05-01T09:00:00Z",
                "duration": 25
            }]
        });
        backend
            .put_raw(DEFAULT_STORAGE_KEY, &raw.to_string())
            .unwrap();

        let doc = store.load().await;
        assert_eq!(doc.stats.total_sessions, 3);
        assert_eq!(doc.garden.len(), 1);
        assert_eq!(doc.garden[0].species, Species::Daisy);
        assert_eq!(doc.settings.work_duration_minutes, 25);
        assert_eq!(doc.settings.break_duration_minutes, 10);
    }

    #[test]
    fn flower_ids_differ() {
        let a = generate_flower_id(1_714_550_400_000);
        let b = generate_flower_id(1_714_550_400_000);
        assert_ne!(a, b);
        assert!(a.starts_with(&to_base36(1_714_550_400_000)));
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
