//! crates/flower_timer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the timer and the garden.
//! The persisted types keep the camelCase JSON shape the document has always had.

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Current layout of the persisted document.
pub const SCHEMA_VERSION: u32 = 1;

//=========================================================================================
// Timer Session
//=========================================================================================

/// The timer's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Break,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Paused => "paused",
            Phase::Break => "break",
        }
    }

    /// Whether a tick chain should be counting down in this phase.
    pub fn is_counting(&self) -> bool {
        matches!(self, Phase::Running | Phase::Break)
    }
}

/// One timed phase (work or break).
///
/// Remaining time is never accumulated tick by tick: while counting it is
/// always recomputed from `started_at_millis` and the current wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    pub total_duration_secs: u64,
    /// Last computed remaining time. Authoritative only while idle or paused.
    pub remaining_secs: u64,
    pub started_at_millis: Option<i64>,
    pub paused_elapsed_millis: i64,
}

impl Session {
    pub fn idle(work_minutes: u32) -> Self {
        let total = minutes_to_secs(work_minutes);
        Self {
            phase: Phase::Idle,
            total_duration_secs: total,
            remaining_secs: total,
            started_at_millis: None,
            paused_elapsed_millis: 0,
        }
    }

    pub fn counting(phase: Phase, minutes: u32, now_millis: i64) -> Self {
        let total = minutes_to_secs(minutes);
        Self {
            phase,
            total_duration_secs: total,
            remaining_secs: total,
            started_at_millis: Some(now_millis),
            paused_elapsed_millis: 0,
        }
    }

    pub fn elapsed_millis(&self, now_millis: i64) -> i64 {
        match self.started_at_millis {
            Some(start) => (now_millis - start).max(0),
            None => 0,
        }
    }

    /// `total - floor(elapsed / 1000)`, clamped at zero, while counting.
    pub fn remaining_at(&self, now_millis: i64) -> u64 {
        if !self.phase.is_counting() || self.started_at_millis.is_none() {
            return self.remaining_secs;
        }
        let elapsed_secs = (self.elapsed_millis(now_millis) / 1000) as u64;
        self.total_duration_secs.saturating_sub(elapsed_secs)
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_duration_secs == 0 {
            return 0.0;
        }
        let done = self.total_duration_secs - self.remaining_secs.min(self.total_duration_secs);
        done as f64 / self.total_duration_secs as f64 * 100.0
    }
}

pub fn minutes_to_secs(minutes: u32) -> u64 {
    u64::from(minutes) * 60
}

/// Formats a second count as `m:ss`.
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

//=========================================================================================
// Flower Species and Growth Stages
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Rose,
    Sunflower,
    Tulip,
    Daisy,
    Lavender,
    Lotus,
    Cherry,
    Poppy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown flower species: {0}")]
pub struct UnknownSpecies(pub String);

impl Species {
    pub const ALL: [Species; 8] = [
        Species::Rose,
        Species::Sunflower,
        Species::Tulip,
        Species::Daisy,
        Species::Lavender,
        Species::Lotus,
        Species::Cherry,
        Species::Poppy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Rose => "rose",
            Species::Sunflower => "sunflower",
            Species::Tulip => "tulip",
            Species::Daisy => "daisy",
            Species::Lavender => "lavender",
            Species::Lotus => "lotus",
            Species::Cherry => "cherry",
            Species::Poppy => "poppy",
        }
    }

    /// Picks the species for a new work session.
    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Species::Rose)
    }

    /// Parses an identifier, substituting `Rose` for anything unknown.
    pub fn parse_or_default(id: &str) -> Self {
        id.parse().unwrap_or_else(|e: UnknownSpecies| {
            warn!("{}; rendering a rose instead", e);
            Species::Rose
        })
    }
}

impl FromStr for Species {
    type Err = UnknownSpecies;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|species| species.as_str() == id)
            .ok_or_else(|| UnknownSpecies(s.to_string()))
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_species<'de, D>(deserializer: D) -> Result<Species, D::Error>
where
    D: Deserializer<'de>,
{
    let id = String::deserialize(deserializer)?;
    Ok(Species::parse_or_default(&id))
}

/// One of the seven visual buckets a growing flower passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    Sprout,
    SmallStem,
    Growing,
    Budding,
    Opening,
    Blooming,
}

impl GrowthStage {
    const THRESHOLDS: [(f64, GrowthStage); 7] = [
        (0.0, GrowthStage::Seed),
        (15.0, GrowthStage::Sprout),
        (30.0, GrowthStage::SmallStem),
        (50.0, GrowthStage::Growing),
        (65.0, GrowthStage::Budding),
        (80.0, GrowthStage::Opening),
        (100.0, GrowthStage::Blooming),
    ];

    /// Maps a progress percentage (clamped to 0..=100) to its stage.
    pub fn from_progress(progress_percent: f64) -> Self {
        let progress = if progress_percent.is_nan() {
            0.0
        } else {
            progress_percent.clamp(0.0, 100.0)
        };
        Self::THRESHOLDS
            .iter()
            .rev()
            .find(|(threshold, _)| progress >= *threshold)
            .map(|(_, stage)| *stage)
            .unwrap_or(GrowthStage::Seed)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            GrowthStage::Seed => "Seed",
            GrowthStage::Sprout => "Sprout",
            GrowthStage::SmallStem => "Small Stem",
            GrowthStage::Growing => "Growing",
            GrowthStage::Budding => "Budding",
            GrowthStage::Opening => "Opening",
            GrowthStage::Blooming => "Blooming",
        }
    }
}

//=========================================================================================
// Persisted Document
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
    pub last_session_date: NaiveDate,
}

impl Stats {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            total_sessions: 0,
            total_minutes: 0,
            today_sessions: 0,
            today_minutes: 0,
            last_session_date: today,
        }
    }

    /// Zeroes the daily counters when `today` is a different calendar day.
    /// Returns whether anything changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_session_date == today {
            return false;
        }
        self.today_sessions = 0;
        self.today_minutes = 0;
        self.last_session_date = today;
        true
    }

    pub fn record_session(&mut self, minutes: u32, today: NaiveDate) {
        self.roll_over(today);
        self.total_sessions += 1;
        self.total_minutes += u64::from(minutes);
        self.today_sessions += 1;
        self.today_minutes += u64::from(minutes);
    }
}

/// Stored durations. Whatever an older document holds is coerced on read, so
/// a bad value never costs the rest of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "workDuration", deserialize_with = "lenient_work_minutes")]
    pub work_duration_minutes: u32,
    #[serde(rename = "breakDuration", deserialize_with = "lenient_break_minutes")]
    pub break_duration_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration_minutes: DEFAULT_WORK_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

impl Settings {
    /// Replaces any zero duration with its default.
    pub fn normalized(self) -> Self {
        Self {
            work_duration_minutes: positive_or(self.work_duration_minutes, DEFAULT_WORK_MINUTES),
            break_duration_minutes: positive_or(
                self.break_duration_minutes,
                DEFAULT_BREAK_MINUTES,
            ),
        }
    }

    /// Applies user input on top of these settings. Both fields are recomputed
    /// together; a missing or unusable value keeps the current one.
    pub fn apply(&self, update: &SettingsUpdate) -> Self {
        Self {
            work_duration_minutes: coerce_minutes(
                update.work_duration.as_ref(),
                self.work_duration_minutes,
            ),
            break_duration_minutes: coerce_minutes(
                update.break_duration.as_ref(),
                self.break_duration_minutes,
            ),
        }
        .normalized()
    }
}

fn lenient_work_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_minutes(Some(&raw), DEFAULT_WORK_MINUTES))
}

fn lenient_break_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_minutes(Some(&raw), DEFAULT_BREAK_MINUTES))
}

fn positive_or(value: u32, fallback: u32) -> u32 {
    if value > 0 {
        value
    } else {
        fallback
    }
}

/// Raw, unvalidated settings input. Values may be numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub work_duration: Option<serde_json::Value>,
    #[serde(default)]
    pub break_duration: Option<serde_json::Value>,
}

/// Reads a positive whole number of minutes the way a form field is read:
/// numbers are truncated, strings contribute their leading digits.
pub fn coerce_minutes(value: Option<&serde_json::Value>, fallback: u32) -> u32 {
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => leading_integer(s),
        _ => None,
    };
    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(minutes) if minutes > 0 => minutes,
        _ => {
            if value.is_some() {
                warn!("Ignoring invalid duration {:?}; keeping {}", value, fallback);
            }
            fallback
        }
    }
}

fn leading_integer(s: &str) -> Option<u64> {
    let trimmed = s.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// A completed work session, archived in the garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowerRecord {
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient_species")]
    pub species: Species,
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
}

/// Ordering for the garden gallery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GardenOrder {
    #[default]
    Newest,
    Oldest,
}

/// The single durable document: stats, settings and the garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(default = "legacy_version")]
    pub version: u32,
    pub stats: Stats,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub garden: Vec<FlowerRecord>,
}

fn legacy_version() -> u32 {
    SCHEMA_VERSION
}

impl PersistedDocument {
    pub fn defaults(today: NaiveDate) -> Self {
        Self {
            version: SCHEMA_VERSION,
            stats: Stats::new(today),
            settings: Settings::default(),
            garden: Vec::new(),
        }
    }
}

/// What recording a finished work session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub stats: Stats,
    pub flower: FlowerRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn growth_stage_thresholds() {
        assert_eq!(GrowthStage::from_progress(0.0), GrowthStage::Seed);
        assert_eq!(GrowthStage::from_progress(14.9), GrowthStage::Seed);
        assert_eq!(GrowthStage::from_progress(15.0), GrowthStage::Sprout);
        assert_eq!(GrowthStage::from_progress(49.0), GrowthStage::SmallStem);
        assert_eq!(GrowthStage::from_progress(50.0), GrowthStage::Growing);
        assert_eq!(GrowthStage::from_progress(79.9), GrowthStage::Budding);
        assert_eq!(GrowthStage::from_progress(99.9), GrowthStage::Opening);
        assert_eq!(GrowthStage::from_progress(100.0), GrowthStage::Blooming);
        assert_eq!(GrowthStage::from_progress(250.0), GrowthStage::Blooming);
        assert_eq!(GrowthStage::from_progress(-3.0), GrowthStage::Seed);
        assert_eq!(GrowthStage::from_progress(f64::NAN), GrowthStage::Seed);
    }

    #[test]
    fn species_parsing_falls_back_to_rose() {
        assert_eq!("Lotus".parse::<Species>(), Ok(Species::Lotus));
        assert!("orchid".parse::<Species>().is_err());
        assert_eq!(Species::parse_or_default("orchid"), Species::Rose);
        assert!(Species::ALL.contains(&Species::random()));
    }

    #[test]
    fn remaining_is_derived_from_the_start_epoch() {
        let session = Session::counting(Phase::Running, 25, 1_000);
        assert_eq!(session.remaining_at(1_000), 1500);
        assert_eq!(session.remaining_at(1_000 + 999), 1500);
        assert_eq!(session.remaining_at(1_000 + 61_500), 1439);
        assert_eq!(session.remaining_at(1_000 + 5_000_000), 0);
        // Clock going backwards never adds time.
        assert_eq!(session.remaining_at(0), 1500);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(0), "0:00");
    }

    #[test]
    fn settings_coercion_keeps_prior_values() {
        let prior = Settings {
            work_duration_minutes: 40,
            break_duration_minutes: 7,
        };
        let update = SettingsUpdate {
            work_duration: Some(json!("abc")),
            break_duration: Some(json!(10)),
        };
        let applied = prior.apply(&update);
        assert_eq!(applied.work_duration_minutes, 40);
        assert_eq!(applied.break_duration_minutes, 10);

        let update = SettingsUpdate {
            work_duration: Some(json!(" 30min")),
            break_duration: Some(json!(-4)),
        };
        let applied = prior.apply(&update);
        assert_eq!(applied.work_duration_minutes, 30);
        assert_eq!(applied.break_duration_minutes, 7);

        let update = SettingsUpdate {
            work_duration: Some(json!(0)),
            break_duration: Some(json!(12.7)),
        };
        let applied = prior.apply(&update);
        assert_eq!(applied.work_duration_minutes, 40);
        assert_eq!(applied.break_duration_minutes, 12);
    }

    #[test]
    fn stats_roll_over_only_on_a_new_day() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut stats = Stats::new(monday);
        stats.record_session(25, monday);
        assert!(!stats.roll_over(monday));
        assert_eq!(stats.today_sessions, 1);
        assert!(stats.roll_over(tuesday));
        assert_eq!(stats.today_sessions, 0);
        assert_eq!(stats.today_minutes, 0);
        assert_eq!(stats.total_minutes, 25);
        assert_eq!(stats.last_session_date, tuesday);
    }

    #[test]
    fn legacy_documents_load_with_unknown_species() {
        let raw = json!({
            "stats": {
                "totalSessions": 2,
                "totalMinutes": 50,
                "todaySessions": 1,
                "todayMinutes": 25,
                "lastSessionDate": "2024-03-04"
            },
            "settings": { "workDuration": 25, "breakDuration": 5 },
            "garden": [
                { "id": "a1", "type": "orchid", "completedAt": "2024-03-04T10:00:00.000Z", "duration": 25 }
            ]
        });
        let doc: PersistedDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert_eq!(doc.garden[0].species, Species::Rose);
        assert_eq!(doc.stats.total_minutes, 50);
    }

    #[test]
    fn stored_settings_are_coerced_on_read() {
        let settings: Settings =
            serde_json::from_value(json!({ "workDuration": -5, "breakDuration": "12" })).unwrap();
        assert_eq!(settings.work_duration_minutes, DEFAULT_WORK_MINUTES);
        assert_eq!(settings.break_duration_minutes, 12);

        let settings: Settings =
            serde_json::from_value(json!({ "workDuration": 0, "breakDuration": null })).unwrap();
        assert_eq!(settings, Settings::default());

        let settings: Settings = serde_json::from_value(json!({ "workDuration": 45 })).unwrap();
        assert_eq!(settings.work_duration_minutes, 45);
        assert_eq!(settings.break_duration_minutes, DEFAULT_BREAK_MINUTES);
    }
}
