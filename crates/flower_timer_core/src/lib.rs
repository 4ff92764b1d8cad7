pub mod clock;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod render;
pub mod store;
pub mod timer;

pub use clock::{ManualClock, SystemClock};
pub use domain::{
    CompletedSession, FlowerRecord, GardenOrder, GrowthStage, PersistedDocument, Phase, Session,
    Settings, SettingsUpdate, Species, Stats,
};
pub use memory::MemoryStorage;
pub use ports::{Clock, GrowthRenderer, PortError, PortResult, StorageBackend};
pub use render::{render_card, render_svg};
pub use store::{PersistenceStore, DEFAULT_STORAGE_KEY};
pub use timer::{SkipOutcome, TickHandle, TickOutcome, Timer, TimerSnapshot};
