pub mod broadcast_renderer;
pub mod file_storage;

pub use broadcast_renderer::BroadcastRenderer;
pub use file_storage::FileStorageAdapter;
