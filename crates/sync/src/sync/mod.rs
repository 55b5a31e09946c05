mod engine;
mod events;

pub use engine::{SyncEngine, SyncStats};
pub use events::SyncEvent;
