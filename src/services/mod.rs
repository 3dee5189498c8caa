pub mod cleanup;
pub mod generation;
pub mod stream_manager;
pub mod sync;
pub mod usage_tracker;

pub use cleanup::CleanupScheduler;
pub use stream_manager::{StartStream, StreamError, StreamManager};
pub use usage_tracker::{
    MemoryUsageRepository, PgUsageRepository, UsageError, UsageRepository, UsageTracker,
};
