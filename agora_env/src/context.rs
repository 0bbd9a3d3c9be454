//! Run context trait for Agora simulations.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The central interface for time and task management.
///
/// The turn controller reads time, sleeps and spawns its worker through this
/// trait, so the same worker code runs against the production runtime or a
/// test harness with a paused clock. Clock-free Tokio primitives (channels,
/// `Notify`, `select!`, task joins) are still used directly.
#[async_trait]
pub trait RunContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// Used for run log timestamps and turn durations.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time used to stamp and cut off posts.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Clocks set before the epoch report 0.
    fn epoch_ms(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
