//! Background service thread: long-running, non-time-sensitive work (spec
//! §5 "a *service thread* performs long-running, non-time-sensitive tasks
//! (peer registration, statistics upload)"). Runs its own current-thread
//! tokio runtime, mirroring the teacher's async style, but never touches the
//! primary loop's state except through the channels handed to it.

use std::sync::Arc;
use std::time::Duration;

use amp_core::StatusPublisher;

use crate::device_discovery::{HidMapResolver, NullDeviceResolver, SoundMapResolver};

/// Registry lookups are stubbed (spec §9 `LocalRegistryStd::lookup` is
/// always false in the source); left as a pluggable dependency with no core
/// behavior guaranteed.
pub trait CallRegistry: Send + Sync {
    fn lookup(&self, node: &str) -> Option<String>;
}

pub struct NullRegistry;

impl CallRegistry for NullRegistry {
    fn lookup(&self, _node: &str) -> Option<String> {
        None
    }
}

/// Spawns the service thread. Returns a join handle the caller may await at
/// shutdown.
pub fn spawn(status: Arc<StatusPublisher>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("amp-service".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .expect("failed to build service-thread runtime");
            runtime.block_on(run(status));
        })
        .expect("failed to spawn service thread")
}

async fn run(status: Arc<StatusPublisher>) {
    let registry = NullRegistry;
    let resolver = NullDeviceResolver;
    let mut ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        ticker.tick().await;
        log::debug!(
            "service tick: router_dropped={}",
            status.latest().router_dropped_count
        );
        // Placeholder for peer registration / statistics upload; neither is
        // specified beyond "external collaborator" (spec §1).
        let _ = registry.lookup("");
        let _ = SoundMapResolver::resolve(&resolver, "probe");
        let _ = HidMapResolver::resolve(&resolver, "probe");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_registry_never_resolves() {
        let registry = NullRegistry;
        assert_eq!(registry.lookup("1999"), None);
    }
}
