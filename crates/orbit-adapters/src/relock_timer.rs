use std::sync::Arc;
use std::time::Duration;

use orbit_core::{BackgroundCoordinator, ClockPort, KeyValuePort, SidePanelPort, TabsPort};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs `relock_tick` every `period`, first after one full period. Abort the
/// handle to stop.
pub fn spawn_relock_timer<S, P, T, C>(
    coordinator: Arc<BackgroundCoordinator<S, P, T, C>>,
    period: Duration,
) -> JoinHandle<()>
where
    S: KeyValuePort + Send + Sync + 'static,
    P: SidePanelPort + Send + Sync + 'static,
    T: TabsPort + Send + Sync + 'static,
    C: ClockPort + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_ms = period.as_millis() as u64, "re-lock timer started");
        loop {
            ticks.tick().await;
            if let Some(transition) = coordinator.relock_tick() {
                tracing::debug!(?transition, "re-lock timer fired");
            }
        }
    })
}
