use orbit_core::{ClockPort, PortError};
use web_time::{SystemTime, UNIX_EPOCH};

/// Wall clock in Unix milliseconds. `web_time` resolves to `std::time` off
/// wasm and to `Date.now()` in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, PortError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("clock before unix epoch: {e}")))?;
        u64::try_from(since_epoch.as_millis())
            .map_err(|_| PortError::Transport("clock out of range".to_owned()))
    }
}
