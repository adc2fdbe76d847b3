pub mod activity;
pub mod address;
pub mod bus;
pub mod clock;
pub mod config;
pub mod relock_timer;
pub mod side_panel;
pub mod storage;

pub use activity::{ActivityTracker, Debouncer};
pub use address::SolanaAddressValidator;
pub use bus::{MessageBus, PageWindow, RuntimeSender, TabRouter};
pub use clock::SystemClockAdapter;
pub use config::OrbitConfig;
pub use relock_timer::spawn_relock_timer;
pub use side_panel::{RecordingSidePanel, SidePanelCall};
pub use storage::{FileStorageAdapter, MemoryStorageAdapter};
