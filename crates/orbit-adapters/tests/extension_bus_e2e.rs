mod common;

use std::sync::Arc;

use orbit_adapters::{
    ActivityTracker, MemoryStorageAdapter, MessageBus, OrbitConfig, PageWindow,
    RecordingSidePanel, RuntimeSender, SidePanelCall, SolanaAddressValidator, TabRouter,
};
use orbit_core::domain::CredentialRegistration;
use orbit_core::{
    AccountStore, Address, BackgroundCoordinator, ConnectOptions, ConnectScreen, ConnectionStore,
    ContentRelay, LockGuard, LockState, OrbitWallet, RouteAccess, SavedAccount, TimestampMs,
    WalletError,
};

use common::{
    enable_lock, FixedAuthenticator, TestClock, PAGE_ORIGIN, PAGE_URL, PANEL_URL,
    SYSTEM_PROGRAM, T0, TOKEN_PROGRAM,
};

const TAB: u64 = 17;

type Storage = MemoryStorageAdapter;

struct Extension {
    bus: MessageBus,
    panel: RecordingSidePanel,
    wallet: Arc<OrbitWallet<PageWindow>>,
    relay: ContentRelay<Storage, SolanaAddressValidator, PageWindow, RuntimeSender>,
    coordinator: BackgroundCoordinator<Storage, RecordingSidePanel, TabRouter, TestClock>,
    screen: ConnectScreen<Storage, SolanaAddressValidator, RuntimeSender, RecordingSidePanel>,
    guard: LockGuard<Storage, FixedAuthenticator, TestClock>,
}

impl Extension {
    fn boot(storage: Storage) -> Self {
        Self::boot_with(storage, &OrbitConfig::default())
    }

    fn boot_with(storage: Storage, config: &OrbitConfig) -> Self {
        let bus = MessageBus::new();
        let panel = RecordingSidePanel::default();
        let window = bus.page_window(TAB, PAGE_ORIGIN);
        Self {
            wallet: OrbitWallet::new(window.clone(), config.resolver()),
            relay: ContentRelay::new(
                storage.clone(),
                SolanaAddressValidator,
                window,
                bus.content_runtime(TAB, PAGE_URL),
            ),
            coordinator: BackgroundCoordinator::new(
                storage.clone(),
                panel.clone(),
                bus.tabs(),
                TestClock::at(T0),
            )
            .with_side_panel_path(config.side_panel_path.clone())
            .with_inactivity_timeout_ms(config.inactivity_timeout_ms),
            guard: config.lock_guard(storage.clone(), FixedAuthenticator(true), TestClock::at(T0)),
            screen: ConnectScreen::new(
                storage,
                SolanaAddressValidator,
                bus.extension_runtime(PANEL_URL),
                panel.clone(),
            )
            .with_home_path(config.side_panel_path.clone()),
            bus,
            panel,
        }
    }

    /// Delivers queued messages until the bus is quiet. Every context sees
    /// the window messages, as on a real page.
    fn pump(&self) {
        while !self.bus.is_idle() {
            for message in self.bus.take_window_messages(TAB).expect("window queue") {
                self.relay.handle_window_message(&message).expect("relay");
                self.wallet.handle_window_message(&message);
            }
            for (data, sender) in self.bus.take_background_messages().expect("background queue") {
                self.coordinator.handle_message(&data, &sender);
            }
            for data in self.bus.take_tab_messages(TAB).expect("tab queue") {
                self.relay.handle_runtime_message(&data).expect("relay");
            }
        }
    }

    fn connect_path(&self) -> String {
        self.panel
            .calls()
            .into_iter()
            .find_map(|call| match call {
                SidePanelCall::SetOptions { path, .. } if path.contains("connect=1") => Some(path),
                _ => None,
            })
            .expect("connect screen configured")
    }
}

fn seeded_storage() -> MemoryStorageAdapter {
    let storage = MemoryStorageAdapter::default();
    let accounts = AccountStore::new(storage.clone(), SolanaAddressValidator);
    accounts
        .save_new(SavedAccount::new(SYSTEM_PROGRAM, "Treasury").with_tags(["cold"]))
        .expect("save");
    accounts
        .save_new(SavedAccount::new(TOKEN_PROGRAM, "Trading"))
        .expect("save");
    storage
}

#[tokio::test]
async fn first_visit_silent_connect_stays_local() {
    let ext = Extension::boot(seeded_storage());

    let connecting = ext.wallet.connect(ConnectOptions { silent: true });
    ext.pump();

    let output = connecting.await.expect("silent connect");
    assert!(output.accounts.is_empty());
    assert!(ext.panel.calls().is_empty(), "no UI for silent connect");
}

#[tokio::test]
async fn approve_then_reconnect_silently_then_disconnect() {
    let storage = seeded_storage();
    let ext = Extension::boot(storage.clone());

    let connecting = ext.wallet.connect(ConnectOptions::default());
    ext.pump();
    assert!(ext
        .panel
        .calls()
        .contains(&SidePanelCall::Open { tab_id: TAB }));

    let request = ext.screen.load(&ext.connect_path()).expect("load");
    assert_eq!(request.params.for_origin, "app.example.com");
    assert!(request.preselected.is_empty());
    ext.screen
        .submit(&request.params, vec![Address::new(SYSTEM_PROGRAM)])
        .expect("submit");
    ext.pump();

    let output = connecting.await.expect("approved");
    assert_eq!(output.accounts.len(), 1);
    assert_eq!(output.accounts[0].label, "Treasury");
    assert_eq!(ext.panel.current_path().as_deref(), Some("/sidepanel.html"));

    // A fresh page load reconnects without UI.
    let reloaded = Extension::boot(storage.clone());
    let silent = reloaded.wallet.connect(ConnectOptions { silent: true });
    reloaded.pump();
    assert_eq!(silent.await.expect("silent").accounts.len(), 1);
    assert!(reloaded.panel.calls().is_empty());

    let disconnecting = reloaded.wallet.disconnect();
    assert!(reloaded.wallet.accounts().is_empty());
    reloaded.pump();
    disconnecting.await.expect("disconnect");
    assert!(ConnectionStore::new(storage)
        .get("app.example.com")
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn cancelled_connect_rejects_without_saving() {
    let storage = seeded_storage();
    let ext = Extension::boot(storage.clone());

    let connecting = ext.wallet.connect(ConnectOptions::default());
    ext.pump();
    let request = ext.screen.load(&ext.connect_path()).expect("load");
    ext.screen.cancel(&request.params).expect("cancel");
    ext.pump();

    let err = connecting.await.expect_err("rejected");
    assert!(err.to_string().contains("rejected"));
    assert!(ConnectionStore::new(storage).all().expect("all").is_empty());
}

#[tokio::test]
async fn tag_lookup_round_trip() {
    let ext = Extension::boot(seeded_storage());
    let lookup = ext.wallet.get_tags_for_addresses(vec![
        Address::new(SYSTEM_PROGRAM),
        Address::new(TOKEN_PROGRAM),
    ]);
    ext.pump();
    let tags = lookup.await.expect("tags");
    assert_eq!(tags[&Address::new(SYSTEM_PROGRAM)], vec!["cold".to_owned()]);
    assert!(tags[&Address::new(TOKEN_PROGRAM)].is_empty());
}

#[test]
fn browser_restart_relocks_session() {
    let storage = MemoryStorageAdapter::default();
    let lock = enable_lock(&storage, T0);
    storage.restart().expect("restart");

    let ext = Extension::boot(storage);
    ext.coordinator.on_startup().expect("locked on startup");
    assert!(lock.state().is_locked);
}

#[tokio::test]
async fn locked_session_still_completes_a_connect_request() {
    let storage = seeded_storage();
    let lock = enable_lock(&storage, T0);
    lock.set_state(&LockState::locked()).expect("lock");
    let ext = Extension::boot(storage.clone());
    assert!(ext.guard.is_locked());

    let connecting = ext.wallet.connect(ConnectOptions::default());
    ext.pump();

    let path = ext.connect_path();
    assert_eq!(ext.guard.access(&path), RouteAccess::Granted);
    assert_eq!(ext.guard.access("/sidepanel.html"), RouteAccess::Locked);

    let request = ext.screen.load(&path).expect("load");
    ext.screen
        .submit(&request.params, vec![Address::new(TOKEN_PROGRAM)])
        .expect("submit");
    ext.pump();

    let output = connecting.await.expect("approved while locked");
    assert_eq!(output.accounts[0].label, "Trading");
    assert!(ext.guard.is_locked(), "connecting does not unlock");
}

#[tokio::test(start_paused = true)]
async fn configured_request_timeout_rejects_unanswered_connect() {
    let config = OrbitConfig::from_lookup(|key| {
        (key == "ORBIT_REQUEST_TIMEOUT_MS").then(|| "5000".to_owned())
    });
    let ext = Extension::boot_with(seeded_storage(), &config);

    // Nothing pumps the bus, so the relay never answers.
    let err = ext
        .wallet
        .connect(ConnectOptions { silent: true })
        .await
        .expect_err("timed out");
    assert!(matches!(err, WalletError::NoResponse(_)));
}

#[tokio::test]
async fn default_config_waits_for_late_responses() {
    let ext = Extension::boot(seeded_storage());
    let connecting = tokio::spawn(ext.wallet.connect(ConnectOptions { silent: true }));
    tokio::task::yield_now().await;
    assert!(!connecting.is_finished());

    ext.pump();
    let output = connecting.await.expect("join").expect("silent connect");
    assert!(output.accounts.is_empty());
}

#[test]
fn enrollment_records_configured_relying_party() {
    let config = OrbitConfig::from_lookup(|key| {
        (key == "ORBIT_RELYING_PARTY_ID").then(|| "orbit.example".to_owned())
    });
    let ext = Extension::boot_with(MemoryStorageAdapter::default(), &config);

    ext.guard
        .enroll(CredentialRegistration {
            credential_id: "cred-7".to_owned(),
            public_key: "pk-7".to_owned(),
        })
        .expect("enroll");
    let settings = ext.guard.store.settings().expect("settings");
    assert_eq!(settings.relying_party_id, "orbit.example");
    assert!(!ext.guard.is_locked());
}

#[tokio::test(start_paused = true)]
async fn activity_tracker_uses_configured_debounce() {
    let config = OrbitConfig::from_lookup(|key| {
        (key == "ORBIT_ACTIVITY_DEBOUNCE_MS").then(|| "3000".to_owned())
    });
    let storage = MemoryStorageAdapter::default();
    let lock = enable_lock(&storage, T0);
    let tracker = ActivityTracker::from_config(lock.clone(), TestClock::at(T0 + 60_000), &config);

    tracker.record_interaction();
    tokio::time::sleep(std::time::Duration::from_millis(2_000)).await;
    assert_eq!(lock.state().last_activity_timestamp, TimestampMs(T0));

    tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
    assert_eq!(lock.state().last_activity_timestamp, TimestampMs(T0 + 60_000));
}
