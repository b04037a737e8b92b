//! Session lifecycle: start/stop, opt-out, teardown cancellation.

use async_trait::async_trait;
use linkwatch::probe::{spawn_probe, ProbeOutcome, Prober};
use linkwatch::signal::LinkQuery;
use linkwatch::{Capabilities, Monitor, MonitorConfig, TransportKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

struct SlowProber {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl Prober for SlowProber {
    async fn check(&self, _url: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        true
    }
}

struct NoLinkQuery;

impl LinkQuery for NoLinkQuery {
    fn current_link(&self) -> Option<TransportKind> {
        None
    }
}

fn slow_monitor(delay: Duration) -> (Monitor, Arc<SlowProber>) {
    let prober = Arc::new(SlowProber {
        delay,
        calls: AtomicUsize::new(0),
    });
    let monitor = Monitor::with_prober(
        MonitorConfig::default(),
        Arc::new(NoLinkQuery),
        Capabilities {
            push_unified: true,
            push_filtered: false,
        },
        Arc::clone(&prober) as Arc<dyn Prober>,
    );
    (monitor, prober)
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_in_flight_probe() {
    let (monitor, prober) = slow_monitor(Duration::from_secs(5));
    let mut session = monitor.session();
    let mut changes = session.subscribe();
    session.start();

    session
        .push_registration()
        .unwrap()
        .link_available(TransportKind::Wifi);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

    session.stop(false);

    // The probe's success would have landed at 5s; it must never arrive.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(
        matches!(changes.try_recv(), Err(broadcast::error::TryRecvError::Empty)),
        "stopped session received a notification"
    );
    assert!(!monitor.last_known().is_active);
}

#[tokio::test(start_paused = true)]
async fn suspended_session_can_restart() {
    let (monitor, prober) = slow_monitor(Duration::ZERO);
    let mut session = monitor.session();
    let mut changes = session.subscribe();
    session.start();
    session.stop(false);

    session.start();
    session
        .push_registration()
        .unwrap()
        .link_available(TransportKind::Wifi);
    let change = tokio::time::timeout(Duration::from_secs(30), changes.recv())
        .await
        .expect("no notification after restart")
        .unwrap();
    assert!(change.is_active);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn terminal_stop_is_final() {
    let (monitor, _prober) = slow_monitor(Duration::ZERO);
    let mut session = monitor.session();
    session.start();
    session.stop(true);

    session.start();
    assert!(
        session.push_registration().is_none(),
        "terminally stopped session must not re-register"
    );
}

#[tokio::test(start_paused = true)]
async fn disabled_session_is_inert() {
    let (monitor, prober) = slow_monitor(Duration::ZERO);
    let mut session = monitor.session();
    session.disable_events();

    session.start();
    assert!(session.push_registration().is_none());
    session.stop(false);
    session.stop(true);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn drop_tears_down_cleanly() {
    let (monitor, prober) = slow_monitor(Duration::from_secs(5));
    let mut session = monitor.session();
    session.start();
    session
        .push_registration()
        .unwrap()
        .link_available(TransportKind::Wifi);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

    drop(session);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(
        !monitor.last_known().is_active,
        "probe outlived its dropped session"
    );
}

#[tokio::test(start_paused = true)]
async fn filtered_tier_reports_down_on_start() {
    let prober = Arc::new(SlowProber {
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
    });
    let monitor = Monitor::with_prober(
        MonitorConfig::default(),
        Arc::new(NoLinkQuery),
        Capabilities {
            push_unified: false,
            push_filtered: true,
        },
        Arc::clone(&prober) as Arc<dyn Prober>,
    );
    let mut session = monitor.session();
    let mut changes = session.subscribe();
    session.start();

    // Registration found no link and synthesized the missing announcement.
    let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("no synthesized signal")
        .unwrap();
    assert!(!change.is_active);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_probe_delivers_nothing() {
    let prober = Arc::new(SlowProber {
        delay: Duration::from_secs(2),
        calls: AtomicUsize::new(0),
    });
    let (tx, mut rx) = mpsc::channel::<ProbeOutcome>(4);

    let handle = spawn_probe(
        prober,
        "https://example.invalid/".to_string(),
        Duration::from_secs(8),
        1,
        tx,
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    handle.cancel();
    handle.cancel(); // idempotent

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(rx.try_recv().is_err(), "cancelled probe sent an outcome");
}

#[tokio::test(start_paused = true)]
async fn probe_delivers_exactly_one_outcome() {
    let prober = Arc::new(SlowProber {
        delay: Duration::from_secs(1),
        calls: AtomicUsize::new(0),
    });
    let (tx, mut rx) = mpsc::channel::<ProbeOutcome>(4);

    let handle = spawn_probe(
        prober,
        "https://example.invalid/".to_string(),
        Duration::from_secs(8),
        7,
        tx,
    );
    let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no outcome")
        .unwrap();
    assert_eq!(outcome, ProbeOutcome { generation: 7, success: true });

    handle.cancel(); // after delivery: no-op
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(rx.try_recv().is_err(), "second outcome delivered");
}
