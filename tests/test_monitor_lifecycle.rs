//! Monitor lifecycle tests with a mock transport
//!
//! Covers start, the dispatch loop feeding a channel observer, and shutdown.

use std::time::Duration;
use tics_monitor::config::MonitorConfig;
use tics_monitor::monitor::Monitor;
use tics_monitor::protocol::{StatusView, ALARM_SMOKE_TOPIC, RSSI_TOPIC};
use tics_monitor::telemetry::{ChannelObserver, ReconciliationEngine};
use tics_monitor::testing::{MockTransport, RecordingNotifier};
use tokio::sync::watch;
use tokio::time::timeout;

#[tokio::test]
async fn test_status_stream_reaches_presentation_view() {
    let config = MonitorConfig::default();
    let transport = MockTransport::new();
    let engine = ReconciliationEngine::new(&config, Box::new(RecordingNotifier::new()));
    let mut monitor = Monitor::new(transport.clone(), engine);

    let (observer, mut snapshots) = ChannelObserver::channel(8);
    monitor.register_observer(Box::new(observer));
    monitor.start().await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch = tokio::spawn(async move { monitor.run(shutdown_rx).await });

    transport.inject(RSSI_TOPIC, "-52").await;
    transport.inject(ALARM_SMOKE_TOPIC, "1").await;

    let estimator = config.distance.estimator();
    let mut view = StatusView::default();
    for _ in 0..2 {
        let snapshot = timeout(Duration::from_secs(2), snapshots.recv())
            .await
            .expect("snapshot published")
            .expect("observer channel open");
        view.apply(&snapshot.to_event(), &estimator);
    }

    assert!(view.smoke_alert);
    assert!(view.gas_alert);
    assert!(view.bracelet_connected);
    assert!((view.distance_m - 1.0).abs() < 1e-9);

    shutdown_tx.send(true).unwrap();
    dispatch.await.unwrap().unwrap();
    assert_eq!(transport.disconnect_count(), 1);
}

#[tokio::test]
async fn test_dropped_shutdown_sender_stops_dispatch() {
    let transport = MockTransport::new();
    let engine = ReconciliationEngine::new(
        &MonitorConfig::default(),
        Box::new(RecordingNotifier::new()),
    );
    let mut monitor = Monitor::new(transport.clone(), engine);
    monitor.start().await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    timeout(Duration::from_secs(2), monitor.run(shutdown_rx))
        .await
        .expect("dispatch loop ends")
        .unwrap();

    assert!(monitor.is_stopped());
    assert_eq!(transport.disconnect_count(), 1);
}

#[tokio::test]
async fn test_failed_start_still_shuts_down_cleanly() {
    let transport = MockTransport::with_failure();
    let engine = ReconciliationEngine::new(
        &MonitorConfig::default(),
        Box::new(RecordingNotifier::new()),
    );
    let mut monitor = Monitor::new(transport.clone(), engine);

    monitor.start().await.unwrap();
    monitor.shutdown().await.unwrap();

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(transport.subscribe_count(), 0);
    assert_eq!(transport.disconnect_count(), 1);
}
