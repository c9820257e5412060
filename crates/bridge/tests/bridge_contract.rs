use std::path::PathBuf;
use std::time::Duration;

use screenrec_bridge::{BridgeConfig, RecordingBridge, SimulatedControl, SimulatedFramework};
use screenrec_common::config::RecordingDefaults;
use screenrec_common::error::BridgeError;
use screenrec_platform_core::{FrameworkError, SessionId};

fn test_config() -> BridgeConfig {
    BridgeConfig {
        output_dir: PathBuf::from("/tmp/screenrec-tests"),
        recording: RecordingDefaults::default(),
    }
}

fn spawn_bridge() -> (RecordingBridge, SimulatedControl) {
    let framework = SimulatedFramework::new();
    let control = framework.control();
    (RecordingBridge::spawn(framework, test_config()), control)
}

async fn wait_until_idle(bridge: &RecordingBridge) {
    let mut status_rx = bridge.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        status_rx.wait_for(|status| !status.is_recording),
    )
    .await
    .expect("bridge should go idle")
    .expect("bridge should still be running");
}

#[tokio::test]
async fn start_then_stop_round_trip() {
    let (bridge, control) = spawn_bridge();
    assert!(!bridge.is_recording());
    assert_eq!(bridge.last_error(), None);

    bridge.start_recording().await.unwrap();
    assert!(bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
    assert!(bridge.status().started_at.is_some());
    assert!(control.is_capturing());

    let summary = bridge.stop_recording().await.unwrap();
    assert!(!bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
    assert!(bridge.status().started_at.is_none());
    assert!(!control.is_capturing());

    let output = summary.output.expect("simulated recorder reports a path");
    assert!(output.starts_with("/tmp/screenrec-tests"));
    let name = output.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("screen_recording_"));
    assert!(name.ends_with(".mp4"));
    assert!(summary.duration_secs >= 0.0);
}

#[tokio::test]
async fn double_start_yields_already_recording() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();

    let err = bridge.start_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::AlreadyRecording));
    assert!(bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
    assert_eq!(control.start_calls(), 1);
}

#[tokio::test]
async fn stop_while_idle_yields_not_recording_and_keeps_last_error() {
    let (bridge, control) = spawn_bridge();
    control.reject_next_start(FrameworkError::permission_denied("permission denied"));
    bridge.start_recording().await.unwrap_err();

    let err = bridge.stop_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotRecording));
    assert_eq!(bridge.last_error().as_deref(), Some("permission denied"));
    assert_eq!(control.stop_calls(), 0);
}

#[tokio::test]
async fn rejected_start_stores_framework_message() {
    let (bridge, control) = spawn_bridge();
    control.reject_next_start(FrameworkError::permission_denied("permission denied"));

    let err = bridge.start_recording().await.unwrap_err();
    match err {
        BridgeError::PlatformRejected { message } => assert_eq!(message, "permission denied"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!bridge.is_recording());
    assert_eq!(bridge.last_error().as_deref(), Some("permission denied"));
}

#[tokio::test]
async fn unavailable_framework_rejects_start() {
    let (bridge, control) = spawn_bridge();
    control.set_available(false);

    assert!(!bridge.is_available().await);
    let err = bridge.start_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::Unavailable { .. }));
    assert!(!bridge.is_recording());
    assert!(bridge.last_error().is_some());

    control.set_available(true);
    assert!(bridge.is_available().await);
    bridge.start_recording().await.unwrap();
    assert_eq!(bridge.last_error(), None);
}

#[tokio::test]
async fn async_interruption_drives_bridge_idle() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();

    assert!(control.interrupt("another app took over the screen"));
    wait_until_idle(&bridge).await;

    assert!(!bridge.is_recording());
    assert_eq!(
        bridge.last_error().as_deref(),
        Some("another app took over the screen")
    );
    assert_eq!(control.release_calls(), 1);

    let err = bridge.stop_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotRecording));
}

#[tokio::test]
async fn blank_interruption_reason_still_reports_an_error() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();

    control.interrupt("  ");
    wait_until_idle(&bridge).await;

    let error = bridge.last_error().expect("interruption must set an error");
    assert!(!error.trim().is_empty());
}

#[tokio::test]
async fn interruption_for_finished_session_is_ignored() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();
    let first_session = control.last_events().unwrap();
    assert_eq!(first_session.session(), SessionId(1));
    bridge.stop_recording().await.unwrap();

    bridge.start_recording().await.unwrap();
    assert_eq!(control.active_session(), Some(SessionId(2)));

    assert!(first_session.interrupted("late notification"));
    // Any command is processed after the event already in the mailbox.
    bridge.is_available().await;

    assert!(bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
    assert_eq!(control.release_calls(), 0);
}

#[tokio::test]
async fn stop_failure_still_ends_recording() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();
    control.fail_next_stop(FrameworkError::failed("muxer could not finalize file"));

    let err = bridge.stop_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::StopFailed { .. }));
    assert!(!bridge.is_recording());
    assert_eq!(
        bridge.last_error().as_deref(),
        Some("muxer could not finalize file")
    );

    bridge.start_recording().await.unwrap();
    assert!(bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
}

#[tokio::test]
async fn stop_while_start_pending_resolves_to_one_state() {
    let (bridge, control) = spawn_bridge();
    let mut observed = bridge.subscribe();
    let mut gate = control.hold_next_start();

    let starter = bridge.clone();
    let start_task = tokio::spawn(async move { starter.start_recording().await });
    gate.entered().await;

    let stopper = bridge.clone();
    let stop_task = tokio::spawn(async move { stopper.stop_recording().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!bridge.is_recording());

    gate.open();
    let start_result = start_task.await.unwrap();
    let stop_result = stop_task.await.unwrap();

    // Commands are served in arrival order: the stop waits for the start.
    assert!(start_result.is_ok());
    assert!(stop_result.is_ok());
    assert!(!bridge.is_recording());
    assert!(!control.is_capturing());
    assert_eq!(bridge.last_error(), None);

    let status = observed.borrow_and_update().clone();
    assert_eq!(status.is_recording, control.is_capturing());
}

#[tokio::test]
async fn restart_right_after_interruption_clears_error_on_acceptance() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();
    control.interrupt("display disconnected");

    // Start again without reading the error first. The interruption is
    // applied before the start, so the start is accepted.
    bridge.start_recording().await.unwrap();
    assert!(bridge.is_recording());
    assert_eq!(bridge.last_error(), None);
    assert_eq!(control.active_session(), Some(SessionId(2)));
}

#[tokio::test]
async fn restart_right_after_interruption_overwrites_error_on_rejection() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();
    control.interrupt("display disconnected");
    control.reject_next_start(FrameworkError::permission_denied("permission denied"));

    bridge.start_recording().await.unwrap_err();
    assert!(!bridge.is_recording());
    assert_eq!(bridge.last_error().as_deref(), Some("permission denied"));
}

#[tokio::test]
async fn start_forwards_recording_parameters() {
    let framework = SimulatedFramework::new();
    let control = framework.control();
    let config = BridgeConfig {
        output_dir: PathBuf::from("/tmp/custom"),
        recording: RecordingDefaults {
            fps: 24,
            bitrate_kbps: 2_000,
            file_prefix: "demo".to_string(),
            show_cursor: false,
        },
    };
    let bridge = RecordingBridge::spawn(framework, config);

    bridge.start_recording().await.unwrap();
    let request = control.last_request().unwrap();
    assert_eq!(request.output_dir, PathBuf::from("/tmp/custom"));
    assert_eq!(request.fps, 24);
    assert_eq!(request.bitrate_kbps, 2_000);
    assert_eq!(request.file_prefix, "demo");
    assert!(!request.show_cursor);
}

#[tokio::test]
async fn invalid_config_fails_without_touching_framework() {
    let framework = SimulatedFramework::new();
    let control = framework.control();
    let mut config = test_config();
    config.recording.fps = 0;
    let bridge = RecordingBridge::spawn(framework, config);

    let err = bridge.start_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::Config { .. }));
    assert_eq!(control.start_calls(), 0);
    assert!(!bridge.is_recording());
}

#[tokio::test]
async fn shutdown_stops_active_capture() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();

    bridge.shutdown().await.unwrap();
    assert_eq!(control.stop_calls(), 1);
    assert!(!control.is_capturing());
    assert!(!bridge.is_recording());

    let err = bridge.start_recording().await.unwrap_err();
    assert!(matches!(err, BridgeError::BridgeClosed));
}

#[tokio::test]
async fn dropping_every_handle_stops_active_capture() {
    let (bridge, control) = spawn_bridge();
    bridge.start_recording().await.unwrap();
    drop(bridge);

    tokio::time::timeout(Duration::from_secs(5), async {
        while control.is_capturing() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("capture should stop once the bridge is dropped");
    assert_eq!(control.stop_calls(), 1);
}

#[tokio::test]
async fn concurrent_callers_leave_consistent_state() {
    let (bridge, control) = spawn_bridge();
    control.set_start_latency(Duration::from_millis(2));
    control.set_stop_latency(Duration::from_millis(1));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let handle = bridge.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                handle.start_recording().await.map(|_| ())
            } else {
                handle.stop_recording().await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        match task.await.unwrap() {
            Ok(())
            | Err(BridgeError::AlreadyRecording)
            | Err(BridgeError::NotRecording) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    bridge.is_available().await;
    let status = bridge.status();
    assert_eq!(status.is_recording, control.is_capturing());
    assert_eq!(status.is_recording, status.started_at.is_some());
    assert_eq!(status.error, None);
}
