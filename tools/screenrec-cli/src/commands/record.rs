//! Record the screen through the bridge.

use std::path::PathBuf;
use std::time::Duration;

use screenrec_bridge::{BridgeConfig, RecordingBridge};
use screenrec_common::config::AppConfig;
use screenrec_platform_core::CaptureFramework;

pub struct RecordOptions {
    pub output: Option<PathBuf>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub show_cursor: Option<bool>,
    pub duration_secs: Option<f64>,
    pub simulate: bool,
}

enum StopReason {
    CtrlC,
    DurationElapsed,
    Interrupted,
}

pub async fn run(config: AppConfig, options: RecordOptions) -> anyhow::Result<()> {
    let framework = super::capture_framework(options.simulate);
    record(framework, config, options).await
}

/// Record through `framework` until Ctrl+C, the duration limit, or an
/// interruption reported by the framework.
pub async fn record(
    framework: Box<dyn CaptureFramework>,
    config: AppConfig,
    options: RecordOptions,
) -> anyhow::Result<()> {
    let bridge_config = bridge_config(&config, &options);
    bridge_config.recording.validate()?;
    let limit = recording_limit(options.duration_secs)?;

    println!("Starting screen recording");
    println!("  Output: {}", bridge_config.output_dir.display());
    println!("  FPS: {}", bridge_config.recording.fps);
    println!("  Bitrate: {} kbit/s", bridge_config.recording.bitrate_kbps);
    println!("  Cursor: {}", bridge_config.recording.show_cursor);
    println!();

    let bridge = RecordingBridge::spawn_boxed(framework, bridge_config);

    if !bridge.is_available().await {
        bridge.shutdown().await?;
        anyhow::bail!("Screen capture is not available here; run `screenrec check` for details");
    }

    bridge.start_recording().await?;

    match limit {
        Some(limit) => println!(
            "Recording for {:.1}s (Ctrl+C stops early)...",
            limit.as_secs_f64()
        ),
        None => println!("Press Ctrl+C to stop recording..."),
    }
    println!();

    let mut status_rx = bridge.subscribe();

    let reason = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            StopReason::CtrlC
        }
        _ = sleep_for(limit) => StopReason::DurationElapsed,
        _ = status_rx.wait_for(|status| !status.is_recording) => StopReason::Interrupted,
    };

    match reason {
        StopReason::Interrupted => {
            let message = bridge
                .last_error()
                .unwrap_or_else(|| "unknown reason".to_string());
            bridge.shutdown().await?;
            anyhow::bail!("Recording was interrupted: {message}");
        }
        StopReason::CtrlC | StopReason::DurationElapsed => {
            println!();
            let summary = bridge.stop_recording().await?;
            bridge.shutdown().await?;
            match summary.output {
                Some(path) => println!("Recording saved to: {}", path.display()),
                None => println!("Recording stopped"),
            }
            println!("Duration: {:.1}s", summary.duration_secs);
        }
    }

    Ok(())
}

/// Convert `--duration` into a sleep limit. Rejects zero, negative and
/// non-finite values before anything is recorded.
fn recording_limit(duration_secs: Option<f64>) -> anyhow::Result<Option<Duration>> {
    let Some(secs) = duration_secs else {
        return Ok(None);
    };
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("--duration must be a positive number of seconds, got {secs}");
    }
    let limit = Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow::anyhow!("--duration {secs} is out of range: {e}"))?;
    Ok(Some(limit))
}

async fn sleep_for(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

fn bridge_config(config: &AppConfig, options: &RecordOptions) -> BridgeConfig {
    let mut bridge_config = BridgeConfig::from(config);
    if let Some(output) = &options.output {
        bridge_config.output_dir = output.clone();
    }
    if let Some(fps) = options.fps {
        bridge_config.recording.fps = fps;
    }
    if let Some(bitrate) = options.bitrate_kbps {
        bridge_config.recording.bitrate_kbps = bitrate;
    }
    if let Some(show_cursor) = options.show_cursor {
        bridge_config.recording.show_cursor = show_cursor;
    }
    bridge_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenrec_bridge::SimulatedFramework;

    fn options() -> RecordOptions {
        RecordOptions {
            output: None,
            fps: None,
            bitrate_kbps: None,
            show_cursor: None,
            duration_secs: None,
            simulate: true,
        }
    }

    #[test]
    fn flags_override_config_values() {
        let config = AppConfig::default();
        let opts = RecordOptions {
            output: Some(PathBuf::from("/tmp/rec")),
            fps: Some(60),
            bitrate_kbps: Some(4_000),
            show_cursor: Some(false),
            ..options()
        };

        let bridge_config = bridge_config(&config, &opts);
        assert_eq!(bridge_config.output_dir, PathBuf::from("/tmp/rec"));
        assert_eq!(bridge_config.recording.fps, 60);
        assert_eq!(bridge_config.recording.bitrate_kbps, 4_000);
        assert!(!bridge_config.recording.show_cursor);
    }

    #[test]
    fn missing_flags_keep_config_values() {
        let config = AppConfig::default();
        let bridge_config = bridge_config(&config, &options());
        assert_eq!(bridge_config.output_dir, config.output_dir);
        assert_eq!(bridge_config.recording.fps, 30);
        assert!(bridge_config.recording.show_cursor);
    }

    #[tokio::test]
    async fn simulated_recording_stops_after_duration() {
        let mut config = AppConfig::default();
        config.output_dir = std::env::temp_dir().join("screenrec-cli-test");
        let opts = RecordOptions {
            duration_secs: Some(0.05),
            ..options()
        };
        run(config, opts).await.unwrap();
    }

    #[test]
    fn invalid_durations_are_rejected() {
        for secs in [-1.0, 0.0, f64::NAN, f64::INFINITY, f64::MAX] {
            assert!(recording_limit(Some(secs)).is_err(), "accepted {secs}");
        }
        assert_eq!(recording_limit(None).unwrap(), None);
        assert_eq!(
            recording_limit(Some(1.5)).unwrap(),
            Some(Duration::from_millis(1500))
        );
    }

    #[tokio::test]
    async fn invalid_duration_fails_before_capture_starts() {
        let framework = SimulatedFramework::new();
        let control = framework.control();
        let opts = RecordOptions {
            duration_secs: Some(-1.0),
            ..options()
        };

        let err = record(Box::new(framework), AppConfig::default(), opts)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--duration"));
        assert_eq!(control.start_calls(), 0);
    }

    #[tokio::test]
    async fn interruption_ends_recording_with_framework_reason() {
        let framework = SimulatedFramework::new();
        let control = framework.control();
        let mut config = AppConfig::default();
        config.output_dir = std::env::temp_dir().join("screenrec-cli-interrupt");
        let opts = RecordOptions {
            duration_secs: Some(30.0),
            ..options()
        };

        let interrupter = tokio::spawn(async move {
            while !control.is_capturing() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert!(control.interrupt("display disconnected"));
            control
        });

        let err = record(Box::new(framework), config, opts)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Recording was interrupted: display disconnected"
        );

        let control = interrupter.await.unwrap();
        assert!(!control.is_capturing());
        assert_eq!(control.stop_calls(), 0);
    }
}
