//! Print the bridge status.

use serde::Serialize;

use screenrec_bridge::{BridgeConfig, BridgeState, RecordingBridge, RecordingStatus};
use screenrec_common::config::AppConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    available: bool,
    state: BridgeState,
    #[serde(flatten)]
    status: RecordingStatus,
}

impl StatusReport {
    fn new(available: bool, status: RecordingStatus) -> Self {
        Self {
            available,
            state: status.state(),
            status,
        }
    }
}

pub async fn run(config: AppConfig, simulate: bool) -> anyhow::Result<()> {
    let bridge = RecordingBridge::spawn_boxed(
        super::capture_framework(simulate),
        BridgeConfig::from(&config),
    );

    let report = StatusReport::new(bridge.is_available().await, bridge.status());
    bridge.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
