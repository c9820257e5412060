pub mod check;
pub mod config;
pub mod record;
pub mod status;

use screenrec_bridge::SimulatedFramework;
use screenrec_gst::GstScreenRecorder;
use screenrec_platform_core::CaptureFramework;

/// The capture framework the bridge is built around.
pub fn capture_framework(simulate: bool) -> Box<dyn CaptureFramework> {
    if simulate {
        tracing::info!("Using simulated capture framework");
        Box::new(SimulatedFramework::new())
    } else {
        Box::new(GstScreenRecorder::new())
    }
}
