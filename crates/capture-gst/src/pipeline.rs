//! GStreamer pipeline construction for screen capture.

use std::path::Path;
use std::sync::OnceLock;

use gst::prelude::*;
use gstreamer as gst;

use screenrec_platform_core::{DisplayServer, FrameworkError};

/// Elements every screen pipeline needs besides its source.
const ENCODE_ELEMENTS: [&str; 6] = [
    "queue",
    "videoconvert",
    "videorate",
    "x264enc",
    "h264parse",
    "mp4mux",
];

/// Screen source element for a display server.
pub fn source_element(display: DisplayServer) -> Result<&'static str, FrameworkError> {
    match display {
        DisplayServer::X11 => Ok("ximagesrc"),
        DisplayServer::Windows => Ok("d3d11screencapturesrc"),
        DisplayServer::MacOS => Ok("avfvideosrc"),
        DisplayServer::Wayland => Err(FrameworkError::unavailable(
            "Wayland sessions are not supported; run under an X11 session",
        )),
        DisplayServer::Unknown => Err(FrameworkError::unavailable(
            "No display server detected (neither X11, Windows nor macOS)",
        )),
    }
}

/// Source fragment of the launch string, with pointer handling applied.
pub fn screen_source(display: DisplayServer, show_cursor: bool) -> Result<String, FrameworkError> {
    let element = source_element(display)?;
    let fragment = match display {
        // `use-damage=false` ensures full frame delivery (no incremental
        // damage updates that can miss regions).
        DisplayServer::X11 => format!("{element} use-damage=false show-pointer={show_cursor}"),
        DisplayServer::Windows => format!("{element} show-cursor={show_cursor}"),
        _ => format!("{element} capture-screen=true capture-screen-cursor={show_cursor}"),
    };
    Ok(fragment)
}

/// Full launch string: source, H.264 encode, MP4 mux, file sink.
pub fn build_launch(source: &str, output_path: &Path, fps: u32, bitrate_kbps: u32) -> String {
    let path = escape_path(output_path);
    // One keyframe every 2 seconds keeps seeking usable at low bitrates.
    let keyint = fps.saturating_mul(2).max(2);
    // queue elements decouple the capture source from the encoder so that
    // encoder stalls don't cause dropped frames at the source.
    format!(
        "{source} ! queue max-size-buffers=200 leaky=downstream ! videoconvert ! videorate ! video/x-raw,framerate={fps}/1 ! queue max-size-buffers=8 ! x264enc tune=zerolatency speed-preset=veryfast bitrate={bitrate_kbps} key-int-max={keyint} ! h264parse ! queue max-size-buffers=8 ! mp4mux ! filesink location=\"{path}\""
    )
}

/// Elements required for `display` that are not registered.
pub fn missing_elements(display: DisplayServer) -> Result<Vec<&'static str>, FrameworkError> {
    init_gstreamer()?;
    let source = source_element(display)?;
    Ok(std::iter::once(source)
        .chain(ENCODE_ELEMENTS)
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect())
}

/// A launched screen pipeline.
pub struct ScreenPipeline {
    name: String,
    pipeline: gst::Pipeline,
}

impl ScreenPipeline {
    pub fn from_launch(name: impl Into<String>, launch: &str) -> Result<Self, FrameworkError> {
        init_gstreamer()?;

        let element = gst::parse::launch(launch)
            .map_err(|e| FrameworkError::failed(format!("Failed to build pipeline: {e}")))?;

        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| FrameworkError::failed("Launch string did not produce a pipeline"))?;

        Ok(Self {
            name: name.into(),
            pipeline,
        })
    }

    pub fn bus(&self) -> Option<gst::Bus> {
        self.pipeline.bus()
    }

    /// Set the pipeline to Playing and wait for the state change. Blocking.
    pub fn start(&self) -> Result<(), FrameworkError> {
        if let Err(e) = self.pipeline.set_state(gst::State::Playing) {
            let detail = self.pending_error().unwrap_or_else(|| format!("{e:?}"));
            self.set_null();
            return Err(classify_start_error(&self.name, detail));
        }

        // GStreamer state changes are async; without this wait the pipeline
        // may not have opened the capture source yet when we return.
        match self.pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                let detail = self.pending_error().unwrap_or_else(|| format!("{e:?}"));
                self.set_null();
                return Err(classify_start_error(&self.name, detail));
            }
        }
        Ok(())
    }

    /// Push EOS so the muxer can finalize the file. Returns false if the
    /// event was not accepted.
    pub fn send_eos(&self) -> bool {
        self.pipeline.send_event(gst::event::Eos::new())
    }

    pub fn set_null(&self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to set pipeline to Null");
        }
    }

    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(err.error().to_string()),
            _ => None,
        }
    }
}

fn classify_start_error(pipeline: &str, detail: String) -> FrameworkError {
    let lowered = detail.to_lowercase();
    let message = format!("Failed to start {pipeline} pipeline: {detail}");
    if ["permission", "denied", "not authorized", "authoriz"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        FrameworkError::permission_denied(message)
    } else if lowered.contains("busy") || lowered.contains("in use") {
        FrameworkError::busy(message)
    } else {
        FrameworkError::failed(message)
    }
}

fn init_gstreamer() -> Result<(), FrameworkError> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(FrameworkError::unavailable(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}
