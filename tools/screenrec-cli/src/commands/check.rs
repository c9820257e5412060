//! Check system capabilities.

use screenrec_common::config::config_file_path;
use screenrec_gst::GstScreenRecorder;
use screenrec_platform_core::DisplayServer;

pub async fn run(simulate: bool) -> anyhow::Result<()> {
    println!("screenrec System Check");
    println!("{}", "=".repeat(50));

    println!("[OK] Config file: {}", config_file_path().display());

    if simulate {
        println!("[OK] Capture framework: simulated");
        println!();
        println!("Simulated capture is always available.");
        return Ok(());
    }

    let recorder = GstScreenRecorder::new();
    match recorder.display() {
        DisplayServer::Unknown => println!("[WARN] Display server: Unknown"),
        display => println!("[OK] Display server: {display:?}"),
    }

    println!();
    match recorder.diagnose() {
        Ok(()) => {
            println!("[OK] GStreamer screen pipeline elements found");
            println!();
            println!("Screen capture is available. screenrec is ready.");
        }
        Err(e) => {
            println!("[FAIL] {e}");
            println!();
            println!("Screen capture is not available. See above for the missing piece.");
        }
    }

    Ok(())
}
