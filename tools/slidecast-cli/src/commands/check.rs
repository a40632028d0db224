//! Check system capabilities.

use slidecast_common::config::{config_file_path, SlidecastConfig};
use slidecast_narration::{CommandSpeechEngine, TextToSpeechEngine};
use slidecast_render_engine::{FfmpegMuxer, MuxEngine};

pub fn run(config: &SlidecastConfig) -> anyhow::Result<()> {
    println!("Slidecast System Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config: {}", path.display());
    } else {
        println!("[--] Config: {} (using defaults)", path.display());
    }

    let muxer = FfmpegMuxer::from_config(&config.video);
    let mux_ok = muxer.is_available();
    if mux_ok {
        println!("[OK] Mux engine: {}", config.video.ffmpeg_path);
    } else {
        println!(
            "[FAIL] Mux engine: {} not found (install ffmpeg or set video.ffmpeg_path)",
            config.video.ffmpeg_path
        );
    }

    let speech = CommandSpeechEngine::new(&config.narration.command);
    let speech_ok = speech.is_available();
    if speech_ok {
        println!("[OK] Speech engine: {}", config.narration.command.program);
    } else {
        println!(
            "[FAIL] Speech engine: {} not found (install it or set narration.command.program)",
            config.narration.command.program
        );
    }

    println!();
    if mux_ok && speech_ok {
        println!("All required tools are available. Slidecast is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
