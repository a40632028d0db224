//! Synthesis through an external speech command.
//!
//! `sh` stands in for the speech program: it swallows the notes on stdin and
//! copies a prepared WAV to the `{output}` path.

use std::path::Path;
use std::sync::Arc;

use slidecast_common::config::SpeechCommandConfig;
use slidecast_narration::{wav_file_secs, CommandSpeechEngine, NarrationSynthesizer};

fn write_fixture(path: &Path, sample_rate: u32, frames: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample(((i % 64) as i16 - 32) * 500).unwrap();
    }
    writer.finalize().unwrap();
}

fn copying_engine(fixture: &Path, scratch: &Path) -> CommandSpeechEngine {
    CommandSpeechEngine::new(&SpeechCommandConfig {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("cat > /dev/null; cp '{}' \"$1\"", fixture.display()),
            "sh".to_string(),
            "{output}".to_string(),
        ],
        voice: None,
    })
    .with_scratch_dir(scratch)
}

#[tokio::test]
async fn test_command_clip_is_rounded_up_to_whole_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("speech.wav");
    // 1.5s at 16 kHz.
    write_fixture(&fixture, 16_000, 24_000);

    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let synthesizer = NarrationSynthesizer::new(Arc::new(copying_engine(&fixture, &scratch)))
        .with_scratch_dir(&scratch);

    let clip = synthesizer.synthesize("Welcome to the talk.").await.unwrap();

    assert_eq!(clip.duration_secs, 2);
    assert!((clip.measured_secs - 1.5).abs() < 1e-9);
    assert_eq!(wav_file_secs(clip.path()).unwrap(), 2);

    let spec = hound::WavReader::open(clip.path()).unwrap().spec();
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_rate, 16_000);
}

#[tokio::test]
async fn test_session_files_do_not_outlive_the_clip() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("speech.wav");
    write_fixture(&fixture, 8_000, 8_000);

    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let synthesizer = NarrationSynthesizer::new(Arc::new(copying_engine(&fixture, &scratch)))
        .with_scratch_dir(&scratch);

    let clip = synthesizer.synthesize("One slide.").await.unwrap();
    // Only the exported clip remains while it is held.
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 1);
    assert!(clip.path().starts_with(&scratch));

    drop(clip);
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

#[tokio::test]
async fn test_command_that_writes_nothing_is_synthesis_failure() {
    let dir = tempfile::tempdir().unwrap();
    let engine = CommandSpeechEngine::new(&SpeechCommandConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "cat > /dev/null".to_string()],
        voice: None,
    })
    .with_scratch_dir(dir.path());
    let synthesizer = NarrationSynthesizer::new(Arc::new(engine)).with_scratch_dir(dir.path());

    let err = synthesizer.synthesize("Hello").await.unwrap_err();
    assert!(err.to_string().starts_with("Synthesis failed"));
}
