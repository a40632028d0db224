//! WAV measurement and duration-bounded clip export.
//!
//! Clips are exported as 16-bit integer PCM at the engine's sample rate and
//! channel count. A clip's length is the measured speech duration rounded up
//! to the next whole second; the tail is padded with silence so trailing
//! speech is never cut.

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Bits per sample of every exported clip.
pub const CLIP_BITS_PER_SAMPLE: u16 = 16;

/// Decoded PCM audio, interleaved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

/// Errors from decoding speech audio or writing a clip.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("Failed to decode speech audio: {0}")]
    Decode(#[source] hound::Error),

    #[error("Unsupported speech audio: {0}")]
    Unsupported(String),

    #[error("Failed to write clip {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

impl PcmAudio {
    /// Decode a WAV container into 16-bit samples.
    ///
    /// Readers that hit a malformed tail after some samples keep what was
    /// read; streaming writers often leave a placeholder data length.
    pub fn decode_wav(bytes: &[u8]) -> Result<Self, ClipError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(ClipError::Decode)?;
        let spec = reader.spec();

        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(ClipError::Unsupported(format!(
                "{} channels at {} Hz",
                spec.channels, spec.sample_rate
            )));
        }

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => {
                if spec.bits_per_sample != 32 {
                    return Err(ClipError::Unsupported(format!(
                        "{}-bit float samples",
                        spec.bits_per_sample
                    )));
                }
                collect_samples(reader.samples::<f32>(), |s: f32| {
                    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                })?
            }
            hound::SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                if bits == 0 || bits > 32 {
                    return Err(ClipError::Unsupported(format!("{bits}-bit integer samples")));
                }
                collect_samples(reader.samples::<i32>(), |s: i32| rescale_to_i16(s, bits))?
            }
        };

        let channels = usize::from(spec.channels);
        let mut samples = samples;
        samples.truncate(samples.len() - samples.len() % channels);

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.channels.max(1))) as u64
    }

    /// Measured playable duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }
}

fn collect_samples<T, I, F>(samples: I, convert: F) -> Result<Vec<i16>, ClipError>
where
    I: Iterator<Item = hound::Result<T>>,
    F: Fn(T) -> i16,
{
    let mut out = Vec::new();
    for sample in samples {
        match sample {
            Ok(sample) => out.push(convert(sample)),
            Err(e) if out.is_empty() => return Err(ClipError::Decode(e)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    samples = out.len(),
                    "Speech audio ended early, keeping decoded samples"
                );
                break;
            }
        }
    }
    Ok(out)
}

fn rescale_to_i16(sample: i32, bits: u16) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

/// Clip length in whole seconds for `frames` of audio at `sample_rate`:
/// the ceiling of the measured duration, never below `min_secs`.
pub fn bounded_clip_secs(frames: u64, sample_rate: u32, min_secs: u32) -> u64 {
    let rate = u64::from(sample_rate.max(1));
    frames.div_ceil(rate).max(u64::from(min_secs))
}

/// Write `audio` to `path` as a clip exactly `clip_secs` long.
pub fn write_bounded_wav(path: &Path, audio: &PcmAudio, clip_secs: u64) -> Result<(), ClipError> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: CLIP_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let write_err = |source: hound::Error| ClipError::Write {
        path: path.to_path_buf(),
        source,
    };

    let total_samples = clip_secs as usize * audio.sample_rate as usize * usize::from(audio.channels);
    let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
    for sample in audio.samples.iter().take(total_samples) {
        writer.write_sample(*sample).map_err(write_err)?;
    }
    for _ in audio.samples.len()..total_samples {
        writer.write_sample(0i16).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)
}

/// Measure a WAV file on disk in whole seconds, rounding up.
pub fn wav_file_secs(path: &Path) -> Result<u64, ClipError> {
    let reader = hound::WavReader::open(path).map_err(ClipError::Decode)?;
    let spec = reader.spec();
    Ok(bounded_clip_secs(
        u64::from(reader.duration()),
        spec.sample_rate,
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i32]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                match spec.bits_per_sample {
                    8 => writer.write_sample(*s as i8).unwrap(),
                    16 => writer.write_sample(*s as i16).unwrap(),
                    _ => writer.write_sample(*s).unwrap(),
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn mono16(rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_decode_measures_duration() {
        let bytes = wav_bytes(mono16(8000), &vec![100; 12_000]);
        let audio = PcmAudio::decode_wav(&bytes).unwrap();
        assert_eq!(audio.frames(), 12_000);
        assert!((audio.duration_secs() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rescales_24_bit() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[1 << 16, -(1 << 16), 0, 256]);
        let audio = PcmAudio::decode_wav(&bytes).unwrap();
        assert_eq!(audio.samples, vec![256, -256, 0, 1]);
        assert_eq!(audio.frames(), 2);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            PcmAudio::decode_wav(b"definitely not a wav"),
            Err(ClipError::Decode(_))
        ));
    }

    #[test]
    fn test_bounded_clip_secs_rounds_up() {
        assert_eq!(bounded_clip_secs(8000, 8000, 0), 1);
        assert_eq!(bounded_clip_secs(8001, 8000, 0), 2);
        assert_eq!(bounded_clip_secs(0, 8000, 0), 0);
        assert_eq!(bounded_clip_secs(0, 8000, 1), 1);
        assert_eq!(bounded_clip_secs(4000, 8000, 3), 3);
    }

    #[test]
    fn test_write_bounded_pads_to_whole_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let audio = PcmAudio {
            sample_rate: 8000,
            channels: 1,
            samples: vec![7; 12_000],
        };

        write_bounded_wav(&path, &audio, bounded_clip_secs(audio.frames(), 8000, 1)).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 16_000);
        assert_eq!(reader.spec().bits_per_sample, CLIP_BITS_PER_SAMPLE);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert!(samples[..12_000].iter().all(|s| *s == 7));
        assert!(samples[12_000..].iter().all(|s| *s == 0));
        assert_eq!(wav_file_secs(&path).unwrap(), 2);
    }

    proptest! {
        #[test]
        fn prop_bounded_clip_never_truncates(frames in 0u64..10_000_000, rate in 1u32..96_000) {
            let secs = bounded_clip_secs(frames, rate, 0);
            prop_assert!(secs * u64::from(rate) >= frames);
            prop_assert!(secs == 0 || (secs - 1) * u64::from(rate) < frames);
        }
    }
}
