//! Text-to-speech engine contract.

/// Audio handed over by a speech session once speech has ended.
///
/// The bytes are a complete WAV container owned by the caller; nothing else
/// reads from or writes to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    wav: Vec<u8>,
}

impl SpeechAudio {
    pub fn from_wav(wav: Vec<u8>) -> Self {
        Self { wav }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn is_empty(&self) -> bool {
        self.wav.is_empty()
    }
}

/// A text-to-speech capability injected into the narration synthesizer.
///
/// Every synthesis opens its own session, so concurrent slides never share
/// mutable engine state.
#[async_trait::async_trait]
pub trait TextToSpeechEngine: Send + Sync {
    /// Open an independent speech session.
    async fn open_session(&self) -> anyhow::Result<Box<dyn SpeechSession>>;

    /// Check if this engine can run on the system.
    fn is_available(&self) -> bool {
        true
    }

    /// Engine name.
    fn name(&self) -> &str;
}

/// One engine session.
#[async_trait::async_trait]
pub trait SpeechSession: Send {
    /// Speak `text`. Resolves only once the engine has signalled end of
    /// speech, with the full rendered audio.
    async fn speak(&mut self, text: &str) -> anyhow::Result<SpeechAudio>;
}
