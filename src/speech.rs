//! Text-to-speech adapter.
//!
//! The synthesizer itself is an external collaborator: anything that can turn a string into a
//! playable audio file on disk. This module only defines that seam and a couple of ready-made
//! implementations.

use std::path::{Path, PathBuf};

use crate::foundation::error::ReelResult;

pub mod command;
pub mod silence;

pub use command::CommandSynth;
pub use silence::SilenceSynth;

/// Turns text into an audio file.
///
/// After a successful `synthesize`, `out_path` must hold audio that `ffmpeg` (or, for PCM WAV,
/// `hound`) can decode. Errors are passed through to the caller untouched.
pub trait SpeechSynth {
    /// Write speech for `text` to `out_path`.
    fn synthesize(&self, text: &str, out_path: &Path) -> anyhow::Result<()>;

    /// File extension used for the temporary audio path, without the dot.
    ///
    /// Some engines pick their container from the extension.
    fn audio_extension(&self) -> &str {
        "wav"
    }
}

impl<F> SpeechSynth for F
where
    F: Fn(&str, &Path) -> anyhow::Result<()>,
{
    fn synthesize(&self, text: &str, out_path: &Path) -> anyhow::Result<()> {
        self(text, out_path)
    }
}

/// Run `tts` for `text` and return the path it wrote.
///
/// No validation of the produced file happens here; a broken file surfaces later when it is
/// decoded.
pub fn synthesize_text_audio(
    tts: &dyn SpeechSynth,
    text: &str,
    out_path: &Path,
) -> ReelResult<PathBuf> {
    tracing::debug!(text, out = %out_path.display(), "synthesizing speech");
    tts.synthesize(text, out_path)?;
    Ok(out_path.to_path_buf())
}
