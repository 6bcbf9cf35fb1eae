use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::core::Rgba8,
    foundation::error::{ReelError, ReelResult},
    media::{self, AudioPcm},
    speech::{SpeechSynth, synthesize_text_audio},
};

/// Where a card sits in the reel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardKind {
    /// Countdown step showing this number.
    Countdown(u32),
    /// Word card for the word at this index of the input list.
    Word(usize),
    /// Closing card.
    Outro,
}

/// One full-screen text card with its speech attached.
#[derive(Clone, Debug)]
pub struct Card {
    pub kind: CardKind,
    pub text: String,
    /// On-screen time; never shorter than the speech.
    pub duration_sec: f64,
    pub audio: AudioPcm,
}

impl Card {
    pub fn speech_duration_sec(&self) -> f64 {
        self.audio.duration_sec()
    }
}

/// Visual look shared by all cards of a reel.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CardStyle {
    /// CSS-style family list, e.g. `"Arial, sans-serif"`.
    pub font_family: String,
    pub font_weight: u16,
    /// Font size for word and outro cards, in pixels.
    pub font_size: f32,
    /// Font size for countdown numbers, in pixels.
    pub countdown_font_size: f32,
    pub text_color: Rgba8,
    pub background: Rgba8,
    /// Horizontal padding used when wrapping long text.
    pub margin_px: u32,
    /// Extra directories scanned for `.ttf`/`.otf`/`.ttc` files.
    pub font_dirs: Vec<PathBuf>,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial, Helvetica, sans-serif".to_owned(),
            font_weight: 700,
            font_size: 140.0,
            countdown_font_size: 180.0,
            text_color: Rgba8::WHITE,
            background: Rgba8::BLACK,
            margin_px: 60,
            font_dirs: Vec::new(),
        }
    }
}

impl CardStyle {
    pub fn font_size_for(&self, kind: CardKind) -> f32 {
        match kind {
            CardKind::Countdown(_) => self.countdown_font_size,
            CardKind::Word(_) | CardKind::Outro => self.font_size,
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("font_size", self.font_size),
            ("countdown_font_size", self.countdown_font_size),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if self.font_family.trim().is_empty() {
            return Err(ReelError::validation("font_family must not be empty"));
        }
        Ok(())
    }
}

pub(crate) fn validate_min_duration(name: &str, secs: f64) -> ReelResult<()> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ReelError::validation(format!(
            "{name} must be finite and non-negative (got {secs})"
        )));
    }
    Ok(())
}

/// Synthesize `text`, measure it, and build a card lasting `max(min_duration_sec, speech)`.
///
/// The speech file lives in its own temporary directory, removed before this returns.
#[tracing::instrument(skip(tts), level = "debug")]
pub fn build_card(
    kind: CardKind,
    text: &str,
    min_duration_sec: f64,
    tts: &dyn SpeechSynth,
) -> ReelResult<Card> {
    validate_min_duration("card duration", min_duration_sec)?;
    let tmp = tempfile::Builder::new()
        .prefix("wordreel-card-")
        .tempdir()
        .context("create temporary directory for speech")?;
    build_card_in(tmp.path(), "speech", kind, text, min_duration_sec, tts)
}

/// Card building against a caller-owned scratch directory.
pub(crate) fn build_card_in(
    dir: &Path,
    file_stem: &str,
    kind: CardKind,
    text: &str,
    min_duration_sec: f64,
    tts: &dyn SpeechSynth,
) -> ReelResult<Card> {
    let audio_path = dir.join(format!("{file_stem}.{}", tts.audio_extension()));
    synthesize_text_audio(tts, text, &audio_path)?;
    let audio = media::load_audio(&audio_path)?;

    let speech_sec = audio.duration_sec();
    let duration_sec = min_duration_sec.max(speech_sec);
    tracing::debug!(?kind, text, speech_sec, duration_sec, "built card");

    Ok(Card {
        kind,
        text: text.to_owned(),
        duration_sec,
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SilenceSynth;
    use std::cell::RefCell;

    #[test]
    fn duration_is_at_least_the_requested_minimum() {
        let card = build_card(CardKind::Word(0), "cat", 1.0, &SilenceSynth::new(0.5)).unwrap();
        assert_eq!(card.text, "cat");
        assert!((card.duration_sec - 1.0).abs() < 1e-9);
        assert!((card.speech_duration_sec() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn long_speech_stretches_the_card() {
        let card = build_card(CardKind::Outro, "bye", 0.25, &SilenceSynth::new(0.75)).unwrap();
        assert!((card.duration_sec - 0.75).abs() < 1e-9);
    }

    #[test]
    fn speech_file_is_gone_after_build() {
        let seen = RefCell::new(None::<PathBuf>);
        let tts = |text: &str, path: &Path| -> anyhow::Result<()> {
            *seen.borrow_mut() = Some(path.to_path_buf());
            SilenceSynth::new(0.1).synthesize(text, path)
        };
        build_card(CardKind::Word(0), "dog", 0.0, &tts).unwrap();

        let path = seen.into_inner().unwrap();
        assert_eq!(path.file_name().unwrap(), "speech.wav");
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn negative_minimum_is_invalid() {
        let err = build_card(CardKind::Word(0), "x", -0.1, &SilenceSynth::new(0.1)).unwrap_err();
        assert!(err.is_validation());
        assert!(build_card(CardKind::Word(0), "x", f64::NAN, &SilenceSynth::new(0.1)).is_err());
    }

    #[test]
    fn style_picks_countdown_font_size() {
        let style = CardStyle::default();
        assert_eq!(style.font_size_for(CardKind::Countdown(3)), 180.0);
        assert_eq!(style.font_size_for(CardKind::Word(0)), 140.0);
        assert!(style.validate().is_ok());
        assert!(
            CardStyle {
                font_size: 0.0,
                ..CardStyle::default()
            }
            .validate()
            .is_err()
        );
    }
}
