//! Reel assembly: countdown, one card per word, optional outro, encoded to MP4.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    audio::mix::{AudioManifest, mix_manifest, write_mix_to_f32le_file},
    card::{Card, CardKind, CardStyle, build_card, validate_min_duration},
    countdown::{DEFAULT_STEP_DURATION_SEC, build_countdown},
    encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts},
    encode::sink::{AudioInputConfig, FrameSink, SinkConfig},
    foundation::core::{Canvas, Fps, FrameIndex},
    foundation::error::{ReelError, ReelResult},
    media::MIX_SAMPLE_RATE,
    render::CardRasterizer,
    speech::SpeechSynth,
    timeline::{Segment, Timeline},
};

pub const DEFAULT_PER_WORD_DURATION_SEC: f64 = 2.0;
pub const DEFAULT_COUNTDOWN_FROM: u32 = 5;
pub const DEFAULT_OUTRO_DURATION_SEC: f64 = 2.0;

/// Tunables for one reel. Every field has a default, so config files may set any subset.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReelOptions {
    /// Minimum on-screen time of each word card, in seconds.
    pub per_word_duration: f64,
    /// First countdown number; the countdown runs down to 1.
    pub countdown_from: u32,
    /// Minimum on-screen time of each countdown number, in seconds.
    pub countdown_step_duration: f64,
    /// Closing card text. `None` or an empty string means no outro.
    pub outro_text: Option<String>,
    /// Minimum on-screen time of the outro card, in seconds.
    pub outro_duration: f64,
    pub size: Canvas,
    pub style: CardStyle,
}

impl Default for ReelOptions {
    fn default() -> Self {
        Self {
            per_word_duration: DEFAULT_PER_WORD_DURATION_SEC,
            countdown_from: DEFAULT_COUNTDOWN_FROM,
            countdown_step_duration: DEFAULT_STEP_DURATION_SEC,
            outro_text: None,
            outro_duration: DEFAULT_OUTRO_DURATION_SEC,
            size: Canvas::default(),
            style: CardStyle::default(),
        }
    }
}

impl ReelOptions {
    pub fn validate(&self) -> ReelResult<()> {
        validate_min_duration("per_word_duration", self.per_word_duration)?;
        validate_min_duration("countdown_step_duration", self.countdown_step_duration)?;
        validate_min_duration("outro_duration", self.outro_duration)?;
        if self.countdown_from == 0 {
            return Err(ReelError::validation("countdown_from must be at least 1"));
        }
        self.size.validate()?;
        self.style.validate()
    }

    /// Outro text when one should be rendered.
    pub fn outro(&self) -> Option<&str> {
        self.outro_text.as_deref().filter(|s| !s.is_empty())
    }
}

/// Frame accounting for one render.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Frames pushed to the sink.
    pub frames_total: u64,
    /// Frames actually rasterized (one per visible card).
    pub frames_rendered: u64,
    /// Frames reused from the card raster.
    pub frames_elided: u64,
    pub cards: usize,
    /// Encoded length, in seconds.
    pub duration_sec: f64,
}

/// Builder for a reel.
///
/// ```no_run
/// use std::path::Path;
/// use wordreel::{ReelBuilder, SilenceSynth};
///
/// let tts = SilenceSynth::new(0.4);
/// ReelBuilder::new()
///     .words(["cat", "dog"])
///     .tts(&tts)
///     .outro("bye")
///     .render(Path::new("out/reel.mp4"))?;
/// # Ok::<(), wordreel::ReelError>(())
/// ```
#[derive(Default)]
pub struct ReelBuilder<'a> {
    words: Vec<String>,
    tts: Option<&'a dyn SpeechSynth>,
    opts: ReelOptions,
}

impl<'a> ReelBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append words, in reel order.
    pub fn words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    pub fn tts(mut self, tts: &'a dyn SpeechSynth) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn options(mut self, opts: ReelOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn per_word_duration(mut self, secs: f64) -> Self {
        self.opts.per_word_duration = secs;
        self
    }

    pub fn countdown_from(mut self, start: u32) -> Self {
        self.opts.countdown_from = start;
        self
    }

    pub fn outro(mut self, text: impl Into<String>) -> Self {
        self.opts.outro_text = Some(text.into());
        self
    }

    pub fn size(mut self, size: Canvas) -> Self {
        self.opts.size = size;
        self
    }

    pub fn style(mut self, style: CardStyle) -> Self {
        self.opts.style = style;
        self
    }

    /// Reject bad input before any speech is synthesized.
    fn validate(&self) -> ReelResult<&'a dyn SpeechSynth> {
        if self.words.is_empty() {
            return Err(ReelError::validation("words must be a non-empty list"));
        }
        let tts = self
            .tts
            .ok_or_else(|| ReelError::validation("a speech synthesizer must be provided"))?;
        self.opts.validate()?;
        Ok(tts)
    }

    /// Synthesize and measure every card without encoding anything.
    #[tracing::instrument(skip(self), fields(words = self.words.len()))]
    pub fn plan(&self) -> ReelResult<ReelPlan> {
        let tts = self.validate()?;
        let opts = &self.opts;

        let mut segments = Vec::with_capacity(self.words.len() + 2);
        segments.push(build_countdown(
            opts.countdown_from,
            opts.countdown_step_duration,
            tts,
        )?);
        for (i, word) in self.words.iter().enumerate() {
            let card = build_card(CardKind::Word(i), word, opts.per_word_duration, tts)?;
            segments.push(Segment::single(card));
        }
        if let Some(outro) = opts.outro() {
            let card = build_card(CardKind::Outro, outro, opts.outro_duration, tts)?;
            segments.push(Segment::single(card));
        }

        let plan = ReelPlan {
            canvas: opts.size,
            fps: Fps::REEL,
            style: opts.style.clone(),
            segments,
        };
        tracing::info!(
            cards = plan.card_count(),
            duration_sec = plan.duration_sec(),
            "reel planned"
        );
        Ok(plan)
    }

    /// Plan and encode to `output_path`, returning that path.
    pub fn render(&self, output_path: impl AsRef<Path>) -> ReelResult<PathBuf> {
        let output_path = output_path.as_ref();
        self.validate()?;
        if output_path.as_os_str().is_empty() {
            return Err(ReelError::validation("output path must not be empty"));
        }
        self.plan()?.render_to_file(output_path)
    }
}

/// Cards of a reel, synthesized and measured, ready to encode.
#[derive(Clone, Debug)]
pub struct ReelPlan {
    pub canvas: Canvas,
    pub fps: Fps,
    pub style: CardStyle,
    /// Countdown first, then one segment per word, then the outro if any.
    pub segments: Vec<Segment>,
}

impl ReelPlan {
    /// All cards in playback order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.segments.iter().flat_map(|s| s.cards().iter())
    }

    pub fn card_count(&self) -> usize {
        self.segments.iter().map(|s| s.cards().len()).sum()
    }

    /// Sum of every card duration, in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.segments.iter().map(Segment::duration_sec).sum()
    }

    pub fn timeline(&self) -> ReelResult<Timeline> {
        Timeline::concat(self.cards(), self.fps, MIX_SAMPLE_RATE)
    }

    /// Stream the reel into `sink`.
    ///
    /// Each card is rasterized once and repeated for its frame range. The soundtrack is mixed
    /// into a temporary raw PCM file that stays alive until the sink has finished.
    pub fn render_to_sink(&self, sink: &mut dyn FrameSink) -> ReelResult<RenderStats> {
        let cards: Vec<&Card> = self.cards().collect();
        let timeline = Timeline::concat(cards.iter().copied(), self.fps, MIX_SAMPLE_RATE)?;
        if timeline.total_frames == 0 {
            return Err(ReelError::validation(
                "reel has zero length: every card lasts less than half a frame",
            ));
        }
        let rasterizer = CardRasterizer::new(self.canvas, self.style.clone())?;

        let manifest = AudioManifest::from_timeline(&timeline, &cards)?;
        let scratch = tempfile::Builder::new()
            .prefix("wordreel-mix-")
            .tempdir()
            .context("create temporary directory for the soundtrack")?;
        let audio = if manifest.segments.is_empty() {
            None
        } else {
            let path = scratch.path().join("soundtrack.f32le");
            write_mix_to_f32le_file(&mix_manifest(&manifest), &path)?;
            Some(AudioInputConfig {
                path,
                sample_rate: manifest.sample_rate,
                channels: manifest.channels,
            })
        };

        sink.begin(SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            audio,
        })?;

        let mut stats = RenderStats {
            cards: cards.len(),
            duration_sec: timeline.duration_sec(),
            ..RenderStats::default()
        };
        for placement in &timeline.placements {
            if placement.frames.is_empty() {
                continue;
            }
            let card = cards[placement.card];
            let frame = rasterizer.rasterize(card.kind, &card.text)?;
            stats.frames_rendered += 1;
            tracing::debug!(kind = ?card.kind, text = %card.text, frames = placement.frames.len_frames(), "encoding card");

            for f in placement.frames.start.0..placement.frames.end.0 {
                sink.push_frame(FrameIndex(f), &frame)?;
            }
            stats.frames_total += placement.frames.len_frames();
        }
        stats.frames_elided = stats.frames_total - stats.frames_rendered;

        sink.end()?;
        drop(scratch);
        Ok(stats)
    }

    /// Encode to an MP4 at `output_path` (30 fps, H.264 + AAC).
    pub fn render_to_file(&self, output_path: &Path) -> ReelResult<PathBuf> {
        let mut opts = FfmpegSinkOpts::new(output_path);
        opts.bg_rgba = self.style.background.to_array();
        let mut sink = FfmpegSink::new(opts);

        let stats = self.render_to_sink(&mut sink)?;
        tracing::info!(
            out = %output_path.display(),
            frames = stats.frames_total,
            cards = stats.cards,
            "reel written"
        );
        Ok(output_path.to_path_buf())
    }
}

/// Render `words` as a spoken reel at `output_path` and return that path.
///
/// Fails with [`ReelError::Validation`] before any synthesis when `words` is empty or `tts` is
/// `None`. Any other failure (synthesis, decoding, encoding, I/O) is returned as-is.
pub fn generate_word_audio_video<S: AsRef<str>>(
    words: &[S],
    output_path: impl AsRef<Path>,
    tts: Option<&dyn SpeechSynth>,
    opts: &ReelOptions,
) -> ReelResult<PathBuf> {
    let builder = ReelBuilder {
        words: words.iter().map(|w| w.as_ref().to_owned()).collect(),
        tts,
        opts: opts.clone(),
    };
    tracing::info!(words = builder.words.len(), "generating word reel");
    builder.render(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sink::InMemorySink;
    use crate::speech::SilenceSynth;

    fn tiny() -> ReelOptions {
        ReelOptions {
            size: Canvas {
                width: 32,
                height: 48,
            },
            style: CardStyle {
                font_size: 10.0,
                countdown_font_size: 12.0,
                margin_px: 2,
                ..CardStyle::default()
            },
            ..ReelOptions::default()
        }
    }

    #[test]
    fn options_reject_bad_numbers() {
        let bad = [
            ReelOptions {
                per_word_duration: -1.0,
                ..ReelOptions::default()
            },
            ReelOptions {
                countdown_from: 0,
                ..ReelOptions::default()
            },
            ReelOptions {
                outro_duration: f64::INFINITY,
                ..ReelOptions::default()
            },
            ReelOptions {
                size: Canvas {
                    width: 1081,
                    height: 1920,
                },
                ..ReelOptions::default()
            },
        ];
        for opts in bad {
            assert!(opts.validate().unwrap_err().is_validation(), "{opts:?}");
        }
        assert!(ReelOptions::default().validate().is_ok());
    }

    #[test]
    fn empty_outro_means_no_outro() {
        let opts = ReelOptions {
            outro_text: Some(String::new()),
            ..ReelOptions::default()
        };
        assert_eq!(opts.outro(), None);
    }

    #[test]
    fn static_cards_are_rasterized_once() {
        let tts = SilenceSynth::new(0.5);
        let plan = ReelBuilder::new()
            .options(tiny())
            .countdown_from(2)
            .per_word_duration(1.0)
            .words(["cat"])
            .tts(&tts)
            .plan()
            .unwrap();

        let mut sink = InMemorySink::new();
        let stats = plan.render_to_sink(&mut sink).unwrap();
        assert_eq!(stats.frames_total, 78);
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(stats.frames_elided, 75);
        assert_eq!(stats.cards, 3);
        assert!((stats.duration_sec - 2.6).abs() < 1e-9);
        assert!(sink.is_ended());
    }

    #[test]
    fn zero_length_reel_is_rejected() {
        let tts = SilenceSynth::new(0.0);
        let plan = ReelBuilder::new()
            .options(ReelOptions {
                countdown_step_duration: 0.0,
                per_word_duration: 0.0,
                ..tiny()
            })
            .countdown_from(1)
            .word("x")
            .tts(&tts)
            .plan()
            .unwrap();
        let err = plan.render_to_sink(&mut InMemorySink::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let opts: ReelOptions =
            serde_json::from_str(r#"{"countdown_from": 3, "outro_text": "bye"}"#).unwrap();
        assert_eq!(opts.countdown_from, 3);
        assert_eq!(opts.outro(), Some("bye"));
        assert_eq!(opts.per_word_duration, DEFAULT_PER_WORD_DURATION_SEC);
        assert!(serde_json::from_str::<ReelOptions>(r#"{"fps": 60}"#).is_err());
    }
}
