//! Concatenation of cards into a single timeline.
//!
//! Cards are placed back to back without gaps. Boundaries are computed from cumulative seconds
//! and rounded to frames once, so the total frame count always matches the summed duration.

use crate::{
    audio::mix::frame_to_sample,
    card::Card,
    foundation::core::{Fps, FrameIndex, FrameRange},
    foundation::error::{ReelError, ReelResult},
};

/// A gap-free run of cards, e.g. the whole countdown.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    cards: Vec<Card>,
}

impl Segment {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn single(card: Card) -> Self {
        Self { cards: vec![card] }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Sum of card durations.
    pub fn duration_sec(&self) -> f64 {
        self.cards.iter().map(|c| c.duration_sec).sum()
    }
}

/// A card placed on the timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Index into the flattened card list.
    pub card: usize,
    pub frames: FrameRange,
    pub start_sec: f64,
    pub start_sample: u64,
    pub end_sample: u64,
}

/// Flattened placement of every card of a reel.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    pub fps: Fps,
    pub sample_rate: u32,
    pub placements: Vec<Placement>,
    pub total_frames: u64,
    pub total_samples: u64,
}

impl Timeline {
    /// Lay out `cards` back to back at `fps`.
    pub fn concat<'a>(
        cards: impl IntoIterator<Item = &'a Card>,
        fps: Fps,
        sample_rate: u32,
    ) -> ReelResult<Self> {
        let mut placements = Vec::new();
        let mut cursor_sec = 0.0f64;
        let mut cursor_frame = 0u64;

        for (i, card) in cards.into_iter().enumerate() {
            if !card.duration_sec.is_finite() || card.duration_sec < 0.0 {
                return Err(ReelError::validation(format!(
                    "card {i} has invalid duration {}",
                    card.duration_sec
                )));
            }
            let start_sec = cursor_sec;
            cursor_sec += card.duration_sec;
            // Cumulative rounding may trim up to half a frame; never trim into the speech.
            let speech_end = cursor_frame + fps.secs_to_frames_ceil(card.speech_duration_sec());
            let end_frame = fps
                .secs_to_frames_round(cursor_sec)
                .max(cursor_frame)
                .max(speech_end);
            let frames = FrameRange::new(FrameIndex(cursor_frame), FrameIndex(end_frame))?;

            placements.push(Placement {
                card: i,
                frames,
                start_sec,
                start_sample: frame_to_sample(cursor_frame, fps, sample_rate),
                end_sample: frame_to_sample(end_frame, fps, sample_rate),
            });
            cursor_frame = end_frame;
        }

        if placements.is_empty() {
            return Err(ReelError::validation("nothing to concatenate: no cards"));
        }

        Ok(Self {
            fps,
            sample_rate,
            total_frames: cursor_frame,
            total_samples: frame_to_sample(cursor_frame, fps, sample_rate),
            placements,
        })
    }

    pub fn duration_sec(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Placement covering frame `f`, if any.
    pub fn placement_at(&self, f: FrameIndex) -> Option<&Placement> {
        self.placements.iter().find(|p| p.frames.contains(f))
    }
}
