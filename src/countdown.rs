use anyhow::Context as _;

use crate::{
    card::{CardKind, build_card_in, validate_min_duration},
    foundation::error::{ReelError, ReelResult},
    speech::SpeechSynth,
    timeline::Segment,
};

/// Default minimum on-screen time of one countdown number.
pub const DEFAULT_STEP_DURATION_SEC: f64 = 0.8;

/// Build the spoken countdown `start, start - 1, ..., 1` as one segment.
///
/// Every step follows the card duration policy (`max(per_step_duration_sec, speech)`); all
/// speech files share one temporary directory that is removed before this returns.
#[tracing::instrument(skip(tts), level = "debug")]
pub fn build_countdown(
    start: u32,
    per_step_duration_sec: f64,
    tts: &dyn SpeechSynth,
) -> ReelResult<Segment> {
    if start == 0 {
        return Err(ReelError::validation("countdown must start at 1 or higher"));
    }
    validate_min_duration("countdown step duration", per_step_duration_sec)?;

    let tmp = tempfile::Builder::new()
        .prefix("wordreel-countdown-")
        .tempdir()
        .context("create temporary directory for countdown speech")?;

    let cards = (1..=start)
        .rev()
        .map(|n| {
            let label = n.to_string();
            build_card_in(
                tmp.path(),
                &label,
                CardKind::Countdown(n),
                &label,
                per_step_duration_sec,
                tts,
            )
        })
        .collect::<ReelResult<Vec<_>>>()?;

    Ok(Segment::new(cards))
}
