use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ReelResult;
use crate::render::FrameRGBA;
use std::path::PathBuf;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional external raw PCM audio file input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that encode sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `push_frame` is called with strictly increasing `FrameIndex` values, starting at 0.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ReelResult<()>;
}

/// In-memory sink for tests and debugging.
///
/// Consecutive identical frames are stored once with a repeat count; a reel is mostly static
/// cards, so this keeps memory proportional to the number of cards.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    runs: Vec<(FrameRGBA, u64)>,
    frames_pushed: u64,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Distinct consecutive frames with how many times each was pushed.
    pub fn runs(&self) -> &[(FrameRGBA, u64)] {
        &self.runs
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.runs.clear();
        self.frames_pushed = 0;
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        if idx.0 != self.frames_pushed {
            return Err(crate::foundation::error::ReelError::encode(format!(
                "in-memory sink expected frame {}, got {}",
                self.frames_pushed, idx.0
            )));
        }
        self.frames_pushed += 1;
        match self.runs.last_mut() {
            Some((last, n)) if last == frame => *n += 1,
            _ => self.runs.push((frame.clone(), 1)),
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.ended = true;
        Ok(())
    }
}
