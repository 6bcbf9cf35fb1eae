#![forbid(unsafe_code)]
//! Spoken word-card reels.
//!
//! A reel is a spoken countdown, one full-screen text card per word, and an optional outro,
//! encoded to a 30 fps H.264/AAC MP4 through the system `ffmpeg`. Speech comes from any
//! [`SpeechSynth`]; each card stays on screen for `max(minimum, speech length)`.

pub mod audio;
pub mod card;
pub mod config;
pub mod countdown;
pub mod encode;
pub mod foundation;
pub mod media;
pub mod reel;
pub mod render;
pub mod speech;
pub mod timeline;

pub use card::{Card, CardKind, CardStyle, build_card};
pub use config::ReelConfig;
pub use countdown::build_countdown;
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8};
pub use foundation::error::{ReelError, ReelResult};
pub use media::AudioPcm;
pub use reel::{ReelBuilder, ReelOptions, ReelPlan, RenderStats, generate_word_audio_video};
pub use render::{CardRasterizer, FrameRGBA};
pub use speech::{CommandSynth, SilenceSynth, SpeechSynth};
pub use timeline::{Placement, Segment, Timeline};
