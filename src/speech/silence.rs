use std::path::Path;

use anyhow::Context as _;

use crate::speech::SpeechSynth;

/// Writes a silent mono PCM WAV of fixed length, whatever the text.
///
/// Useful for dry runs (check timing and layout without a TTS engine) and for tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilenceSynth {
    pub duration_sec: f64,
    pub sample_rate: u32,
}

impl SilenceSynth {
    pub fn new(duration_sec: f64) -> Self {
        Self {
            duration_sec,
            sample_rate: 16_000,
        }
    }
}

impl SpeechSynth for SilenceSynth {
    fn synthesize(&self, _text: &str, out_path: &Path) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.duration_sec.is_finite() && self.duration_sec >= 0.0,
            "silence duration must be finite and non-negative"
        );
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let frames = (self.duration_sec * f64::from(self.sample_rate)).round() as u64;

        let mut writer = hound::WavWriter::create(out_path, spec)
            .with_context(|| format!("create wav '{}'", out_path.display()))?;
        for _ in 0..frames {
            writer.write_sample(0i16)?;
        }
        writer
            .finalize()
            .with_context(|| format!("finalize wav '{}'", out_path.display()))?;
        Ok(())
    }
}
