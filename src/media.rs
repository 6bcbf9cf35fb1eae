use std::{io::Read as _, path::Path};

use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of the mixed soundtrack handed to the encoder.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Decoded audio, interleaved `f32` samples in `[-1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    /// Playback length in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.frames() as f64) / f64::from(self.sample_rate)
    }
}

/// Load an audio file into memory.
///
/// PCM WAV files are read natively; anything else (mp3, ogg, exotic WAV codecs) is decoded by
/// the system `ffmpeg` to stereo at [`MIX_SAMPLE_RATE`].
pub fn load_audio(path: &Path) -> ReelResult<AudioPcm> {
    if is_riff_wave(path)? {
        match read_wav(path) {
            Ok(pcm) => return Ok(pcm),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "native wav read failed, falling back to ffmpeg");
            }
        }
    }
    decode_audio_f32_stereo(path, MIX_SAMPLE_RATE)
}

fn is_riff_wave(path: &Path) -> ReelResult<bool> {
    let mut f = std::fs::File::open(path).map_err(|e| {
        ReelError::media(format!("failed to open audio '{}': {e}", path.display()))
    })?;
    let mut header = [0u8; 12];
    match f.read_exact(&mut header) {
        Ok(()) => Ok(&header[0..4] == b"RIFF" && &header[8..12] == b"WAVE"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(ReelError::media(format!(
            "failed to read audio '{}': {e}",
            path.display()
        ))),
    }
}

fn read_wav(path: &Path) -> Result<AudioPcm, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved_f32 = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / ((1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32,
    })
}

/// Decode any ffmpeg-readable file to interleaved stereo `f32` at `sample_rate`.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // A file without an audio stream decodes as silence of length zero.
        if msg.contains("matches no streams") || msg.contains("does not contain any stream") {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(ReelError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ReelError::media(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let interleaved_f32 = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, spec: hound::WavSpec, frames: u32) {
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * u32::from(spec.channels) {
            let v = if i % 2 == 0 { i16::MAX } else { i16::MIN };
            w.write_sample(v).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn wav_is_read_natively_with_source_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, 11_025);

        let pcm = load_audio(&path).unwrap();
        assert_eq!(pcm.sample_rate, 22_050);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.frames(), 11_025);
        assert!((pcm.duration_sec() - 0.5).abs() < 1e-9);
        assert!(pcm.interleaved_f32[0] > 0.99);
        assert!(pcm.interleaved_f32[1] <= -1.0 + 1e-6);
    }

    #[test]
    fn missing_file_is_media_error() {
        let err = load_audio(Path::new("definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, ReelError::Media(_)));
    }

    #[test]
    fn duration_of_channelless_pcm_is_zero() {
        let pcm = AudioPcm {
            sample_rate: 48_000,
            channels: 0,
            interleaved_f32: vec![0.0; 8],
        };
        assert_eq!(pcm.frames(), 0);
        assert_eq!(pcm.duration_sec(), 0.0);
    }
}
