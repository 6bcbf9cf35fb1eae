use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::FrameRGBA;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};

/// H.264 encoder used for every reel.
pub const VIDEO_CODEC: &str = "libx264";
/// AAC encoder used for every reel.
pub const AUDIO_CODEC: &str = "aac";
/// Worker threads handed to the encoder.
pub const ENCODE_THREADS: u32 = 4;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Encoder executable, `ffmpeg` from `PATH` by default.
    pub program: PathBuf,
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    pub video_codec: String,
    pub audio_codec: String,
    pub threads: u32,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            video_codec: VIDEO_CODEC.to_owned(),
            audio_codec: AUDIO_CODEC.to_owned(),
            threads: ENCODE_THREADS,
        }
    }

    /// Full `ffmpeg` argument list for `cfg` (everything after the program name).
    pub fn ffmpeg_args(&self, cfg: &SinkConfig) -> Vec<String> {
        let mut args = Vec::<String>::new();
        args.push(if self.overwrite { "-y" } else { "-n" }.to_owned());

        // Input: raw RGBA8 frames on stdin, flattened to opaque before writing.
        args.extend(
            [
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
            ]
            .map(str::to_owned),
        );
        args.push(format!("{}x{}", cfg.width, cfg.height));
        // For rawvideo input, `-r` goes before `-i`.
        args.push("-r".to_owned());
        args.push(fps_arg(cfg.fps));
        args.extend(["-i", "pipe:0"].map(str::to_owned));

        if let Some(audio) = cfg.audio.as_ref() {
            args.extend(["-f", "f32le", "-ar"].map(str::to_owned));
            args.push(audio.sample_rate.to_string());
            args.push("-ac".to_owned());
            args.push(audio.channels.to_string());
            args.push("-i".to_owned());
            args.push(audio.path.to_string_lossy().into_owned());
        }

        args.push("-c:v".to_owned());
        args.push(self.video_codec.clone());
        args.extend(["-pix_fmt", "yuv420p"].map(str::to_owned));
        if cfg.audio.is_some() {
            args.push("-c:a".to_owned());
            args.push(self.audio_codec.clone());
            args.push("-shortest".to_owned());
        } else {
            args.push("-an".to_owned());
        }
        args.push("-threads".to_owned());
        args.push(self.threads.to_string());
        args.extend(["-movflags", "+faststart"].map(str::to_owned));
        args.push(self.out_path.to_string_lossy().into_owned());
        args
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
///
/// Audio is optional and provided through `SinkConfig.audio`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if let Some(audio) = cfg.audio.as_ref()
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(ReelError::validation(
                "audio sample_rate/channels must be non-zero when audio is enabled",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_program_runnable(&self.opts.program) {
            return Err(ReelError::encode(format!(
                "ffmpeg is required for MP4 encoding, but '{}' could not be run",
                self.opts.program.display()
            )));
        }

        let args = self.opts.ffmpeg_args(&cfg);
        tracing::debug!(program = %self.opts.program.display(), ?args, "spawning ffmpeg");
        let mut child = Command::new(&self.opts.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReelError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(ReelError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.opts.bg_rgba,
        )?;

        use std::io::Write as _;
        let written = match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(&self.scratch),
            None => return Err(ReelError::encode("ffmpeg sink is already finalized")),
        };
        if let Err(e) = written {
            return Err(self.write_failure(e));
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let (status, stderr_bytes) = self.finish_child()?;
        self.cfg = None;
        if !status.success() {
            return Err(exit_error(status, &stderr_bytes));
        }
        Ok(())
    }
}

impl FfmpegSink {
    /// Close stdin, wait for ffmpeg and collect everything it wrote to stderr.
    fn finish_child(&mut self) -> ReelResult<(ExitStatus, Vec<u8>)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| ReelError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        Ok((status, stderr_bytes))
    }

    /// A failed stdin write usually means ffmpeg already quit; report its own message.
    fn write_failure(&mut self, write_err: std::io::Error) -> ReelError {
        self.cfg = None;
        match self.finish_child() {
            Ok((status, stderr_bytes)) if !status.success() => exit_error(status, &stderr_bytes),
            _ => ReelError::encode(format!("failed to write frame to ffmpeg stdin: {write_err}")),
        }
    }
}

fn exit_error(status: ExitStatus, stderr_bytes: &[u8]) -> ReelError {
    let stderr = String::from_utf8_lossy(stderr_bytes);
    ReelError::encode(format!(
        "ffmpeg exited with status {}: {}",
        status,
        stderr.trim()
    ))
}

fn fps_arg(fps: Fps) -> String {
    format!("{}/{}", fps.num, fps.den)
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;
        let (r, g, b) = if src_is_premul {
            (
                s[0] as u16 + mul_div255(bg_r, inv),
                s[1] as u16 + mul_div255(bg_g, inv),
                s[2] as u16 + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv),
                mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv),
                mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_runnable(Path::new("ffmpeg"))
}

fn is_program_runnable(program: &Path) -> bool {
    std::process::Command::new(program)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
