use std::{
    io::Write as _,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    foundation::error::{ReelError, ReelResult},
    speech::SpeechSynth,
};

const TEXT_PLACEHOLDER: &str = "{text}";
const OUT_PLACEHOLDER: &str = "{out}";

/// Runs an external TTS program once per card.
///
/// The command is a shell-like template split with `shlex`; `{text}` and `{out}` are replaced
/// per argument, e.g. `espeak-ng -w {out} {text}`. With `text_on_stdin` the text is piped to
/// the program instead (`piper --model en.onnx --output_file {out}`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSynth {
    program: String,
    args: Vec<String>,
    text_on_stdin: bool,
    extension: String,
}

impl CommandSynth {
    /// Parse a command template.
    pub fn from_template(template: &str) -> ReelResult<Self> {
        let mut parts = shlex::split(template).ok_or_else(|| {
            ReelError::validation(format!("tts command has invalid quoting: {template}"))
        })?;
        if parts.is_empty() {
            return Err(ReelError::validation("tts command must not be empty"));
        }
        let program = parts.remove(0);
        if !parts.iter().any(|a| a.contains(OUT_PLACEHOLDER)) {
            return Err(ReelError::validation(format!(
                "tts command must reference the output path as {OUT_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            program,
            args: parts,
            text_on_stdin: false,
            extension: "wav".to_owned(),
        })
    }

    /// Pipe the text on stdin instead of (or in addition to) `{text}` substitution.
    pub fn text_on_stdin(mut self, on: bool) -> Self {
        self.text_on_stdin = on;
        self
    }

    /// Extension of the file the program writes (`wav`, `mp3`, ...).
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into().trim_start_matches('.').to_owned();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one invocation, placeholders substituted.
    pub fn expand_args(&self, text: &str, out_path: &Path) -> Vec<String> {
        let out = out_path.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(OUT_PLACEHOLDER, &out).replace(TEXT_PLACEHOLDER, text))
            .collect()
    }
}

impl SpeechSynth for CommandSynth {
    fn synthesize(&self, text: &str, out_path: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.expand_args(text, out_path))
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if self.text_on_stdin {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn tts program '{}'", self.program))?;

        if self.text_on_stdin {
            let mut stdin = child
                .stdin
                .take()
                .context("failed to open tts program stdin")?;
            stdin.write_all(text.as_bytes())?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for tts program '{}'", self.program))?;
        if !output.status.success() {
            anyhow::bail!(
                "tts program '{}' exited with status {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn audio_extension(&self) -> &str {
        &self.extension
    }
}
