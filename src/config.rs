//! JSON reel configuration.
//!
//! ```json
//! {
//!   "words": ["cat", "dog"],
//!   "output": "out/reel.mp4",
//!   "options": {
//!     "countdown_from": 3,
//!     "outro_text": "see you",
//!     "style": { "background": "#101820", "text_color": "#FEE715" }
//!   }
//! }
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{
    foundation::error::{ReelError, ReelResult},
    reel::ReelOptions,
};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReelConfig {
    pub words: Vec<String>,
    pub output: Option<PathBuf>,
    pub options: ReelOptions,
}

impl ReelConfig {
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        serde_json::from_str(s).map_err(|e| ReelError::serde(format!("parse reel config: {e}")))
    }

    pub fn from_json_path(path: &Path) -> ReelResult<Self> {
        let f = File::open(path).map_err(|e| {
            ReelError::serde(format!("open reel config '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            ReelError::serde(format!("parse reel config '{}': {e}", path.display()))
        })
    }

    pub fn to_json_pretty(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReelError::serde(e.to_string()))
    }
}

/// Words from a text file: one per line, blank lines and `#` comments skipped.
pub fn read_words_file(path: &Path) -> ReelResult<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ReelError::validation(format!("read words '{}': {e}", path.display())))?;
    Ok(parse_word_lines(&text))
}

pub(crate) fn parse_word_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgba8;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = ReelConfig::from_json_str(
            r##"{"words":["a","b"],"options":{"style":{"background":"#102030"}}}"##,
        )
        .unwrap();
        assert_eq!(cfg.words, vec!["a", "b"]);
        assert_eq!(cfg.output, None);
        assert_eq!(cfg.options.style.background, Rgba8::opaque(0x10, 0x20, 0x30));
        assert_eq!(cfg.options.countdown_from, ReelOptions::default().countdown_from);
    }

    #[test]
    fn unknown_keys_are_serde_errors() {
        let err = ReelConfig::from_json_str(r#"{"wordz":[]}"#).unwrap_err();
        assert!(matches!(err, ReelError::Serde(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn config_survives_pretty_json() {
        let cfg = ReelConfig {
            words: vec!["cat".into()],
            output: Some("out.mp4".into()),
            options: ReelOptions {
                outro_text: Some("bye".into()),
                ..ReelOptions::default()
            },
        };
        let back = ReelConfig::from_json_str(&cfg.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn word_lines_skip_blanks_and_comments() {
        let words = parse_word_lines("cat\n\n  # animals\n dog \r\nbird");
        assert_eq!(words, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReelConfig::from_json_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
