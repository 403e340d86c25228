/*

Session options
===============

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::glkapi::constants::*;
use crate::output::FontStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} must be an absolute path")]
    RelativePath(&'static str),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GlkOptions {
    /** Where files created by name live */
    pub data_dir: String,
    /** Where the handshake, evaluate and return value files live */
    pub scripting_dir: String,
    pub save_dir: String,
    pub transcript_dir: String,
    /** Project name for file headers, until the story tells us its own */
    pub project: String,
    pub gameid: Option<String>,
    /** How long a written-to file stream may stay dirty before it is written back */
    pub dirty_flush_secs: u64,
    pub style_profile: StyleProfile,
}

impl Default for GlkOptions {
    fn default() -> Self {
        GlkOptions {
            data_dir: "/gamedata".to_string(),
            scripting_dir: "/scripting".to_string(),
            save_dir: "/savefiles".to_string(),
            transcript_dir: "/transcripts".to_string(),
            project: "GLKBRIDGE".to_string(),
            gameid: None,
            dirty_flush_secs: 10,
            style_profile: StyleProfile::default(),
        }
    }
}

impl GlkOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: GlkOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, dir) in [
            ("data_dir", &self.data_dir),
            ("scripting_dir", &self.scripting_dir),
            ("save_dir", &self.save_dir),
            ("transcript_dir", &self.transcript_dir),
        ] {
            if !dir.starts_with('/') {
                return Err(ConfigError::RelativePath(name));
            }
        }
        Ok(())
    }

    /** The directory a fileref of this type lives in */
    pub fn dir_for(&self, filetype: FileType) -> &str {
        match filetype {
            FileType::Data => &self.data_dir,
            FileType::SavedGame => &self.save_dir,
            FileType::Transcript | FileType::InputRecord => &self.transcript_dir,
        }
    }
}

/** Font hints for each of the eleven Glk styles */
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StyleProfile(pub [FontStyle; style_NUMSTYLES as usize]);

impl Default for StyleProfile {
    fn default() -> Self {
        let plain = FontStyle::default();
        let bold = FontStyle {bold: true, ..plain};
        let italic = FontStyle {italic: true, ..plain};
        let mut styles = [plain; style_NUMSTYLES as usize];
        styles[style_Emphasized as usize] = italic;
        styles[style_Preformatted as usize] = FontStyle {proportional: false, ..plain};
        styles[style_Header as usize] = bold;
        styles[style_Subheader as usize] = bold;
        styles[style_Alert as usize] = bold;
        styles[style_Note as usize] = italic;
        styles[style_BlockQuote as usize] = italic;
        styles[style_Input as usize] = bold;
        StyleProfile(styles)
    }
}

impl StyleProfile {
    pub fn get(&self, style: u32) -> FontStyle {
        self.0.get(style as usize).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, style: u32) -> Option<&mut FontStyle> {
        self.0.get_mut(style as usize)
    }
}
