//! JSON presets.
//!
//! A preset is validated completely before it is returned, so a failed load
//! never leaves a half-applied pattern behind. Structural problems (unknown or
//! missing fields, values breaking pattern invariants) are `Integrity` errors.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arpline_types::{NoteDatum, Pattern, PatternNote};

pub const PRESET_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("preset integrity error: {0}")]
    Integrity(String),

    #[error("preset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preset is not valid JSON: {0}")]
    Parse(serde_json::Error),
}

impl PresetError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, PresetError::Integrity(_))
    }
}

impl From<serde_json::Error> for PresetError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Data => PresetError::Integrity(e.to_string()),
            _ => PresetError::Parse(e),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PresetFile {
    version: u32,
    timebase: u32,
    loop_length: i64,
    loop_start: i64,
    loop_end: i64,
    notes: Vec<PresetNote>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PresetNote {
    input: i32,
    velocity: f32,
    pan: f32,
    start: i64,
    end: i64,
}

impl From<&Pattern> for PresetFile {
    fn from(pattern: &Pattern) -> Self {
        Self {
            version: PRESET_VERSION,
            timebase: pattern.timebase,
            loop_length: pattern.loop_length,
            loop_start: pattern.loop_start,
            loop_end: pattern.loop_end,
            notes: pattern
                .notes
                .iter()
                .map(|n| PresetNote {
                    input: n.data.input_index,
                    velocity: n.data.velocity,
                    pan: n.data.pan,
                    start: n.start_tick,
                    end: n.end_tick,
                })
                .collect(),
        }
    }
}

impl PresetFile {
    fn into_pattern(self) -> Result<Pattern, PresetError> {
        if self.version != PRESET_VERSION {
            return Err(PresetError::Integrity(format!(
                "unsupported preset version {}",
                self.version
            )));
        }
        if self.timebase == 0 {
            return Err(PresetError::Integrity("timebase must be positive".into()));
        }
        if self.loop_length < 1 {
            return Err(PresetError::Integrity(format!(
                "loop length {} must be at least 1",
                self.loop_length
            )));
        }

        let mut notes = Vec::with_capacity(self.notes.len());
        for (i, n) in self.notes.into_iter().enumerate() {
            if n.start < 0 || n.end <= n.start {
                return Err(PresetError::Integrity(format!(
                    "note {} has invalid range [{}, {})",
                    i, n.start, n.end
                )));
            }
            if !(0.0..=1.0).contains(&n.velocity) {
                return Err(PresetError::Integrity(format!(
                    "note {} velocity {} out of range",
                    i, n.velocity
                )));
            }
            if !(-1.0..=1.0).contains(&n.pan) {
                return Err(PresetError::Integrity(format!(
                    "note {} pan {} out of range",
                    i, n.pan
                )));
            }
            notes.push(PatternNote::new(
                NoteDatum {
                    input_index: n.input,
                    velocity: n.velocity,
                    pan: n.pan,
                },
                n.start,
                n.end,
            ));
        }

        Ok(Pattern {
            timebase: self.timebase,
            loop_length: self.loop_length,
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            notes,
        })
    }
}

pub fn preset_to_string(pattern: &Pattern) -> Result<String, PresetError> {
    Ok(serde_json::to_string_pretty(&PresetFile::from(pattern))?)
}

pub fn preset_from_str(s: &str) -> Result<Pattern, PresetError> {
    let file: PresetFile = serde_json::from_str(s)?;
    file.into_pattern()
}

pub fn save_preset(path: &Path, pattern: &Pattern) -> Result<(), PresetError> {
    let json = preset_to_string(pattern)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)?;
    log::info!(target: "preset", "saved {} notes to {}", pattern.notes.len(), path.display());
    Ok(())
}

pub fn load_preset(path: &Path) -> Result<Pattern, PresetError> {
    let contents = fs::read_to_string(path)?;
    let pattern = preset_from_str(&contents)?;
    log::info!(target: "preset", "loaded {} notes from {}", pattern.notes.len(), path.display());
    Ok(pattern)
}
