//! Identity extraction: how a tile's acquisition date and a scene's date/name
//! are cut out of file and folder names. Injected into the pipelines so other
//! naming conventions can be plugged in without touching merge/resample logic.
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{DateToken, SceneIdentity};

pub trait IdentityScheme: Send + Sync {
    /// Acquisition date of a tile file
    fn tile_date(&self, tile: &Path) -> Option<DateToken>;

    /// Date and name of a scene directory
    fn scene_identity(&self, scene_dir: &Path) -> Option<SceneIdentity>;
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

// Character slice [start, end) of `s`; None when `s` is too short
fn char_slice(s: &str, start: usize, end: usize) -> Option<String> {
    if s.chars().count() < end {
        return None;
    }
    Some(s.chars().skip(start).take(end - start).collect())
}

/// Fixed-offset naming: tile date = first 8 characters of the file name,
/// scene date = characters 11..19 of the folder name. No date parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOffsetIdentity;

impl FixedOffsetIdentity {
    pub const TILE_DATE: (usize, usize) = (0, 8);
    pub const SCENE_DATE: (usize, usize) = (11, 19);
}

impl IdentityScheme for FixedOffsetIdentity {
    fn tile_date(&self, tile: &Path) -> Option<DateToken> {
        let (start, end) = Self::TILE_DATE;
        char_slice(&file_name(tile)?, start, end).map(DateToken::new)
    }

    fn scene_identity(&self, scene_dir: &Path) -> Option<SceneIdentity> {
        let name = file_name(scene_dir)?;
        let (start, end) = Self::SCENE_DATE;
        let date = char_slice(&name, start, end)?;
        Some(SceneIdentity {
            date: DateToken::new(date),
            name,
        })
    }
}

/// Date = first capture group of a user regex, applied to the file/folder name
#[derive(Debug, Clone)]
pub struct RegexIdentity {
    pattern: Regex,
}

impl RegexIdentity {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)?;
        if pattern.captures_len() < 2 {
            return Err(Error::InvalidArgument {
                arg: "date_pattern",
                value: format!("{} (needs a capture group)", pattern.as_str()),
            });
        }
        Ok(Self { pattern })
    }

    fn capture(&self, name: &str) -> Option<DateToken> {
        self.pattern
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| DateToken::new(m.as_str()))
    }
}

impl IdentityScheme for RegexIdentity {
    fn tile_date(&self, tile: &Path) -> Option<DateToken> {
        self.capture(&file_name(tile)?)
    }

    fn scene_identity(&self, scene_dir: &Path) -> Option<SceneIdentity> {
        let name = file_name(scene_dir)?;
        let date = self.capture(&name)?;
        Some(SceneIdentity { date, name })
    }
}

/// Regex identity when a pattern is given, fixed offsets otherwise
pub fn identity_from_pattern(pattern: Option<&str>) -> Result<Box<dyn IdentityScheme>> {
    Ok(match pattern {
        Some(p) => Box::new(RegexIdentity::new(p)?),
        None => Box::new(FixedOffsetIdentity),
    })
}
