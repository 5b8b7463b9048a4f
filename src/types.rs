//! Shared types and enums used across sentimosaic.
//! Includes `ResolutionClass` (native Sentinel-2 band folders), `ExistingPolicy`,
//! `DateToken` and `SceneIdentity`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Native resolution class of a Sentinel-2 band, i.e. the `IMG_DATA` subfolder it lives in.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum ResolutionClass {
    R10m,
    R20m,
}

impl ResolutionClass {
    const TEN_METRE_BANDS: [&'static str; 4] = ["B02", "B03", "B04", "B08"];

    /// Resolution class a band is looked up in. Everything outside the
    /// 10 m set is read from the 20 m folder.
    pub fn for_band(band: &str) -> Self {
        if Self::TEN_METRE_BANDS.contains(&band) {
            ResolutionClass::R10m
        } else {
            ResolutionClass::R20m
        }
    }

    pub fn folder(&self) -> &'static str {
        match self {
            ResolutionClass::R10m => "R10m",
            ResolutionClass::R20m => "R20m",
        }
    }

    /// File name suffix used inside the folder (`*_B02_10m.jp2`)
    pub fn suffix(&self) -> &'static str {
        match self {
            ResolutionClass::R10m => "10m",
            ResolutionClass::R20m => "20m",
        }
    }
}

impl std::fmt::Display for ResolutionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.folder())
    }
}

/// What to do when a date mosaic is already present in the output directory
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPolicy {
    #[default]
    Skip,
    Overwrite,
}

impl std::fmt::Display for ExistingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExistingPolicy::Skip => write!(f, "skip"),
            ExistingPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Acquisition date token as cut from a file or folder name.
///
/// The token is kept verbatim; it is only interpreted as a calendar date
/// for display.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct DateToken(String);

impl DateToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date when the token is in `YYYYMMDD` form
    pub fn as_date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::parse_from_str(&self.0, "%Y%m%d").ok()
    }
}

impl std::fmt::Display for DateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Date and name of a scene directory; determines its output file name.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SceneIdentity {
    pub date: DateToken,
    pub name: String,
}

impl SceneIdentity {
    /// `<date>_<name>.tif`, the durable "done" marker of a scene
    pub fn output_file_name(&self) -> String {
        format!("{}_{}.tif", self.date, self.name)
    }
}
