use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ExistingPolicy;

/// Date-mosaic parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicParams {
    /// Maximum number of inputs handed to a single merge call
    pub block_size: usize,
    pub nodata: f64,
    /// Target CRS identifier, e.g. `EPSG:32633`
    pub target_crs: String,
    /// Extension of the input tiles
    pub extension: String,
    pub on_existing: ExistingPolicy,
}

impl Default for MosaicParams {
    fn default() -> Self {
        Self {
            block_size: 10,
            nodata: 0.0,
            target_crs: "EPSG:32633".to_string(),
            extension: "tif".to_string(),
            on_existing: ExistingPolicy::Skip,
        }
    }
}

impl MosaicParams {
    pub fn validate(&self) -> Result<()> {
        if self.block_size < 2 {
            return Err(Error::InvalidArgument {
                arg: "block_size",
                value: self.block_size.to_string(),
            });
        }
        if self.target_crs.trim().is_empty() {
            return Err(Error::InvalidArgument {
                arg: "target_crs",
                value: self.target_crs.clone(),
            });
        }
        Ok(())
    }
}

/// Scene resampling parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    /// Band identifiers in output order
    pub bands: Vec<String>,
    /// Target pixel size in CRS units
    pub resolution: f64,
    /// Band workers per scene
    pub max_workers: usize,
    /// Staging file count that triggers a flush into the final directory
    pub max_staged_files: usize,
    /// Delete a scene's input directory once its output is known to exist
    pub delete_processed: bool,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            bands: [
                "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B11", "B12",
            ]
            .iter()
            .map(|b| b.to_string())
            .collect(),
            resolution: 10.0,
            max_workers: 10,
            max_staged_files: 10,
            delete_processed: false,
        }
    }
}

impl ResampleParams {
    pub fn validate(&self) -> Result<()> {
        if self.bands.is_empty() {
            return Err(Error::InvalidArgument {
                arg: "bands",
                value: String::new(),
            });
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "resolution",
                value: self.resolution.to_string(),
            });
        }
        if self.max_workers == 0 {
            return Err(Error::InvalidArgument {
                arg: "max_workers",
                value: "0".to_string(),
            });
        }
        if self.max_staged_files == 0 {
            return Err(Error::InvalidArgument {
                arg: "max_staged_files",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Load a JSON parameter file; missing fields take their defaults
pub fn load_params<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
