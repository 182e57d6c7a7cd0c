//! # Pipeline configuration
//!
//! YAML configuration for the predictor-preparation pipeline. Every field has
//! a default, so an empty file (or no file at all) yields the North Atlantic
//! setup: 10 km grain, bio01–bio19 compressed to two components, elevation
//! and tree cover appended.
//!
//! ## Search path
//!
//! 1. Path in the `NICHEPREP_CONFIG` environment variable
//! 2. `./nicheprep.yaml`
//!
//! ## Example
//!
//! ```yaml
//! grain_size: 10000
//! mean_scale: 1000
//! units: degrees
//! region: [-80.0, 0.0, 10.0, 60.0]
//! pca_bands: [bio01, bio04, bio12, bio15]
//! retained_components: 2
//! max_pixels: 1000000000
//! seed: 42
//! ```

use crate::error::{Error, Result};
use crate::vector::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metres per degree of arc at the equator
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Environment variable holding an explicit config path
pub const CONFIG_ENV: &str = "NICHEPREP_CONFIG";

/// Units of the input grids' coordinate reference system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Geographic longitude/latitude (EPSG:4326)
    #[default]
    Degrees,
    /// Projected metres
    Metres,
}

impl Units {
    /// Convert a ground distance in metres into CRS units
    pub fn metres_to_crs(&self, metres: f64) -> f64 {
        match self {
            Units::Degrees => metres / METRES_PER_DEGREE,
            Units::Metres => metres,
        }
    }
}

/// Mask cells where `band > greater_than` is false
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandMaskConfig {
    pub band: String,
    pub greater_than: f64,
}

impl Default for LandMaskConfig {
    fn default() -> Self {
        Self {
            band: "elevation".into(),
            greater_than: 0.0,
        }
    }
}

/// Configuration of one pipeline run, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deduplication, PCA and sampling resolution in metres
    pub grain_size: f64,
    /// Resolution of the centering mean, in metres
    pub mean_scale: f64,
    /// CRS units of the input grids
    pub units: Units,
    /// Analysis bounding box: min_x, min_y, max_x, max_y
    pub region: [f64; 4],
    /// Bands compressed by PCA
    pub pca_bands: Vec<String>,
    /// Raw bands appended to the predictor stack
    pub extra_predictors: Vec<String>,
    /// Optional land mask applied before clipping
    pub land_mask: Option<LandMaskConfig>,
    /// Pixel budget of every region reduction
    pub max_pixels: u64,
    /// Leading components kept in the predictor stack
    pub retained_components: usize,
    /// Seed for a random (but reproducible) deduplication representative
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grain_size: 10_000.0,
            mean_scale: 1_000.0,
            units: Units::Degrees,
            region: [-80.0, 0.0, 10.0, 60.0],
            pca_bands: (1..=19).map(|i| format!("bio{:02}", i)).collect(),
            extra_predictors: vec!["elevation".into(), "Percent_Tree_Cover".into()],
            land_mask: Some(LandMaskConfig::default()),
            max_pixels: 1_000_000_000,
            retained_components: 2,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Load from `NICHEPREP_CONFIG` or `./nicheprep.yaml`, else defaults
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }
        let local = PathBuf::from("./nicheprep.yaml");
        if local.exists() {
            return Self::load_from(&local);
        }
        Ok(Self::default())
    }

    /// Load and validate a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse and validate YAML text
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("grain_size", self.grain_size), ("mean_scale", self.mean_scale)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.pca_bands.is_empty() {
            return Err(Error::Config("pca_bands must name at least one band".into()));
        }
        if self.retained_components == 0 {
            return Err(Error::Config("retained_components must be at least 1".into()));
        }
        if self.retained_components > self.pca_bands.len() {
            return Err(Error::Config(format!(
                "retained_components ({}) exceeds the number of PCA bands ({})",
                self.retained_components,
                self.pca_bands.len()
            )));
        }
        if self.max_pixels == 0 {
            return Err(Error::Config("max_pixels must be positive".into()));
        }
        self.region()?;
        Ok(())
    }

    /// Analysis region as a polygon
    pub fn region(&self) -> Result<Region> {
        let [min_x, min_y, max_x, max_y] = self.region;
        Region::bbox(min_x, min_y, max_x, max_y)
    }

    /// Grain size in CRS units
    pub fn grain(&self) -> f64 {
        self.units.metres_to_crs(self.grain_size)
    }

    /// Centering scale in CRS units
    pub fn mean_resolution(&self) -> f64 {
        self.units.metres_to_crs(self.mean_scale)
    }

    /// Names of the retained components: `pc1..pck`
    pub fn retained_names(&self) -> Vec<String> {
        (1..=self.retained_components).map(|i| format!("pc{}", i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.pca_bands.len(), 19);
        assert_eq!(config.pca_bands[0], "bio01");
        assert_eq!(config.pca_bands[18], "bio19");
        assert_eq!(config.retained_names(), vec!["pc1", "pc2"]);
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.grain(), 10_000.0 / METRES_PER_DEGREE);
    }

    #[test]
    fn test_metres_to_crs() {
        assert_relative_eq!(Units::Degrees.metres_to_crs(METRES_PER_DEGREE), 1.0);
        assert_relative_eq!(Units::Metres.metres_to_crs(2500.0), 2500.0);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = PipelineConfig::parse(
            "grain_size: 5000\nunits: metres\npca_bands: [bio01, bio12]\nseed: 7\n",
        )
        .unwrap();
        assert_relative_eq!(config.grain(), 5000.0);
        assert_eq!(config.pca_bands, vec!["bio01", "bio12"]);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.retained_components, 2);
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(PipelineConfig::parse("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::parse("grain_size: -1").is_err());
        assert!(PipelineConfig::parse("pca_bands: [bio01]\nretained_components: 2").is_err());
        assert!(PipelineConfig::parse("region: [10, 0, -80, 60]").is_err());
        assert!(PipelineConfig::parse("grain_size: [oops]").is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = PipelineConfig {
            seed: Some(3),
            land_mask: None,
            ..PipelineConfig::default()
        };
        let parsed = PipelineConfig::parse(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
