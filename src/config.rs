//! Run configuration
//!
//! All paths and parameters of a run come from an optional TOML file plus
//! command-line overrides:
//!
//! ```toml
//! [grid]
//! tile_size = 256
//! area_label = "Nairobi West"
//! axis_order = "row_major"
//!
//! [patches]
//! image_name = "nairobi"
//! output_dir = "patches"
//! compression = "deflate"
//!
//! [vectorize]
//! connectivity = 4
//! min_value = 0
//! downsample = 2.0
//! resampling = "nearest"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RasterError, RasterResult};
use crate::grid::{AxisOrder, GridConfig, DEFAULT_AREA_LABEL, DEFAULT_TILE_SIZE};
use crate::patch::PatchConfig;
use crate::raster::Resampling;
use crate::vectorize::{Connectivity, ValueFilter, VectorizeOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub grid: GridSection,
    pub patches: PatchSection,
    pub vectorize: VectorizeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSection {
    pub tile_size: usize,
    pub area_label: String,
    pub axis_order: String,
    /// Where `grid` writes the tile GeoJSON
    pub output: Option<PathBuf>,
}

impl Default for GridSection {
    fn default() -> Self {
        GridSection {
            tile_size: DEFAULT_TILE_SIZE,
            area_label: DEFAULT_AREA_LABEL.to_string(),
            axis_order: AxisOrder::default().to_string(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchSection {
    /// Defaults to the input file stem
    pub image_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub compression: String,
    pub show_progress: bool,
}

impl Default for PatchSection {
    fn default() -> Self {
        PatchSection {
            image_name: None,
            output_dir: None,
            compression: "none".to_string(),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorizeSection {
    pub connectivity: u8,
    /// Regions with a value at or below this are dropped
    pub min_value: i64,
    /// Downsampling factor; off when unset
    pub downsample: Option<f64>,
    pub resampling: String,
}

impl Default for VectorizeSection {
    fn default() -> Self {
        VectorizeSection {
            connectivity: 4,
            min_value: 0,
            downsample: None,
            resampling: Resampling::default().to_string(),
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> RasterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RasterError::io(path, "read", e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> RasterResult<Self> {
        toml::from_str(text).map_err(|e| RasterError::config(format!("Invalid configuration: {}", e)))
    }

    pub fn load_or_default(path: Option<&Path>) -> RasterResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn grid_config(&self) -> RasterResult<GridConfig> {
        let config = GridConfig {
            tile_size: self.grid.tile_size,
            area_label: self.grid.area_label.clone(),
            axis_order: self.grid.axis_order.parse()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Patch settings; `input` supplies the default image name
    pub fn patch_config(&self, input: &Path) -> RasterResult<PatchConfig> {
        let image_name = match &self.patches.image_name {
            Some(name) => name.clone(),
            None => input.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| RasterError::config(format!("Cannot derive an image name from {}", input.display())))?,
        };
        let output_dir = self.patches.output_dir.clone()
            .ok_or_else(|| RasterError::config("No patch output directory configured"))?;

        let config = PatchConfig {
            tile_size: self.grid.tile_size,
            image_name,
            output_dir,
            compression: self.patches.compression.clone(),
            show_progress: self.patches.show_progress,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn vectorize_options(&self) -> RasterResult<VectorizeOptions> {
        let section = &self.vectorize;
        let mut options = VectorizeOptions::default()
            .with_connectivity(Connectivity::try_from(section.connectivity)?)
            .with_filter(ValueFilter::greater_than(section.min_value));
        if let Some(factor) = section.downsample {
            options = options.with_downsample(factor, section.resampling.parse()?);
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.grid.tile_size, 256);

        let options = config.vectorize_options().unwrap();
        assert_eq!(options.connectivity, Connectivity::Four);
        assert!(options.downsample.is_none());
        assert!(options.filter.keeps(1) && !options.filter.keeps(0));
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            [grid]
            tile_size = 128
            area_label = "Kibera North"
            axis_order = "swapped"

            [patches]
            output_dir = "out/patches"
            compression = "zstd"

            [vectorize]
            connectivity = 8
            min_value = 2
            downsample = 4.0
            resampling = "nearest"
        "#;
        let config = RunConfig::from_toml(text).unwrap();

        let grid = config.grid_config().unwrap();
        assert_eq!(grid.axis_order, AxisOrder::Swapped);
        assert_eq!(grid.tile_id(3), "kibera_north-3");

        let patches = config.patch_config(Path::new("/data/scene_01.tif")).unwrap();
        assert_eq!(patches.image_name, "scene_01");
        assert_eq!(patches.tile_size, 128);
        assert_eq!(patches.patch_path(7), PathBuf::from("out/patches/scene_01_7.tif"));

        let options = config.vectorize_options().unwrap();
        assert_eq!(options.connectivity, Connectivity::Eight);
        assert_eq!(options.downsample, Some((4.0, Resampling::Nearest)));
        assert!(!options.filter.keeps(2));
    }

    #[test]
    fn test_patches_without_label() {
        let config = RunConfig::from_toml("[patches]\noutput_dir = \"x\"").unwrap();
        assert_eq!(config.grid_config().unwrap().tile_id(0), "grid-0");
        assert!(config.patch_config(Path::new("in.tif")).is_ok());

        let config = RunConfig::from_toml("[grid]\narea_label = \"\"").unwrap();
        assert_eq!(config.grid_config().unwrap().tile_id(3), "-3");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(RunConfig::from_toml("[grid]\ntile_sise = 3").is_err());
        let config = RunConfig::from_toml("[vectorize]\nconnectivity = 6").unwrap();
        assert!(config.vectorize_options().is_err());
        assert!(RunConfig::from_toml("[grid]\ntile_size = 0").unwrap().grid_config().is_err());
        assert!(RunConfig::default().patch_config(Path::new("a.tif")).is_err());
    }
}
