//! Ordered tile collections and their GeoJSON form

use geo_types::Polygon;
use log::info;
use std::path::Path;

use crate::coordinate::CoordinateSystem;
use crate::error::RasterResult;
use crate::grid::Tile;
use crate::vector::{VectorFeature, VectorLayer};

/// Tiles in enumeration order, tagged with the source raster's CRS
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileCollection {
    pub tiles: Vec<Tile>,
    pub crs: CoordinateSystem,
}

impl TileCollection {
    pub fn new(tiles: Vec<Tile>, crs: CoordinateSystem) -> Self {
        TileCollection { tiles, crs }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.id == id)
    }

    /// Footprints in collection order
    pub fn footprints(&self) -> Vec<Polygon<f64>> {
        self.tiles.iter().map(|tile| tile.footprint.clone()).collect()
    }

    pub fn to_layer(&self) -> VectorLayer {
        let mut layer = VectorLayer::new(self.crs.clone());
        for tile in &self.tiles {
            layer.push(
                VectorFeature::new(tile.footprint.clone())
                    .with_property("id", tile.id.clone())
                    .with_property("index", tile.index),
            );
        }
        layer
    }

    /// Writes the footprints with their `id` and `index` as GeoJSON
    pub fn save(&self, path: impl AsRef<Path>) -> RasterResult<()> {
        let path = path.as_ref();
        self.to_layer().save(path)?;
        info!("Saved {} tile footprints to {}", self.len(), path.display());
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TileCollection {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}
