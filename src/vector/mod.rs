//! GeoJSON vector output and input
//!
//! Tile grids and vectorized regions are written as GeoJSON feature
//! collections. The coordinate system travels in a legacy named `crs` member
//! (`{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32737"}}`)
//! since the features are generally not in WGS 84.

use geo_types::{Coord, LineString, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use log::debug;
use serde_json::{json, Map, Value as JsonValue};
use std::path::Path;

use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory};
use crate::error::{RasterError, RasterResult};

/// A polygon with its attribute table row
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub geometry: Polygon<f64>,
    pub properties: Map<String, JsonValue>,
}

impl VectorFeature {
    pub fn new(geometry: Polygon<f64>) -> Self {
        VectorFeature { geometry, properties: Map::new() }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }
}

/// An ordered set of polygon features sharing one coordinate system
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorLayer {
    pub features: Vec<VectorFeature>,
    pub crs: CoordinateSystem,
}

impl VectorLayer {
    pub fn new(crs: CoordinateSystem) -> Self {
        VectorLayer { features: Vec::new(), crs }
    }

    pub fn push(&mut self, feature: VectorFeature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Geometries in feature order
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        self.features.iter().map(|feature| feature.geometry.clone()).collect()
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self.features.iter()
            .map(|feature| Feature {
                bbox: None,
                geometry: Some(Geometry::new(polygon_to_value(&feature.geometry))),
                id: None,
                properties: Some(feature.properties.clone()),
                foreign_members: None,
            })
            .collect();

        let foreign_members = self.crs.to_urn().map(|name| {
            let mut members = Map::new();
            members.insert("crs".to_string(), json!({
                "type": "name",
                "properties": { "name": name }
            }));
            members
        });

        FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        }
    }

    pub fn from_geojson(collection: FeatureCollection) -> RasterResult<Self> {
        let crs = match collection.foreign_members.as_ref().and_then(|members| members.get("crs")) {
            Some(crs) => parse_crs_member(crs)?,
            None => CoordinateSystem::Undefined,
        };

        let mut layer = VectorLayer::new(crs);
        for (index, feature) in collection.features.into_iter().enumerate() {
            let geometry = feature.geometry
                .ok_or_else(|| RasterError::Vector(format!("Feature {} has no geometry", index)))?;
            let polygon = value_to_polygon(&geometry.value)
                .map_err(|e| RasterError::Vector(format!("Feature {}: {}", index, e)))?;
            layer.push(VectorFeature {
                geometry: polygon,
                properties: feature.properties.unwrap_or_default(),
            });
        }
        Ok(layer)
    }

    pub fn to_geojson_string(&self) -> RasterResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Writes the layer as a GeoJSON file
    pub fn save(&self, path: impl AsRef<Path>) -> RasterResult<()> {
        let path = path.as_ref();
        let text = self.to_geojson_string()?;
        std::fs::write(path, text).map_err(|e| RasterError::io(path, "write", e))?;
        debug!("Wrote {} features to {}", self.len(), path.display());
        Ok(())
    }

    /// Reads a GeoJSON feature collection of polygons
    pub fn load(path: impl AsRef<Path>) -> RasterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RasterError::io(path, "read", e))?;
        let collection: FeatureCollection = text.parse()?;
        let layer = Self::from_geojson(collection)?;
        debug!("Read {} features from {}", layer.len(), path.display());
        Ok(layer)
    }
}

fn ring_positions(ring: &LineString<f64>) -> Vec<Vec<f64>> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_to_value(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_positions(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_positions));
    Value::Polygon(rings)
}

fn positions_to_ring(positions: &[Vec<f64>]) -> Result<LineString<f64>, String> {
    positions.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("position with {} ordinate(s)", position.len())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::from)
}

fn value_to_polygon(value: &Value) -> Result<Polygon<f64>, String> {
    match value {
        Value::Polygon(rings) => {
            let (exterior, holes) = rings.split_first().ok_or("polygon without rings")?;
            let interiors = holes.iter()
                .map(|ring| positions_to_ring(ring))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Polygon::new(positions_to_ring(exterior)?, interiors))
        }
        Value::MultiPolygon(parts) if parts.len() == 1 => value_to_polygon(&Value::Polygon(parts[0].clone())),
        other => Err(format!("expected a Polygon, found {}", other.type_name())),
    }
}

fn parse_crs_member(crs: &JsonValue) -> RasterResult<CoordinateSystem> {
    let name = crs.get("properties")
        .and_then(|properties| properties.get("name"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| RasterError::Vector(format!("Unsupported crs member: {}", crs)))?;
    CoordinateSystemFactory::from_string(name)
}
