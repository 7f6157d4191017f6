//! Coordinate Reference System handling

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{RasterError, RasterResult};

lazy_static! {
    /// `EPSG:32737`, `epsg::4326`, `urn:ogc:def:crs:EPSG::21037`, `urn:ogc:def:crs:EPSG:6.6:4326`
    static ref EPSG_PATTERN: Regex =
        Regex::new(r"(?i)^(?:urn:ogc:def:crs:)?epsg:(?:[0-9.]*:)?(\d+)$").unwrap();

    /// OGC CRS84 aliases, equivalent to WGS 84 with lon/lat ordering
    static ref CRS84_PATTERN: Regex =
        Regex::new(r"(?i)^(?:urn:ogc:def:crs:ogc:[0-9.]*:)?crs84$").unwrap();

    static ref KNOWN_SYSTEMS: HashMap<u32, &'static str> = {
        let mut names = HashMap::new();
        names.insert(4326, "WGS 84");
        names.insert(4269, "NAD83");
        names.insert(4210, "Arc 1960");
        names.insert(3857, "WGS 84 / Pseudo-Mercator");
        names.insert(21036, "Arc 1960 / UTM zone 36S");
        names.insert(21037, "Arc 1960 / UTM zone 37S");
        names
    };
}

/// Coordinate reference system attached to rasters and vector layers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoordinateSystem {
    /// EPSG registry code
    Epsg(u32),
    /// Any other identifier, kept verbatim
    Named(String),
    /// No CRS information available
    #[default]
    Undefined,
}

impl CoordinateSystem {
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CoordinateSystem::Epsg(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, CoordinateSystem::Undefined)
    }

    /// Identifier written to the `crs` member of GeoJSON output
    pub fn to_urn(&self) -> Option<String> {
        match self {
            CoordinateSystem::Epsg(code) => Some(format!("urn:ogc:def:crs:EPSG::{}", code)),
            CoordinateSystem::Named(name) => Some(name.clone()),
            CoordinateSystem::Undefined => None,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::Epsg(code) => match known_name(*code) {
                Some(name) => format!("{} (EPSG:{})", name, code),
                None => format!("EPSG:{}", code),
            },
            CoordinateSystem::Named(name) => name.clone(),
            CoordinateSystem::Undefined => "undefined".to_string(),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

fn known_name(code: u32) -> Option<String> {
    if let Some(name) = KNOWN_SYSTEMS.get(&code) {
        return Some(name.to_string());
    }
    match code {
        32601..=32660 => Some(format!("WGS 84 / UTM zone {}N", code - 32600)),
        32701..=32760 => Some(format!("WGS 84 / UTM zone {}S", code - 32700)),
        _ => None,
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        CoordinateSystem::Epsg(epsg)
    }

    /// Parse a coordinate system from a string (e.g. "EPSG:4326" or a URN)
    pub fn from_string(crs_str: &str) -> RasterResult<CoordinateSystem> {
        let crs_str = crs_str.trim();

        if crs_str.is_empty() {
            return Ok(CoordinateSystem::Undefined);
        }

        if let Some(captures) = EPSG_PATTERN.captures(crs_str) {
            let code = &captures[1];
            return code.parse::<u32>()
                .map(CoordinateSystem::Epsg)
                .map_err(|_| RasterError::config(format!("Invalid EPSG code: {}", code)));
        }

        if CRS84_PATTERN.is_match(crs_str) {
            return Ok(CoordinateSystem::Epsg(4326));
        }

        if let Ok(code) = crs_str.parse::<u32>() {
            return Ok(CoordinateSystem::Epsg(code));
        }

        Ok(CoordinateSystem::Named(crs_str.to_string()))
    }
}
