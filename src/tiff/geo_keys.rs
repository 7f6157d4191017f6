//! GeoTIFF georeferencing
//!
//! Reads the affine transform and CRS of an image from its model tags and
//! GeoKey directory, and builds the directory written into derived files.

use log::{debug, warn};

use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::error::{RasterError, RasterResult};
use crate::io::SeekableReader;
use crate::tiff::constants::{geo_keys, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One key of a GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 when the value is stored in `value_offset`, else the params tag holding it
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    /// Inline short value, if the key stores one
    pub fn short_value(&self) -> Option<u16> {
        if self.tiff_tag_location == 0 { Some(self.value_offset) } else { None }
    }
}

/// Georeferencing decoded from one IFD
#[derive(Debug, Clone, PartialEq)]
pub struct Georeference {
    pub transform: GeoTransform,
    pub crs: CoordinateSystem,
    /// Raster space is PixelIsPoint; `transform` is already shifted to pixel corners
    pub pixel_is_point: bool,
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parse the GeoKey directory from an IFD; empty when the tag is absent
    pub fn parse_geo_key_directory(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> RasterResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(RasterError::Generic("Invalid GeoKey directory header".to_string()));
        }

        let num_keys = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], num_keys);

        let available = (values.len() - 4) / 4;
        if available < num_keys {
            warn!("GeoKey directory declares {} keys but holds {}", num_keys, available);
        }

        Ok(values[4..].chunks_exact(4)
            .take(num_keys)
            .map(|key| GeoKeyEntry::new(key[0] as u16, key[1] as u16, key[2] as u16, key[3] as u16))
            .collect())
    }

    /// Affine transform from ModelTransformation, or from ModelPixelScale plus ModelTiepoint
    ///
    /// Files with neither get the identity transform.
    pub fn read_transform(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> RasterResult<GeoTransform> {
        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let m = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if m.len() >= 16 {
                return Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
            }
            warn!("ModelTransformationTag has {} values, expected 16", m.len());
        }

        if ifd.has_tag(tags::MODEL_TIEPOINT_TAG) && ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) {
            let tiepoint = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            let scale = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                if tiepoint.len() > 6 {
                    debug!("Using the first of {} tiepoints", tiepoint.len() / 6);
                }
                let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
                let (sx, sy) = (scale[0], scale[1]);
                return Ok(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy));
            }
            warn!("Incomplete tiepoint/pixel scale tags, ignoring georeferencing");
        }

        debug!("No georeferencing tags, using identity transform");
        Ok(GeoTransform::identity())
    }

    /// Resolves the CRS from ProjectedCSType, then GeographicType, then citations
    pub fn read_coordinate_system(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
        keys: &[GeoKeyEntry],
    ) -> RasterResult<CoordinateSystem> {
        let lookup = |id: u16| keys.iter().find(|key| key.key_id == id);

        for id in [geo_keys::PROJECTED_CS_TYPE, geo_keys::GEOGRAPHIC_TYPE] {
            if let Some(code) = lookup(id).and_then(GeoKeyEntry::short_value) {
                if code != 0 && code != geo_keys::USER_DEFINED {
                    return Ok(CoordinateSystem::Epsg(code as u32));
                }
            }
        }

        for id in [geo_keys::PCS_CITATION, geo_keys::CITATION] {
            let Some(key) = lookup(id) else { continue };
            if key.tiff_tag_location != tags::GEO_ASCII_PARAMS_TAG || !ifd.has_tag(tags::GEO_ASCII_PARAMS_TAG) {
                continue;
            }
            let params = tiff_reader.read_tag_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?;
            let start = (key.value_offset as usize).min(params.len());
            let end = (start + key.count as usize).min(params.len());
            let citation = params.get(start..end).unwrap_or("").trim_end_matches('|').trim();
            if !citation.is_empty() {
                return Ok(CoordinateSystem::Named(citation.to_string()));
            }
        }

        Ok(CoordinateSystem::Undefined)
    }

    /// Full georeferencing of an IFD
    pub fn read_georeference(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> RasterResult<Georeference> {
        let keys = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;
        let mut transform = Self::read_transform(tiff_reader, reader, ifd)?;
        let crs = Self::read_coordinate_system(tiff_reader, reader, ifd, &keys)?;

        let pixel_is_point = keys.iter()
            .find(|key| key.key_id == geo_keys::RASTER_TYPE)
            .and_then(GeoKeyEntry::short_value)
            == Some(geo_keys::RASTER_PIXEL_IS_POINT);
        if pixel_is_point {
            // Tiepoints reference pixel centres; move the origin to the corner
            transform = transform.translate(-0.5, -0.5);
        }

        Ok(Georeference { transform, crs, pixel_is_point })
    }

    /// GeoKey directory (as SHORT values) and ASCII params describing `crs`
    pub fn build_directory(crs: &CoordinateSystem, pixel_is_point: bool) -> (Vec<u16>, Option<String>) {
        let raster_type = if pixel_is_point {
            geo_keys::RASTER_PIXEL_IS_POINT
        } else {
            geo_keys::RASTER_PIXEL_IS_AREA
        };

        let mut keys: Vec<[u16; 4]> = Vec::new();
        let mut ascii = None;

        match crs {
            CoordinateSystem::Epsg(code) if *code <= u16::MAX as u32 => {
                let code = *code as u16;
                if is_geographic(code) {
                    keys.push([geo_keys::MODEL_TYPE, 0, 1, geo_keys::MODEL_TYPE_GEOGRAPHIC]);
                    keys.push([geo_keys::RASTER_TYPE, 0, 1, raster_type]);
                    keys.push([geo_keys::GEOGRAPHIC_TYPE, 0, 1, code]);
                } else {
                    keys.push([geo_keys::MODEL_TYPE, 0, 1, geo_keys::MODEL_TYPE_PROJECTED]);
                    keys.push([geo_keys::RASTER_TYPE, 0, 1, raster_type]);
                    keys.push([geo_keys::PROJECTED_CS_TYPE, 0, 1, code]);
                }
            }
            CoordinateSystem::Epsg(code) => {
                warn!("EPSG:{} does not fit a GeoKey, writing it as a citation", code);
                return Self::build_directory(&CoordinateSystem::Named(format!("EPSG:{}", code)), pixel_is_point);
            }
            CoordinateSystem::Named(name) => {
                let text = format!("{}|", name);
                keys.push([geo_keys::RASTER_TYPE, 0, 1, raster_type]);
                keys.push([geo_keys::CITATION, tags::GEO_ASCII_PARAMS_TAG, text.len() as u16, 0]);
                ascii = Some(text);
            }
            CoordinateSystem::Undefined => {
                keys.push([geo_keys::RASTER_TYPE, 0, 1, raster_type]);
            }
        }

        let mut directory = vec![1, 1, 0, keys.len() as u16];
        for key in keys {
            directory.extend_from_slice(&key);
        }
        (directory, ascii)
    }
}

/// EPSG geographic 2D CRS codes sit in 4001..=4999
fn is_geographic(code: u16) -> bool {
    (4001..=4999).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::tests::test_utils;

    #[test]
    fn test_transform_from_scale_and_tiepoint() {
        let mut cursor = test_utils::create_georeferenced_tiff_buffer();
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();

        let georef = GeoKeyParser::read_georeference(&tiff_reader, &mut cursor, ifd).unwrap();
        assert_eq!(georef.transform, GeoTransform::from_origin(500000.0, 4000000.0, 10.0, 10.0));
        assert_eq!(georef.crs, CoordinateSystem::Undefined);
        assert!(!georef.pixel_is_point);
    }

    #[test]
    fn test_plain_tiff_has_identity_transform() {
        let mut cursor = test_utils::create_test_tiff_buffer();
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut cursor).unwrap();

        let transform = GeoKeyParser::read_transform(&tiff_reader, &mut cursor, tiff.main_ifd().unwrap()).unwrap();
        assert_eq!(transform, GeoTransform::identity());
    }

    #[test]
    fn test_build_directory_projected() {
        let (directory, ascii) = GeoKeyParser::build_directory(&CoordinateSystem::Epsg(32737), false);
        assert_eq!(directory[..4], [1, 1, 0, 3]);
        assert_eq!(directory[4..8], [geo_keys::MODEL_TYPE, 0, 1, geo_keys::MODEL_TYPE_PROJECTED]);
        assert_eq!(directory[12..16], [geo_keys::PROJECTED_CS_TYPE, 0, 1, 32737]);
        assert!(ascii.is_none());
    }

    #[test]
    fn test_build_directory_geographic_and_named() {
        let (directory, _) = GeoKeyParser::build_directory(&CoordinateSystem::Epsg(4326), true);
        assert_eq!(directory[8..12], [geo_keys::RASTER_TYPE, 0, 1, geo_keys::RASTER_PIXEL_IS_POINT]);
        assert_eq!(directory[12..16], [geo_keys::GEOGRAPHIC_TYPE, 0, 1, 4326]);

        let (directory, ascii) = GeoKeyParser::build_directory(&CoordinateSystem::Named("local grid".into()), false);
        assert_eq!(directory[3], 2);
        assert_eq!(ascii.as_deref(), Some("local grid|"));
        assert_eq!(directory[8..12], [geo_keys::CITATION, tags::GEO_ASCII_PARAMS_TAG, 11, 0]);
    }
}
