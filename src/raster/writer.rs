//! GeoTIFF output for in-memory rasters

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use std::path::Path;

use crate::compression::CompressionHandler;
use crate::error::RasterResult;
use crate::raster::{Raster, SampleType};
use crate::tiff::constants::{photometric, planar_config, tags};
use crate::tiff::{GeoKeyParser, TiffBuilder};

/// Writes `raster` as a little-endian, single-strip, pixel-interleaved GeoTIFF
///
/// Tags the source carried through in `raster.metadata` take precedence over
/// the ones generated here.
pub fn write_geotiff(raster: &Raster, path: impl AsRef<Path>, compression: &dyn CompressionHandler) -> RasterResult<()> {
    let path = path.as_ref();
    let mut builder = TiffBuilder::new();
    let bands = raster.bands.max(1);

    builder.add_long(tags::IMAGE_WIDTH, raster.width as u32);
    builder.add_long(tags::IMAGE_LENGTH, raster.height as u32);
    builder.add_shorts(tags::BITS_PER_SAMPLE, &vec![raster.sample_type.bits(); bands]);
    builder.add_short(tags::COMPRESSION, compression.code());
    builder.add_short(tags::PHOTOMETRIC_INTERPRETATION, photometric::BLACK_IS_ZERO);
    builder.add_short(tags::SAMPLES_PER_PIXEL, bands as u16);
    builder.add_short(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY);
    builder.add_shorts(tags::SAMPLE_FORMAT, &vec![raster.sample_type.format_code(); bands]);
    if bands > 1 {
        // Unspecified extra samples
        builder.add_shorts(tags::EXTRA_SAMPLES, &vec![0; bands - 1]);
    }

    add_georeferencing(&mut builder, raster);

    if let Some(nodata) = raster.metadata.nodata {
        builder.add_ascii(tags::GDAL_NODATA, &format_nodata(nodata));
    }

    for tag in &raster.metadata.passthrough {
        builder.add_passthrough(tag);
    }

    let pixels = encode_pixels(raster)?;
    let strip = compression.compress(&pixels)?;
    debug!("Encoded {} bytes of pixels into {} bytes ({})", pixels.len(), strip.len(), compression.name());
    builder.set_single_strip(raster.height as u32, strip);

    builder.write(path)
}

fn add_georeferencing(builder: &mut TiffBuilder, raster: &Raster) {
    let mut transform = raster.transform;
    if raster.metadata.pixel_is_point {
        transform = transform.translate(0.5, 0.5);
    }

    if transform.is_rectilinear() && transform.a > 0.0 && transform.e < 0.0 {
        builder.add_doubles(tags::MODEL_PIXEL_SCALE_TAG, &[transform.a, -transform.e, 0.0]);
        builder.add_doubles(tags::MODEL_TIEPOINT_TAG, &[0.0, 0.0, 0.0, transform.c, transform.f, 0.0]);
    } else {
        builder.add_doubles(tags::MODEL_TRANSFORMATION_TAG, &[
            transform.a, transform.b, 0.0, transform.c,
            transform.d, transform.e, 0.0, transform.f,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
    }

    let (directory, ascii) = GeoKeyParser::build_directory(&raster.crs, raster.metadata.pixel_is_point);
    builder.add_shorts(tags::GEO_KEY_DIRECTORY_TAG, &directory);
    if let Some(text) = ascii {
        builder.add_ascii(tags::GEO_ASCII_PARAMS_TAG, &text);
    }
}

/// GDAL writes integral nodata values without a fractional part
fn format_nodata(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Interleaves the band-sequential samples into little-endian pixel bytes
fn encode_pixels(raster: &Raster) -> RasterResult<Vec<u8>> {
    let sample_type = raster.sample_type;
    let band_size = raster.width * raster.height;
    let mut out = Vec::with_capacity(band_size * raster.bands * sample_type.bytes());

    for pixel in 0..band_size {
        for band in 0..raster.bands {
            let value = sample_type.saturate(raster.data[band * band_size + pixel]);
            match sample_type {
                SampleType::U8 => out.write_u8(value as u8)?,
                SampleType::I8 => out.write_i8(value as i8)?,
                SampleType::U16 => out.write_u16::<LittleEndian>(value as u16)?,
                SampleType::I16 => out.write_i16::<LittleEndian>(value as i16)?,
                SampleType::U32 => out.write_u32::<LittleEndian>(value as u32)?,
                SampleType::I32 => out.write_i32::<LittleEndian>(value as i32)?,
                SampleType::F32 => out.write_f32::<LittleEndian>(value as f32)?,
                SampleType::F64 => out.write_f64::<LittleEndian>(value)?,
            }
        }
    }

    Ok(out)
}
