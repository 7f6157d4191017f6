//! File-backed GeoTIFF datasets
//!
//! Opening a dataset parses the header, layout and georeferencing once.
//! Every pixel read opens its own file handle and drops it before returning,
//! so no handle outlives the call that needed it.

use log::{debug, info, warn};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::coordinate::{BoundingBox, CoordinateSystem, GeoTransform};
use crate::error::{RasterError, RasterResult};
use crate::io::{ByteOrder, SeekableReader};
use crate::raster::{PassthroughTag, Raster, RasterMetadata, SampleType, Window};
use crate::tiff::constants::tags;
use crate::tiff::{ChunkDecoder, GeoKeyParser, IFD, ImageLayout, TiffReader};

/// A GeoTIFF on disk, read lazily by window
#[derive(Debug, Clone)]
pub struct RasterDataset {
    path: PathBuf,
    layout: ImageLayout,
    byte_order: ByteOrder,
    is_big_tiff: bool,
    overview_count: usize,
    transform: GeoTransform,
    crs: CoordinateSystem,
    metadata: RasterMetadata,
}

impl RasterDataset {
    /// Parses the structure and georeferencing of the first image in `path`
    pub fn open(path: impl AsRef<Path>) -> RasterResult<Self> {
        let path = path.as_ref();

        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(path)?;
        let ifd = tiff.main_ifd().ok_or(RasterError::InvalidHeader)?;

        let mut reader = tiff_reader.create_reader()?;
        let layout = ImageLayout::from_ifd(&tiff_reader, &mut reader, ifd)?;
        let georef = GeoKeyParser::read_georeference(&tiff_reader, &mut reader, ifd)?;
        let metadata = Self::read_metadata(&tiff_reader, &mut reader, ifd, georef.pixel_is_point)?;

        info!(
            "Opened {}: {}x{} px, {} band(s) of {}, {} layout, CRS {}",
            path.display(), layout.width, layout.height, layout.samples_per_pixel,
            layout.sample_type, layout.layout_name(), georef.crs
        );

        Ok(RasterDataset {
            path: path.to_path_buf(),
            layout,
            byte_order: tiff.byte_order,
            is_big_tiff: tiff.is_big_tiff,
            overview_count: tiff.overview_count(),
            transform: georef.transform,
            crs: georef.crs,
            metadata,
        })
    }

    fn read_metadata(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
        pixel_is_point: bool,
    ) -> RasterResult<RasterMetadata> {
        let nodata = if ifd.has_tag(tags::GDAL_NODATA) {
            let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
            match text.trim().parse::<f64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring unparseable nodata value {:?}", text);
                    None
                }
            }
        } else {
            None
        };

        let mut passthrough = Vec::new();
        for tag in tags::PASSTHROUGH {
            if let Some(entry) = ifd.get_entry(tag) {
                let data = tiff_reader.read_tag_le_bytes(reader, ifd, tag)?;
                debug!("Carrying tag {} ({}) through: {} bytes", tag, tags::name(tag), data.len());
                passthrough.push(PassthroughTag {
                    tag,
                    field_type: entry.field_type,
                    count: entry.count,
                    data,
                });
            }
        }

        Ok(RasterMetadata { nodata, pixel_is_point, passthrough })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.layout.width
    }

    pub fn height(&self) -> usize {
        self.layout.height
    }

    pub fn bands(&self) -> usize {
        self.layout.samples_per_pixel
    }

    pub fn sample_type(&self) -> SampleType {
        self.layout.sample_type
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &CoordinateSystem {
        &self.crs
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    pub fn nodata(&self) -> Option<f64> {
        self.metadata.nodata
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    pub fn extent(&self) -> Window {
        Window::full(self.width(), self.height())
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_window(&self.extent(), &self.transform)
    }

    /// Reads every band of the whole raster
    pub fn read(&self) -> RasterResult<Raster> {
        self.read_window(&self.extent())
    }

    /// Reads the part of `window` that lies inside the raster
    ///
    /// The returned raster covers `window ∩ extent` and may therefore be
    /// smaller than requested; a window with no overlap is an error.
    pub fn read_window(&self, window: &Window) -> RasterResult<Raster> {
        let clipped = window.intersection(&self.extent()).ok_or_else(|| {
            RasterError::config(format!(
                "Window {:?} does not overlap the {}x{} raster {}",
                window, self.width(), self.height(), self.path.display()
            ))
        })?;

        let data = self.decode(&clipped)?;
        let raster = Raster::from_data(clipped.width, clipped.height, self.bands(), self.sample_type(), data)?
            .with_transform(self.transform.translate(clipped.col_off as f64, clipped.row_off as f64))
            .with_crs(self.crs.clone())
            .with_metadata(self.metadata.clone());
        Ok(raster)
    }

    /// Reads one band (1-based, as in GDAL) of the whole raster
    pub fn read_band(&self, band: usize) -> RasterResult<Raster> {
        if band == 0 || band > self.bands() {
            return Err(RasterError::config(format!(
                "Band {} requested from {} which has {} band(s)", band, self.path.display(), self.bands()
            )));
        }

        let full = self.read()?;
        let data = full.band(band - 1)?.to_vec();
        let raster = Raster::from_data(full.width, full.height, 1, full.sample_type, data)?
            .with_transform(full.transform)
            .with_crs(full.crs)
            .with_metadata(full.metadata);
        Ok(raster)
    }

    fn decode(&self, window: &Window) -> RasterResult<Vec<f64>> {
        let file = File::open(&self.path).map_err(|e| RasterError::io(&self.path, "open", e))?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        let handler = self.byte_order.create_handler();
        let decoder = ChunkDecoder::new(&self.layout, handler.as_ref())?;
        decoder.read_window(&mut reader, window)
    }
}

impl fmt::Display for RasterDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bounds = self.bounds();
        writeln!(f, "File: {}", self.path.display())?;
        writeln!(f, "  Format: {} ({})", if self.is_big_tiff { "BigTIFF" } else { "TIFF" }, self.byte_order.name())?;
        writeln!(f, "  Size: {} x {} px, {} band(s)", self.width(), self.height(), self.bands())?;
        writeln!(f, "  Sample type: {}", self.sample_type())?;
        writeln!(f, "  Layout: {} ({} x {} chunks), compression {}",
                 self.layout.layout_name(), self.layout.chunk_width, self.layout.chunk_height,
                 self.layout.compression)?;
        writeln!(f, "  Overviews: {}", self.overview_count)?;
        writeln!(f, "  CRS: {}", self.crs)?;
        writeln!(f, "  Transform: {:?}", self.transform.to_gdal())?;
        writeln!(f, "  Bounds: ({}, {}) - ({}, {})", bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y)?;
        match self.metadata.nodata {
            Some(nodata) => writeln!(f, "  NoData: {}", nodata)?,
            None => writeln!(f, "  NoData: none")?,
        }
        Ok(())
    }
}
