//! End-to-end tests for the grid, patch and vectorize pipelines

use std::io::Cursor;
use std::path::Path;

use geo::Area;
use rastergrid::compression::{AdobeDeflateHandler, UncompressedHandler};
use rastergrid::raster::{write_geotiff, SampleType};
use rastergrid::tiff::TiffReader;
use rastergrid::vector::VectorLayer;
use rastergrid::{
    CoordinateSystem, GeoTransform, GridBuilder, GridConfig, PatchConfig, PatchExtractor, Raster,
    RasterDataset, RasterError, RasterGrid, RunConfig, TileSource, VectorizeOptions,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes a georeferenced single-band UTM raster with a gradient of values
fn write_scene(path: &Path, width: usize, height: usize) {
    let data = (0..width * height).map(|i| ((i % width) + (i / width)) as f64).collect();
    let raster = Raster::from_data(width, height, 1, SampleType::U16, data)
        .unwrap()
        .with_transform(GeoTransform::from_origin(256000.0, 9860000.0, 10.0, 10.0))
        .with_crs(CoordinateSystem::Epsg(32737));
    write_geotiff(&raster, path, &AdobeDeflateHandler).unwrap();
}

fn scene_config(output_dir: &Path, tile_size: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.grid.area_label = "Test Area".to_string();
    config.grid.tile_size = tile_size;
    config.patches.output_dir = Some(output_dir.to_path_buf());
    config
}

#[test]
fn test_exact_multiple_writes_every_patch() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    write_scene(&input, 64, 32);

    let api = RasterGrid::new(scene_config(&dir.path().join("patches"), 16));
    let (tiles, report) = api.tile(&input, None).unwrap();

    assert_eq!(tiles.len(), 8);
    assert_eq!(report.written.len(), 8);
    assert_eq!(report.dropped, 0);
    for (index, path) in report.written.iter().enumerate() {
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("scene_{}.tif", index));
        let patch = RasterDataset::open(path).unwrap();
        assert_eq!((patch.width(), patch.height()), (16, 16));
        assert_eq!(patch.crs(), &CoordinateSystem::Epsg(32737));
        assert_eq!(patch.sample_type(), SampleType::U16);
    }

    // Tile 5 sits at row 16, column 16
    let patch = RasterDataset::open(&report.written[5]).unwrap().read().unwrap();
    assert_eq!(patch.get(0, 0, 0), Some(32.0));
    assert_eq!(patch.transform.apply(0.0, 0.0), (256160.0, 9859840.0));
}

#[test]
fn test_partial_edge_tiles_are_dropped() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    write_scene(&input, 50, 40);

    let api = RasterGrid::new(scene_config(&dir.path().join("patches"), 16));
    let (tiles, report) = api.tile(&input, None).unwrap();

    assert_eq!(tiles.len(), 4 * 3);
    assert!(report.written.len() < tiles.len());
    assert_eq!(report.written.len(), 3 * 2);
    assert_eq!(report.dropped, 6);
    assert!(report.failed.is_empty());
    for path in &report.written {
        let patch = RasterDataset::open(path).unwrap();
        assert_eq!((patch.width(), patch.height()), (16, 16));
    }
}

#[test]
fn test_patches_from_saved_tile_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let tiles_path = dir.path().join("tiles.geojson");
    write_scene(&input, 32, 32);

    let dataset = RasterDataset::open(&input).unwrap();
    let tiles = GridBuilder::new(GridConfig::new("Saved", 16)).unwrap().build_for(&dataset).unwrap();
    tiles.save(&tiles_path).unwrap();

    let layer = VectorLayer::load(&tiles_path).unwrap();
    assert_eq!(layer.crs, CoordinateSystem::Epsg(32737));
    assert_eq!(layer.polygons(), tiles.footprints());

    let extractor = PatchExtractor::new(
        PatchConfig::new("saved", dir.path().join("out")).with_tile_size(16).with_compression("zstd")
    ).unwrap();
    let from_file = extractor.extract(&dataset, &TileSource::FromFile(tiles_path)).unwrap();
    let in_memory = extractor.extract(&dataset, &TileSource::InMemory(tiles)).unwrap();

    assert_eq!(from_file.written.len(), 4);
    assert_eq!(from_file, in_memory);
}

#[test]
fn test_vectorize_mask_end_to_end() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mask.tif");
    let output = dir.path().join("regions.geojson");

    #[rustfmt::skip]
    let data = vec![
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 1.0, 0.0, 2.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 2.0, 0.0,
        0.0, 1.0, 1.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, -5.0,
    ];
    let raster = Raster::from_data(6, 5, 1, SampleType::I16, data)
        .unwrap()
        .with_transform(GeoTransform::from_origin(100.0, 50.0, 2.0, 2.0))
        .with_crs(CoordinateSystem::Epsg(21037));
    write_geotiff(&raster, &input, &UncompressedHandler).unwrap();

    let regions = RasterGrid::new(RunConfig::default()).raster_to_vector(&input, &output).unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions.regions[0].value, 1);
    assert_eq!(regions.regions[0].pixel_count, 6);
    assert_eq!(regions.regions[0].geometry.unsigned_area(), 24.0);
    assert_eq!(regions.regions[1].value, 2);

    let layer = VectorLayer::load(&output).unwrap();
    assert_eq!(layer.crs, CoordinateSystem::Epsg(21037));
    let values: Vec<i64> = layer.features.iter()
        .filter_map(|feature| feature.property("value").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_background_only_gives_empty_collection() {
    init_logging();
    let raster = Raster::from_data(3, 3, 1, SampleType::I8, vec![0.0, -1.0, 0.0, 0.0, 0.0, -2.0, 0.0, 0.0, 0.0]).unwrap();
    let regions = rastergrid::vectorize(&raster, &VectorizeOptions::default()).unwrap();
    assert!(regions.is_empty());
    assert_eq!(regions.to_layer().to_geojson().features.len(), 0);
}

#[test]
fn test_unreadable_raster_is_fatal() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.tif");
    std::fs::write(&bogus, b"not a tiff at all").unwrap();

    let api = RasterGrid::new(RunConfig::default());
    assert!(api.raster_to_vector(&bogus, dir.path().join("out.geojson")).is_err());
    assert!(matches!(
        api.info(dir.path().join("missing.tif")),
        Err(RasterError::Io { operation: "open", .. })
    ));
}

#[test]
fn test_reader_parses_written_header() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    write_scene(&input, 20, 10);

    let bytes = std::fs::read(&input).unwrap();
    let tiff = TiffReader::new().read(&mut Cursor::new(bytes)).unwrap();
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((20, 10)));
}
