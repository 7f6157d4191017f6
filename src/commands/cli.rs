//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input GeoTIFF file")
        .value_name("INPUT")
        .required(true)
        .index(1)
}

fn grid_args() -> Vec<Arg> {
    vec![
        Arg::new("label")
            .short('l')
            .long("label")
            .help("Area label used for tile ids, lower-cased with spaces as underscores [default: grid]")
            .value_name("LABEL"),
        Arg::new("tile-size")
            .short('s')
            .long("tile-size")
            .help("Tile edge length in pixels [default: 256]")
            .value_name("PIXELS")
            .value_parser(value_parser!(usize)),
        Arg::new("axis-order")
            .long("axis-order")
            .help("Window enumeration: row_major, or swapped for legacy tile artifacts")
            .value_name("ORDER"),
    ]
}

fn patch_args() -> Vec<Arg> {
    vec![
        Arg::new("output-dir")
            .short('o')
            .long("output-dir")
            .help("Directory receiving the patch files")
            .value_name("DIR"),
        Arg::new("image-name")
            .long("image-name")
            .help("Patch file name stem [default: input file stem]")
            .value_name("NAME"),
        Arg::new("compression")
            .long("compression")
            .help("Patch compression (none, deflate, zstd, packbits)")
            .value_name("NAME"),
        Arg::new("progress")
            .long("progress")
            .help("Show a progress bar")
            .action(ArgAction::SetTrue),
    ]
}

/// Builds the `rastergrid` command line
pub fn build_cli() -> ClapCommand {
    ClapCommand::new("rastergrid")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Grid tiling, patch extraction and polygonization of GeoTIFF rasters")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML run configuration")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write log records and run summaries to this file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            ClapCommand::new("grid")
                .about("Build the tile grid of a raster and save the footprints as GeoJSON")
                .arg(input_arg())
                .args(grid_args())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("GeoJSON file for the tile footprints")
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            ClapCommand::new("patches")
                .about("Crop a raster into fixed-size patches")
                .arg(input_arg())
                .arg(
                    Arg::new("tiles")
                        .short('t')
                        .long("tiles")
                        .help("GeoJSON footprints to crop under; builds a grid when omitted")
                        .value_name("FILE"),
                )
                .args(grid_args())
                .args(patch_args()),
        )
        .subcommand(
            ClapCommand::new("tile")
                .about("Build the grid and crop patches in one run")
                .arg(input_arg())
                .args(grid_args())
                .args(patch_args())
                .arg(
                    Arg::new("tiles-output")
                        .long("tiles-output")
                        .help("Also save the tile footprints to this GeoJSON file")
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            ClapCommand::new("vectorize")
                .about("Convert a classified raster into polygons")
                .arg(input_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("GeoJSON file for the polygons")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(
                    Arg::new("connectivity")
                        .long("connectivity")
                        .help("Pixel neighbourhood, 4 or 8 [default: 4]")
                        .value_name("N")
                        .value_parser(["4", "8"]),
                )
                .arg(
                    Arg::new("min-value")
                        .long("min-value")
                        .help("Drop regions with values at or below this [default: 0]")
                        .value_name("VALUE")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("downsample")
                        .long("downsample")
                        .help("Shrink the raster by this factor before vectorizing")
                        .value_name("FACTOR")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("resampling")
                        .long("resampling")
                        .help("Downsampling method (nearest, bilinear)")
                        .value_name("METHOD"),
                ),
        )
        .subcommand(
            ClapCommand::new("info")
                .about("Print the structure and georeferencing of a raster")
                .arg(input_arg()),
        )
}
