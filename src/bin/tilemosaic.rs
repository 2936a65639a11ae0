use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tilemosaic", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a viewport of a tile list into an image file.
    Render(RenderArgs),
    /// Copy layers from one stack to another.
    CopyStack(CopyStackArgs),
    /// Print neighbor tile pairs for a set of tile bounds.
    TilePairs(TilePairsArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON array of tile specs.
    #[arg(long)]
    tile_specs: PathBuf,

    /// Directory relative image paths resolve against (default: the tile spec directory).
    #[arg(long)]
    image_root: Option<PathBuf>,

    /// Output image (.png, .jpg or .tif).
    #[arg(long)]
    out: PathBuf,

    /// Left world coordinate of the viewport.
    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    /// Top world coordinate of the viewport.
    #[arg(long, allow_negative_numbers = true)]
    y: f64,

    /// Output width in pixels.
    #[arg(long)]
    width: u32,

    /// Output height in pixels.
    #[arg(long)]
    height: u32,

    /// Output scale.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Mesh cell size in full-resolution source pixels.
    #[arg(long, default_value_t = 64.0)]
    res: f64,

    /// Worker threads used to rasterize each tile.
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Treat pixels as areas rather than points when scaling.
    #[arg(long)]
    area_offset: bool,

    /// Nearest-neighbor sampling.
    #[arg(long)]
    skip_interpolation: bool,

    /// Apply the default filter chain to each tile.
    #[arg(long)]
    filter: bool,

    /// Only paint where masks are fully opaque.
    #[arg(long)]
    binary_mask: bool,

    /// Ignore tile masks.
    #[arg(long)]
    exclude_mask: bool,

    /// Background color (RRGGBB or AARRGGBB).
    #[arg(long)]
    background: Option<String>,

    /// Write a single gray channel.
    #[arg(long)]
    convert_to_gray: bool,

    /// JPEG quality.
    #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Args, Debug)]
struct CopyStackArgs {
    /// Directory holding the source stacks.
    #[arg(long)]
    root: PathBuf,

    /// Directory holding the target stack (default: same as --root).
    #[arg(long)]
    to_root: Option<PathBuf>,

    #[arg(long)]
    from_stack: String,

    #[arg(long)]
    to_stack: String,

    /// Layers to copy.
    #[arg(long = "z", required = true, num_args = 1.., allow_negative_numbers = true)]
    z_values: Vec<f64>,

    #[arg(long, allow_negative_numbers = true)]
    min_x: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    min_y: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    max_x: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    max_y: Option<f64>,

    /// Keep tiles already present in target layers.
    #[arg(long)]
    keep_existing: bool,

    #[arg(long)]
    complete_to_stack_after_copy: bool,

    #[arg(long)]
    replace_last_transform_with_stage: bool,

    /// Give every (z, section) its own integral target z.
    #[arg(long)]
    split_merged_sections: bool,
}

#[derive(Args, Debug)]
struct TilePairsArgs {
    /// JSON array of tile bounds.
    #[arg(long)]
    bounds: PathBuf,

    /// Neighbor search radius.
    #[arg(long)]
    radius: f64,

    /// Also pair with layers up to this distance above each layer.
    #[arg(long, default_value_t = 0.0)]
    z_neighbor_distance: f64,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::CopyStack(args) => cmd_copy_stack(args),
        Command::TilePairs(args) => cmd_tile_pairs(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let tiles: Vec<tilemosaic::TileSpec> = read_json(&args.tile_specs, "tile specs")?;
    for tile in &tiles {
        for t in &tile.transforms {
            t.validate()
                .with_context(|| format!("tile '{}' transform", tile.tile_id))?;
        }
    }

    let background = args
        .background
        .as_deref()
        .map(tilemosaic::Rgba8::from_hex)
        .transpose()?;
    let params = tilemosaic::RenderParams::default()
        .with_origin(args.x, args.y)
        .with_scale(args.scale)
        .with_mesh_cell_size(args.res)
        .with_threads(args.threads)
        .with_area_offset(args.area_offset)
        .with_skip_interpolation(args.skip_interpolation)
        .with_filter(args.filter)
        .with_binary_mask(args.binary_mask)
        .with_exclude_mask(args.exclude_mask)
        .with_background(background);
    let encode = tilemosaic::EncodeOptions {
        quality: args.quality,
        convert_to_gray: args.convert_to_gray,
    };
    tilemosaic::OutputFormat::from_path(&args.out)?;
    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width and --height must be > 0");
    }

    let image_root = args.image_root.clone().unwrap_or_else(|| {
        args.tile_specs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let cache = tilemosaic::TileImageCache::from_env(image_root);
    let compositor = tilemosaic::Compositor::new(params, &cache)?;

    let mut dst = image::RgbaImage::new(args.width, args.height);
    let stats = compositor.render_to_raster(&tiles, &mut dst)?;
    tilemosaic::save_raster(&dst, &args.out, &encode)?;

    eprintln!(
        "rendered {}/{} tiles ({} skip events) to {}",
        stats.tiles_rendered,
        stats.tiles_total,
        stats.skipped.len(),
        args.out.display()
    );
    Ok(())
}

fn cmd_copy_stack(args: CopyStackArgs) -> anyhow::Result<()> {
    let layer_bounds =
        tilemosaic::LayerBounds::from_parts(args.min_x, args.min_y, args.max_x, args.max_y)?;
    let from = tilemosaic::FsStackStore::new(&args.root);
    let to = tilemosaic::FsStackStore::new(args.to_root.as_ref().unwrap_or(&args.root));

    let params = tilemosaic::CopyStackParams {
        from_stack: args.from_stack,
        to_stack: args.to_stack,
        z_values: args.z_values,
        layer_bounds,
        keep_existing: args.keep_existing,
        complete_to_stack_after_copy: args.complete_to_stack_after_copy,
        replace_last_transform_with_stage: args.replace_last_transform_with_stage,
        split_merged_sections: args.split_merged_sections,
    };
    let report = tilemosaic::CopyStack::new(params, &from, &to)?.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_tile_pairs(args: TilePairsArgs) -> anyhow::Result<()> {
    if !(args.radius.is_finite() && args.radius >= 0.0) {
        anyhow::bail!("--radius must be finite and >= 0");
    }
    if !(args.z_neighbor_distance.is_finite() && args.z_neighbor_distance >= 0.0) {
        anyhow::bail!("--z-neighbor-distance must be finite and >= 0");
    }
    let bounds: Vec<tilemosaic::TileBounds> = read_json(&args.bounds, "tile bounds")?;

    let mut layers: BTreeMap<i64, (f64, Vec<tilemosaic::TileBounds>)> = BTreeMap::new();
    for b in bounds {
        layers
            .entry(ordered_z_key(b.z))
            .or_insert((b.z, Vec::new()))
            .1
            .push(b);
    }
    let trees: Vec<(f64, tilemosaic::TileBoundsRTree)> = layers
        .into_values()
        .map(|(z, tiles)| (z, tilemosaic::TileBoundsRTree::new(tiles)))
        .collect();

    let mut pairs = std::collections::BTreeSet::new();
    for (i, (z, tree)) in trees.iter().enumerate() {
        let neighbors: Vec<&tilemosaic::TileBoundsRTree> = trees[i + 1..]
            .iter()
            .take_while(|(nz, _)| nz - z <= args.z_neighbor_distance)
            .map(|(_, t)| t)
            .collect();
        pairs.extend(tree.circle_neighbor_tile_id_pairs(&neighbors, args.radius));
    }

    let pairs: Vec<_> = pairs.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&pairs)?);
    Ok(())
}

/// Total-order key for f64 layer values.
fn ordered_z_key(z: f64) -> i64 {
    let bits = z.to_bits() as i64;
    bits ^ (((bits >> 63) as u64) >> 1) as i64
}
