use clap::{Parser, Subcommand};
use sat_raster::config;
use sat_raster::crs::Crs;
use sat_raster::naming::{self, Derived};
use sat_raster::types::Codec;
use sat_raster::warp::Resampling;
use sat_raster::{Raster, compress, output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "sat-raster")]
#[command(about = "Clip, reproject and recompress satellite GeoTIFF imagery")]
#[command(long_about = "\
Clip, reproject and recompress satellite GeoTIFF imagery

Typical workflow for a scene and an area of interest:

  scene.tif + aoi.geojson
    clip         → clipped.tif            (mask + crop to the boundary)
    reproject    → clipped_4326.tif       (warp into the target CRS)
    recompress   → compressed.tif         (re-encode, e.g. JPEG)

'pipeline' runs all three. Single-stage commands write next to their input
unless -o is given.

The boundary must be in the raster's CRS (read from the GeoJSON 'crs' member,
EPSG:4326 otherwise). Use --reproject-boundary to move it automatically.

Settings are read from sat-raster.toml in the current directory when present.
Run 'sat-raster gen-config' to generate a documented one.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./sat-raster.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe a GeoTIFF: bands, type, grid, CRS, corners and profile
    Info {
        raster: PathBuf,
    },
    /// Mask a raster with a GeoJSON boundary and crop to it
    Clip {
        raster: PathBuf,
        boundary: PathBuf,
        /// Output file [default: clipped.tif next to the input]
        #[arg(short, long = "output")]
        out: Option<PathBuf>,
        /// Keep the full raster grid instead of cropping to the boundary
        #[arg(long)]
        no_crop: bool,
        /// Reproject the boundary into the raster CRS when they differ
        #[arg(long)]
        reproject_boundary: bool,
    },
    /// Warp a raster into another coordinate reference system
    Reproject {
        raster: PathBuf,
        /// Target CRS, e.g. EPSG:4326
        #[arg(long)]
        to: Option<Crs>,
        #[arg(long)]
        resampling: Option<Resampling>,
        /// Output file [default: clipped_<epsg>.tif next to the input]
        #[arg(short, long = "output")]
        out: Option<PathBuf>,
    },
    /// Rewrite a raster with a different compression codec
    Recompress {
        raster: PathBuf,
        #[arg(long)]
        codec: Option<Codec>,
        /// JPEG quality (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Output file [default: compressed.tif next to the input]
        #[arg(short, long = "output")]
        out: Option<PathBuf>,
    },
    /// Run the full pipeline: clip → reproject → recompress
    Pipeline {
        raster: PathBuf,
        boundary: PathBuf,
        /// Target CRS, e.g. EPSG:4326
        #[arg(long)]
        to: Option<Crs>,
        /// Directory for clipped.tif, clipped_<epsg>.tif and compressed.tif
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print a stock sat-raster.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Info { raster } => {
            let dataset = Raster::open(&raster)?;
            let size = std::fs::metadata(&raster)?.len();
            output::print_info(&dataset, &raster, size);
        }
        Command::Clip {
            raster,
            boundary,
            out,
            no_crop,
            reproject_boundary,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if no_crop {
                config.clip.crop = false;
            }
            if reproject_boundary {
                config.clip.reproject_boundary = true;
            }
            let dst = out.unwrap_or_else(|| naming::next_to(&raster, Derived::Clipped));
            let clipped = pipeline::clip_file(&raster, &boundary, &dst, &config)?;
            output::print_written("Clipped", &clipped, &dst);
        }
        Command::Reproject {
            raster,
            to,
            resampling,
            out,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(crs) = to {
                config.reproject.target_crs = crs;
            }
            if let Some(resampling) = resampling {
                config.reproject.resampling = resampling;
            }
            let dst_crs = config.reproject.target_crs;
            let dst = out
                .unwrap_or_else(|| naming::next_to(&raster, Derived::Reprojected(dst_crs)));
            let warped = pipeline::reproject_file(&raster, &dst, dst_crs, &config)?;
            output::print_written("Reprojected", &warped, &dst);
        }
        Command::Recompress {
            raster,
            codec,
            quality,
            out,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(codec) = codec {
                config.compress.codec = codec;
            }
            if let Some(quality) = quality {
                config.compress.quality = quality;
            }
            let dst = out.unwrap_or_else(|| naming::next_to(&raster, Derived::Compressed));
            let report = compress::recompress(
                &raster,
                &dst,
                config.compress.codec,
                &config.write_options(),
            )?;
            output::print_compression_report(&report, &raster, &dst);
        }
        Command::Pipeline {
            raster,
            boundary,
            to,
            out_dir,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(crs) = to {
                config.reproject.target_crs = crs;
            }
            println!("==> Pipeline: {} → {}", raster.display(), out_dir.display());
            let outputs = pipeline::run(&raster, &boundary, &out_dir, &config)?;
            output::print_written("Clipped", &outputs.clipped_raster, &outputs.clipped);
            output::print_written(
                "Reprojected",
                &outputs.reprojected_raster,
                &outputs.reprojected,
            );
            output::print_compression_report(
                &outputs.report,
                &outputs.reprojected,
                &outputs.compressed,
            );
            println!("==> Pipeline complete: {}", out_dir.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `tracing` events to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
