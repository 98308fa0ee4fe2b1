//! CLI argument definitions.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use framegrid_cli::config::{DEFAULT_API_URL, DEFAULT_STORE_DIR};
use framegrid_cli::service::{DEFAULT_CLIP_COUNT, DEFAULT_CLIP_DURATION};
use framegrid_core::grid::DEFAULT_CELL_SIZE;

#[derive(Parser)]
#[command(
    name = "framegrid",
    version,
    about = "Crop, rotate and tile video highlight frames into a 3x3 grid",
    long_about = "Extract highlight frames from a video through the highlight service, \
                  save a square crop and rotation per frame, and export a 3x3 grid JPEG.\n\n\
                  Saved crops and rotations live in the store directory and are shared \
                  by every command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Directory holding saved crops and rotations.
    #[arg(
        long = "store-dir",
        env = "FRAMEGRID_STORE_DIR",
        default_value = DEFAULT_STORE_DIR,
        value_name = "DIR",
        global = true
    )]
    pub store_dir: PathBuf,

    /// Base URL of the highlight service.
    #[arg(
        long = "api-url",
        env = "FRAMEGRID_API_URL",
        default_value = DEFAULT_API_URL,
        value_name = "URL",
        global = true
    )]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a video and extract highlight frames.
    Extract(ExtractArgs),

    /// Save a crop, zoom and rotation for one frame.
    Edit(EditArgs),

    /// Print the saved edits of frames.
    Show(ShowArgs),

    /// Composite up to nine frames into a grid JPEG.
    Grid(GridArgs),
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Video file to upload.
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Number of highlight clips to cut.
    #[arg(long = "clips", default_value_t = DEFAULT_CLIP_COUNT)]
    pub clips: u32,

    /// Length of each clip in seconds.
    #[arg(long = "clip-duration", default_value_t = DEFAULT_CLIP_DURATION)]
    pub clip_duration: f64,

    /// Also write the frame references to this file, one per line.
    #[arg(long = "list", value_name = "FILE")]
    pub list: Option<PathBuf>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Frame reference (service path, URL or file).
    #[arg(value_name = "IMAGE")]
    pub image: String,

    /// Square crop in natural pixels as X,Y,SIZE (default: the current crop).
    #[arg(long = "crop", value_name = "X,Y,SIZE")]
    pub crop: Option<CropArg>,

    /// Zoom factor, clamped to 1-3 (default: the current zoom).
    #[arg(long = "zoom")]
    pub zoom: Option<f64>,

    /// Quarter turns clockwise to add.
    #[arg(long = "rotate", default_value_t = 0)]
    pub rotate: u32,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Frame references.
    #[arg(value_name = "IMAGE", required = true)]
    pub images: Vec<String>,
}

#[derive(Args)]
pub struct GridArgs {
    /// Frame references, in cell order.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<String>,

    /// Read frame references from a file, one per line, after any given
    /// on the command line.
    #[arg(long = "list", value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Cell side in pixels.
    #[arg(
        long = "cell-size",
        env = "FRAMEGRID_CELL_SIZE",
        default_value_t = DEFAULT_CELL_SIZE,
        value_name = "PX"
    )]
    pub cell_size: u32,

    /// Directory to write the grid into.
    #[arg(long = "out", value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// `X,Y,SIZE` square crop in natural pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropArg {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl FromStr for CropArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, size] = parts.as_slice() else {
            return Err(format!("expected X,Y,SIZE, got {s:?}"));
        };
        let number = |v: &str| {
            v.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("{v:?} is not a number"))
        };
        Ok(Self {
            x: number(*x)?,
            y: number(*y)?,
            size: number(*size)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crop_arg_parses() {
        assert_eq!(
            "10, 20.5,300".parse::<CropArg>(),
            Ok(CropArg {
                x: 10.0,
                y: 20.5,
                size: 300.0
            })
        );
        assert!("10,20".parse::<CropArg>().is_err());
        assert!("a,b,c".parse::<CropArg>().is_err());
        assert!("1,2,NaN".parse::<CropArg>().is_err());
    }

    #[test]
    fn test_grid_defaults() {
        let cli = Cli::try_parse_from(["framegrid", "grid", "a.jpg", "b.jpg"]).unwrap();
        let Command::Grid(args) = cli.command else {
            panic!("expected grid command");
        };
        assert_eq!(args.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(args.cell_size, DEFAULT_CELL_SIZE);
        assert_eq!(args.out, PathBuf::from("."));
    }

    #[test]
    fn test_edit_flags() {
        let cli = Cli::try_parse_from([
            "framegrid",
            "edit",
            "/media/highlight_images/v/frame_3.jpg",
            "--crop",
            "160,160,320",
            "--zoom",
            "2",
            "--rotate",
            "3",
        ])
        .unwrap();
        let Command::Edit(args) = cli.command else {
            panic!("expected edit command");
        };
        assert_eq!(args.crop.map(|c| c.size), Some(320.0));
        assert_eq!(args.zoom, Some(2.0));
        assert_eq!(args.rotate, 3);
    }
}
