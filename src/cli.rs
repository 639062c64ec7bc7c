use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use wallsort_core::{
    CollisionPolicy, InvalidTarget, ResolutionTarget, SortConfig, DEFAULT_TARGET_HEIGHT,
    DEFAULT_TARGET_WIDTH,
};

/// Folder under the pictures directory used when no main directory is given.
const DEFAULT_WALLPAPER_FOLDER: &str = "wallpapers";

/// Move wallpapers below a target resolution into a quarantine folder, and
/// bring them back once they qualify.
#[derive(Debug, Parser)]
#[command(name = "wallsort", version)]
pub struct Cli {
    /// Directory holding acceptable wallpapers [default: <pictures>/wallpapers]
    #[arg(env = "WALLSORT_DIR")]
    pub main_dir: Option<PathBuf>,

    /// Quarantine directory [default: <MAIN_DIR>/low_res]
    #[arg(long, value_name = "DIR")]
    pub quarantine: Option<PathBuf>,

    /// Target width in pixels
    #[arg(long, default_value_t = DEFAULT_TARGET_WIDTH)]
    pub width: u32,

    /// Target height in pixels
    #[arg(long, default_value_t = DEFAULT_TARGET_HEIGHT)]
    pub height: u32,

    /// Accepted shortfall below the target, as a fraction (0.05) or percentage (5%)
    #[arg(long, default_value = "0.05", value_parser = parse_tolerance)]
    pub tolerance: f64,

    /// What to do when the destination already has a file with the same name
    #[arg(long, value_enum, default_value_t = CollisionArg::Overwrite)]
    pub on_collision: CollisionArg,

    /// Extensions eligible for quarantine, comma separated [default: png,jpg,jpeg,bmp,webp]
    #[arg(long = "ext", value_delimiter = ',', value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Report what would move without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Program used to read image dimensions
    #[arg(long, env = "WALLSORT_IDENTIFY", default_value = "identify", value_name = "PROGRAM")]
    pub identify: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionArg {
    Overwrite,
    Rename,
    Skip,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> Self {
        match value {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::Rename => CollisionPolicy::Rename,
            CollisionArg::Skip => CollisionPolicy::Skip,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug)]
pub struct CliConfig {
    pub sort: SortConfig,
    pub report: Option<PathBuf>,
    pub identify: PathBuf,
}

#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("no main directory given and no pictures directory could be determined")]
    MissingRoot,
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] InvalidTarget),
}

impl Cli {
    pub fn into_config(self) -> Result<CliConfig, CliError> {
        let main_dir = self
            .main_dir
            .or_else(default_main_dir)
            .ok_or(CliError::MissingRoot)?;
        let target = ResolutionTarget::new(self.width, self.height, self.tolerance)?;

        let mut sort = SortConfig::new(main_dir)
            .with_target(target)
            .with_collision_policy(self.on_collision.into())
            .with_dry_run(self.dry_run);
        if let Some(quarantine) = self.quarantine {
            sort = sort.with_quarantine_dir(quarantine);
        }
        if !self.extensions.is_empty() {
            sort = sort.with_extensions(self.extensions);
        }

        Ok(CliConfig {
            sort,
            report: self.report,
            identify: self.identify,
        })
    }
}

fn default_main_dir() -> Option<PathBuf> {
    dirs::picture_dir().map(|dir| dir.join(DEFAULT_WALLPAPER_FOLDER))
}

fn parse_tolerance(value: &str) -> Result<f64, String> {
    let value = value.trim();
    let parsed = match value.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().map(|p| p / 100.0),
        None => value.parse::<f64>(),
    };
    parsed.map_err(|_| format!("`{}` is not a fraction or percentage", value))
}
