//! Command definitions for nkctl

pub mod firmware;

use std::path::PathBuf;

use clap::Subcommand;
use nitrokey_device::{Model, Variant};
use nitrokey_firmware_update::Warning;
use nitrokey_version::Version;

/// Parse a version with or without the `v` prefix.
pub fn parse_version(s: &str) -> Result<Version, String> {
    let parsed = match s.strip_prefix('v') {
        Some(_) => Version::from_v_str(s),
        None => Version::parse(s),
    };
    parsed.map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum FirmwareCommands {
    /// Verify a firmware container and the signatures of all its images
    Verify {
        /// Firmware container (.zip)
        container: PathBuf,
        /// Device model the container is meant for
        #[arg(short, long, default_value = "nk3")]
        model: Model,
    },

    /// Show version and signer of a single firmware image
    Image {
        /// Firmware image (.sb2 or .zip)
        path: PathBuf,
        /// Hardware variant, guessed from the file name if omitted
        #[arg(long)]
        variant: Option<Variant>,
        /// Device model whose trust anchors are used
        #[arg(short, long, default_value = "nk3")]
        model: Model,
    },

    /// List the migrations an update would trigger
    Migrations {
        /// Device model
        #[arg(short, long, default_value = "nk3")]
        model: Model,
        /// Hardware variant
        #[arg(long)]
        variant: Variant,
        /// Installed firmware version, omit for an update from the bootloader
        #[arg(long, value_parser = parse_version)]
        current: Option<Version>,
        /// Firmware version to install
        #[arg(long, value_parser = parse_version)]
        new: Version,
    },

    /// Check whether a container may be installed over a firmware version
    Check {
        /// Firmware container (.zip)
        container: PathBuf,
        /// Device model
        #[arg(short, long, default_value = "nk3")]
        model: Model,
        /// Installed firmware version
        #[arg(long, value_parser = parse_version)]
        current: Option<Version>,
        /// Ignore an update warning (can be repeated)
        #[arg(long = "ignore-warning", value_name = "ID")]
        ignore_warnings: Vec<Warning>,
        /// Accept containers that require a newer pynitrokey
        #[arg(long)]
        ignore_pynitrokey_version: bool,
        /// Confirm all prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// Download a firmware container from the release repository
    Download {
        /// Device model
        #[arg(short, long, default_value = "nk3")]
        model: Model,
        /// Release tag, the latest release if omitted
        #[arg(long)]
        version: Option<String>,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,
        /// Do not ask before downloading
        #[arg(short, long)]
        yes: bool,
    },
}
