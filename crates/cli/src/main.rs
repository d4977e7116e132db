//! nkctl - Nitrokey firmware tool
//!
//! Inspects, verifies and downloads firmware for Nitrokey 3 and Nitrokey
//! Passkey devices.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;
mod ui;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::FirmwareCommands;
use crate::error::{CliError, exit_code_for};

#[derive(Parser, Debug)]
#[command(name = "nkctl")]
#[command(about = "Nitrokey firmware tool - verify, inspect and download firmware")]
#[command(version)]
#[command(long_about = "
nkctl works with the firmware of Nitrokey 3 and Nitrokey Passkey devices.
It verifies release containers and image signatures, plans filesystem
migrations and runs the version checks of an update without a device.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(long, global = true, help = "Output in JSON format for machine parsing")]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Release API endpoint (for testing)
    #[arg(long, global = true, env = "NKCTL_API_BASE", hide = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Firmware containers, images and releases
    #[command(subcommand)]
    Firmware(FirmwareCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = log_level(cli.verbose);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("nkctl={level},nitrokey_firmware_update={level}"))
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            let reported = e
                .downcast_ref::<CliError>()
                .is_some_and(CliError::is_reported);
            if cli.json {
                if !reported {
                    output::print_error_json(&e, code);
                }
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Firmware(cmd) => {
            commands::firmware::execute(cmd, cli.json, cli.api_base.as_deref())
        }
        Commands::Completion { shell } => {
            completion::write_completion(*shell, &mut std::io::stdout().lock());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nitrokey_device::{Model, Variant};
    use nitrokey_firmware_update::Warning;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_global_json_flag_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["nkctl", "firmware", "verify", "fw.zip", "--json"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 0);
        Ok(())
    }

    #[test]
    fn parse_verbose_levels() -> TestResult {
        for (args, level) in [
            (&["nkctl"][..], "warn"),
            (&["nkctl", "-v"][..], "info"),
            (&["nkctl", "-vv"][..], "debug"),
            (&["nkctl", "-vvv"][..], "trace"),
        ] {
            let mut argv = args.to_vec();
            argv.extend(["completion", "bash"]);
            let cli = Cli::try_parse_from(argv)?;
            assert_eq!(log_level(cli.verbose), level);
        }
        Ok(())
    }

    #[test]
    fn parse_verify_defaults_to_nk3() -> TestResult {
        let cli = Cli::try_parse_from(["nkctl", "firmware", "verify", "fw.zip"])?;
        match &cli.command {
            Commands::Firmware(FirmwareCommands::Verify { container, model }) => {
                assert_eq!(container.to_str(), Some("fw.zip"));
                assert_eq!(*model, Model::Nk3);
            }
            _ => return Err("expected Firmware Verify command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_model_by_short_id_or_name() -> TestResult {
        for model in ["nkpk", "Nitrokey Passkey"] {
            let cli = Cli::try_parse_from(["nkctl", "firmware", "verify", "fw.zip", "-m", model])?;
            assert!(matches!(
                cli.command,
                Commands::Firmware(FirmwareCommands::Verify {
                    model: Model::Nkpk,
                    ..
                })
            ));
        }
        Ok(())
    }

    #[test]
    fn parse_migrations() -> TestResult {
        let cli = Cli::try_parse_from([
            "nkctl",
            "firmware",
            "migrations",
            "--variant",
            "nrf52",
            "--current",
            "1.2.2",
            "--new",
            "v1.3.0",
        ])?;
        match &cli.command {
            Commands::Firmware(FirmwareCommands::Migrations {
                model,
                variant,
                current,
                new,
            }) => {
                assert_eq!(*model, Model::Nk3);
                assert_eq!(*variant, Variant::Nrf52);
                assert_eq!(current.as_ref().map(ToString::to_string).as_deref(), Some("v1.2.2"));
                assert_eq!(new.to_string(), "v1.3.0");
            }
            _ => return Err("expected Firmware Migrations command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_check_with_ignored_warnings() -> TestResult {
        let cli = Cli::try_parse_from([
            "nkctl",
            "firmware",
            "check",
            "fw.zip",
            "--ignore-warning",
            "sdk-version",
            "--ignore-warning",
            "ifs-migration-v2",
            "--ignore-pynitrokey-version",
        ])?;
        match &cli.command {
            Commands::Firmware(FirmwareCommands::Check {
                ignore_warnings,
                ignore_pynitrokey_version,
                current,
                yes,
                ..
            }) => {
                assert_eq!(
                    ignore_warnings,
                    &[Warning::SdkVersion, Warning::IfsMigrationV2]
                );
                assert!(ignore_pynitrokey_version);
                assert!(current.is_none());
                assert!(!yes);
            }
            _ => return Err("expected Firmware Check command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_download_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["nkctl", "firmware", "download", "--model", "nkpk"])?;
        match &cli.command {
            Commands::Firmware(FirmwareCommands::Download {
                model,
                version,
                dir,
                overwrite,
                yes,
            }) => {
                assert_eq!(*model, Model::Nkpk);
                assert!(version.is_none());
                assert_eq!(dir.to_str(), Some("."));
                assert!(!overwrite);
                assert!(!yes);
            }
            _ => return Err("expected Firmware Download command".into()),
        }
        Ok(())
    }

    #[test]
    fn reject_unknown_warning() {
        let result = Cli::try_parse_from([
            "nkctl",
            "firmware",
            "check",
            "fw.zip",
            "--ignore-warning",
            "ifs",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_model() {
        let result = Cli::try_parse_from(["nkctl", "firmware", "verify", "fw.zip", "-m", "nk2"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_migrations_without_new_version() {
        let result =
            Cli::try_parse_from(["nkctl", "firmware", "migrations", "--variant", "lpc55"]);
        assert!(result.is_err());
    }

    #[test]
    fn reject_missing_completion_shell() {
        assert!(Cli::try_parse_from(["nkctl", "completion"]).is_err());
    }
}
