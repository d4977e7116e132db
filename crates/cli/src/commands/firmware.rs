//! Firmware commands
//!
//! - `firmware verify <container>` - check checksums, versions and signatures
//! - `firmware image <file>` - show version and signer of a single image
//! - `firmware migrations` - plan the filesystem migrations of an update
//! - `firmware check <container>` - run the version checks of an update
//! - `firmware download` - fetch a release container

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use nitrokey_device::{Model, Variant};
use nitrokey_firmware_update::{
    FirmwareContainer, Migration, ReleaseRepository, UpdateConfig, UpdateUi, Warning,
    check_client_requirements, compare_versions, download_to_dir, extra_information,
    finalization_wait_retries, firmware_repository, migrations_for, model_data, parse_filename,
    parse_firmware_image, validate_firmware_image,
};
use nitrokey_version::Version;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::commands::FirmwareCommands;
use crate::error::CliError;
use crate::output::{self, ImageReport};
use crate::ui::TerminalUi;

/// Execute firmware command
pub fn execute(cmd: &FirmwareCommands, json: bool, api_base: Option<&str>) -> Result<()> {
    match cmd {
        FirmwareCommands::Verify { container, model } => verify(container, *model, json),
        FirmwareCommands::Image {
            path,
            variant,
            model,
        } => inspect_image(path, *variant, *model, json),
        FirmwareCommands::Migrations {
            model,
            variant,
            current,
            new,
        } => {
            plan_migrations(*model, *variant, current.as_ref(), new, json);
            Ok(())
        }
        FirmwareCommands::Check {
            container,
            model,
            current,
            ignore_warnings,
            ignore_pynitrokey_version,
            yes,
        } => {
            let mut config = ignore_warnings
                .iter()
                .fold(UpdateConfig::default(), |config, &warning| {
                    config.ignore_warning(warning)
                });
            config.ignore_pynitrokey_version = *ignore_pynitrokey_version;
            check(container, *model, current.as_ref(), &config, *yes, json)
        }
        FirmwareCommands::Download {
            model,
            version,
            dir,
            overwrite,
            yes,
        } => download(
            *model,
            version.as_deref(),
            dir,
            *overwrite,
            *yes,
            json,
            api_base,
        ),
    }
}

fn read_container(path: &Path, model: Model) -> Result<FirmwareContainer> {
    FirmwareContainer::from_path(path, model)
        .with_context(|| format!("Failed to read firmware container {}", path.display()))
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn verify(path: &Path, model: Model, json: bool) -> Result<()> {
    let container = read_container(path, model)?;

    let reports: Vec<ImageReport> = container
        .images
        .iter()
        .map(|(&variant, data)| {
            match validate_firmware_image(variant, data, &container.version, model) {
                Ok(metadata) => ImageReport {
                    variant,
                    metadata: Some(metadata),
                    error: None,
                },
                Err(e) => ImageReport {
                    variant,
                    metadata: parse_firmware_image(variant, data, model).ok(),
                    error: Some(error_chain(&e)),
                },
            }
        })
        .collect();
    let failed = reports.iter().filter(|report| !report.is_valid()).count();
    info!(version = %container.version, images = reports.len(), failed, "Verified firmware container");

    if json {
        output::print_json(&json!({
            "success": failed == 0,
            "model": model,
            "version": container.version,
            "images": reports,
        }));
    } else {
        output::print_container_human(&container.version, &reports);
    }

    if failed > 0 {
        return Err(CliError::ValidationFailed {
            count: failed,
            total: reports.len(),
        }
        .into());
    }
    Ok(())
}

/// Guess the variant of an image from its file name.
///
/// Release file names carry the variant. Otherwise an `.sb2` file can only
/// be an LPC55 image, while a `.zip` file is ambiguous.
fn guess_variant(path: &Path) -> Result<Variant, CliError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if let Some((variant, version)) = parse_filename(name) {
        debug!(%variant, %version, "Variant from file name");
        return Ok(variant);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("sb2") => Ok(Variant::Lpc55),
        _ => Err(CliError::UnknownVariant(path.display().to_string())),
    }
}

fn inspect_image(path: &Path, variant: Option<Variant>, model: Model, json: bool) -> Result<()> {
    let variant = match variant {
        Some(variant) => variant,
        None => guess_variant(path)?,
    };
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let metadata = parse_firmware_image(variant, &data, model)
        .with_context(|| format!("Failed to parse {variant} firmware image {}", path.display()))?;

    if json {
        output::print_json(&json!({
            "success": true,
            "variant": variant,
            "version": metadata.version,
            "signed_by": metadata.signed_by,
            "signed_by_nitrokey": metadata.signed_by_nitrokey,
        }));
    } else {
        output::print_metadata_human(variant, &metadata);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct MigrationPlan {
    migrations: Vec<Migration>,
    finalization_retries: usize,
    information: Vec<String>,
}

impl MigrationPlan {
    fn new(model: Model, variant: Variant, current: Option<&Version>, new: &Version) -> Self {
        let migrations = migrations_for(model, variant, current, new);
        Self {
            finalization_retries: finalization_wait_retries(&migrations),
            information: extra_information(&migrations),
            migrations: migrations.into_iter().collect(),
        }
    }
}

fn plan_migrations(
    model: Model,
    variant: Variant,
    current: Option<&Version>,
    new: &Version,
    json: bool,
) {
    let plan = MigrationPlan::new(model, variant, current, new);
    if json {
        output::print_json(&json!({
            "success": true,
            "model": model,
            "variant": variant,
            "current": current,
            "new": new,
            "plan": plan,
        }));
    } else {
        output::print_migrations_human(
            &plan.migrations,
            plan.finalization_retries,
            &plan.information,
        );
    }
}

fn check(
    path: &Path,
    model: Model,
    current: Option<&Version>,
    config: &UpdateConfig,
    yes: bool,
    json: bool,
) -> Result<()> {
    let container = read_container(path, model)?;
    let ui = TerminalUi::new(yes, json);

    let same = compare_versions(current, &container.version)?;
    if let Some(same) = &same {
        ui.confirm_update_same_version(same)?;
    }
    check_client_requirements(&container, config, &ui)?;

    let plans: BTreeMap<Variant, MigrationPlan> = container
        .variants()
        .map(|variant| {
            (
                variant,
                MigrationPlan::new(model, variant, current, &container.version),
            )
        })
        .collect();
    let ignored: Vec<Warning> = config.ignore_warnings.iter().copied().collect();

    if json {
        output::print_json(&json!({
            "success": true,
            "model": model,
            "current": current,
            "version": container.version,
            "reinstall": same.is_some(),
            "ignored_warnings": ignored,
            "variants": plans,
        }));
    } else {
        println!(
            "{} {} can be installed",
            "✓".green(),
            container.version.to_string().bold()
        );
        for (variant, plan) in &plans {
            println!("{}", format!("{variant}:").bold());
            output::print_migrations_human(
                &plan.migrations,
                plan.finalization_retries,
                &plan.information,
            );
        }
    }
    Ok(())
}

fn download(
    model: Model,
    tag: Option<&str>,
    dir: &Path,
    overwrite: bool,
    yes: bool,
    json: bool,
    api_base: Option<&str>,
) -> Result<()> {
    let mut repository = firmware_repository(model)?;
    if let Some(api_base) = api_base {
        repository = repository.with_api_base(api_base);
    }

    let release = repository
        .release_or_latest(tag)
        .with_context(|| format!("Failed to look up the {model} firmware release"))?;
    let version = release
        .version()
        .with_context(|| format!("Failed to parse version from release tag {}", release.tag))?;
    let asset = release.require_asset(model_data(model).firmware_pattern())?;

    let ui = TerminalUi::new(yes, json);
    ui.confirm_download(None, &version)?;
    let path = {
        let mut bar = ui.download_progress_bar(&format!("Download {}", release.tag));
        download_to_dir(&repository, &asset, dir, overwrite, &mut |current, total| {
            bar.update(current, total);
        })?
    };

    if json {
        output::print_json(&json!({
            "success": true,
            "version": version,
            "url": asset.url,
            "path": path,
        }));
    } else {
        println!(
            "{} Downloaded {} to {}",
            "✓".green(),
            version,
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_guess_variant_from_release_name() {
        let path = PathBuf::from("/tmp/firmware-nk3am-nrf52-v1.8.2.zip");
        assert!(matches!(guess_variant(&path), Ok(Variant::Nrf52)));
    }

    #[test]
    fn test_guess_variant_from_extension() {
        assert!(matches!(
            guess_variant(Path::new("custom.sb2")),
            Ok(Variant::Lpc55)
        ));
        assert!(matches!(
            guess_variant(Path::new("custom.zip")),
            Err(CliError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_migration_plan_from_bootloader() {
        let plan = MigrationPlan::new(Model::Nk3, Variant::Nrf52, None, &Version::new(1, 8, 2));
        assert_eq!(plan.migrations, [Migration::NrfIfsMigration]);
        assert_eq!(plan.finalization_retries, 500);
        assert!(!plan.information.is_empty());
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let error = nitrokey_firmware_update::ImageError::ParseFailure {
            source: nitrokey_firmware_update::ParseError::InvalidHash,
        };
        assert_eq!(
            error_chain(&error),
            "Failed to parse firmware image: Invalid hash for firmware image"
        );
    }
}
