//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use nitrokey_device::Variant;
use nitrokey_firmware_update::{FirmwareMetadata, Migration, UpdateError};
use nitrokey_version::Version;
use serde::Serialize;
use serde_json::json;

/// Print a successful response as pretty JSON.
pub fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

fn update_error(error: &Error) -> Option<&UpdateError> {
    error.chain().find_map(|cause| cause.downcast_ref::<UpdateError>())
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, code: u8) {
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let update = update_error(error);
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "causes": causes,
            "exit_code": code,
            "severity": update.map(|e| e.severity().to_string()),
            "hint": update.and_then(UpdateError::hint),
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
    if let Some(hint) = update_error(error).and_then(UpdateError::hint) {
        eprintln!("{} {}", "Hint:".cyan(), hint);
    }
}

/// Result of validating one image of a container.
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub variant: Variant,
    #[serde(flatten)]
    pub metadata: Option<FirmwareMetadata>,
    pub error: Option<String>,
}

impl ImageReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

fn signer_label(metadata: &FirmwareMetadata) -> ColoredString {
    match &metadata.signed_by {
        None => "unsigned".red(),
        Some(signer) if metadata.signed_by_nitrokey => signer.green(),
        Some(signer) => signer.yellow(),
    }
}

pub fn print_metadata_human(variant: Variant, metadata: &FirmwareMetadata) {
    println!("{} {}", "Variant:".bold(), variant);
    println!("  Version:   {}", metadata.version);
    println!("  Signed by: {}", signer_label(metadata));
    println!(
        "  Official:  {}",
        if metadata.signed_by_nitrokey {
            "yes".green()
        } else {
            "no".red()
        }
    );
}

pub fn print_container_human(version: &Version, reports: &[ImageReport]) {
    println!("{} {}", "Firmware container".bold(), version);
    for report in reports {
        let mark = if report.is_valid() { "✓".green() } else { "✗".red() };
        match (&report.metadata, &report.error) {
            (_, Some(error)) => println!("  {mark} {}: {error}", report.variant),
            (Some(metadata), None) => println!(
                "  {mark} {}: {} signed by {}",
                report.variant,
                metadata.version,
                signer_label(metadata)
            ),
            (None, None) => println!("  {mark} {}", report.variant),
        }
    }
}

pub fn print_migrations_human(migrations: &[Migration], retries: usize, information: &[String]) {
    if migrations.is_empty() {
        println!("{}", "No migrations".green());
    } else {
        println!("{}", "Migrations:".bold());
        for migration in migrations {
            println!("  - {migration}");
        }
    }
    println!("Finalization retries: {retries}");
    for line in information {
        println!("{line}");
    }
}
