//! Integration tests for nkctl
//!
//! Containers and images come from the signed fixture builders. Their keys
//! are not production keys, so `verify` rejects them, which is exactly what
//! the exit code tests rely on.

use assert_cmd::Command;
use nitrokey_device::{Model, Variant};
use nitrokey_test_helpers::prelude::*;
use nitrokey_version::Version;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Custom predicate to check if output is valid JSON
fn is_json() -> impl predicates::Predicate<[u8]> {
    predicates::function::function(|s: &[u8]| {
        std::str::from_utf8(s)
            .ok()
            .is_some_and(|text| serde_json::from_str::<Value>(text).is_ok())
    })
}

fn nkctl() -> Command {
    must(Command::cargo_bin("nkctl"))
}

fn stdout_json(output: &std::process::Output) -> Value {
    must(serde_json::from_slice(&output.stdout))
}

fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    must(fs::write(&path, data));
    path
}

fn write_container(dir: &TempDir, builder: &ContainerBuilder) -> PathBuf {
    write_file(dir, &builder.asset_name(), &builder.build())
}

fn v(s: &str) -> Version {
    must(Version::from_v_str(s))
}

mod general_tests {
    use super::*;

    #[test]
    fn test_cli_help() {
        nkctl()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nitrokey 3 and Nitrokey Passkey"));
    }

    #[test]
    fn test_cli_version() {
        nkctl()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nkctl"));
    }

    #[test]
    fn test_completion_generation() {
        nkctl()
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nkctl"));
    }

    #[test]
    fn test_unknown_model_is_a_usage_error() {
        nkctl()
            .args(["firmware", "verify", "fw.zip", "--model", "nk2"])
            .assert()
            .code(2);
    }
}

mod verify_tests {
    use super::*;

    #[test]
    fn test_fixture_keys_are_not_official() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nk3, v("v1.8.2")));

        nkctl()
            .args(["firmware", "verify"])
            .arg(&path)
            .assert()
            .code(4)
            .stdout(predicate::str::contains("Firmware container v1.8.2"))
            .stdout(predicate::str::contains("not signed by Nitrokey"))
            .stderr(predicate::str::contains("2 of 2 firmware images failed validation"));
        Ok(())
    }

    #[test]
    fn test_json_report_lists_every_image() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nk3, v("v1.8.2")));

        let output = nkctl()
            .args(["--json", "firmware", "verify"])
            .arg(&path)
            .output()?;
        assert_eq!(output.status.code(), Some(4));

        let report = stdout_json(&output);
        assert_eq!(report["success"], false);
        assert_eq!(report["model"], "Nitrokey 3");
        assert_eq!(report["version"], "v1.8.2");
        let images = must_some(report["images"].as_array(), "images");
        assert_eq!(images.len(), 2);
        let lpc55 = must_some(images.first(), "lpc55 report");
        assert_eq!(lpc55["variant"], "lpc55");
        assert_eq!(lpc55["version"], "v1.8.2");
        let nrf52 = must_some(images.get(1), "nrf52 report");
        assert_eq!(nrf52["variant"], "nrf52");
        assert_eq!(nrf52["signed_by"], "unknown");
        assert_eq!(nrf52["signed_by_nitrokey"], false);
        Ok(())
    }

    #[test]
    fn test_corrupt_checksum() -> TestResult {
        let dir = TempDir::new()?;
        let builder = ContainerBuilder::signed(Model::Nkpk, v("v1.0.0"));
        let image = builder.filename(Variant::Nrf52);
        let path = write_container(&dir, &builder.corrupt_checksum(image));

        nkctl()
            .args(["firmware", "verify", "-m", "nkpk"])
            .arg(&path)
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Checksum verification failed"));
        Ok(())
    }

    #[test]
    fn test_model_mismatch() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nkpk, v("v1.0.0")));

        nkctl()
            .args(["--json", "firmware", "verify"])
            .arg(&path)
            .assert()
            .code(3)
            .stdout(is_json())
            .stdout(predicate::str::contains(
                "Expected firmware container for Nitrokey 3, got Nitrokey Passkey",
            ));
        Ok(())
    }

    #[test]
    fn test_missing_container() {
        nkctl()
            .args(["firmware", "verify", "/nonexistent/firmware-nk3-v1.8.2.zip"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Failed to read firmware container"));
    }
}

mod image_tests {
    use super::*;

    #[test]
    fn test_nrf52_package_from_release_name() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            &image_filename(Model::Nkpk, Variant::Nrf52, &v("v1.0.0")),
            &Nrf52PackageBuilder::new(Version::new(1, 0, 0)).build(),
        );

        let output = nkctl()
            .args(["--json", "firmware", "image", "-m", "nkpk"])
            .arg(&path)
            .output()?;
        assert!(output.status.success());

        let report = stdout_json(&output);
        assert_eq!(report["variant"], "nrf52");
        assert_eq!(report["version"], "v1.0.0");
        assert_eq!(report["signed_by"], "unknown");
        assert_eq!(report["signed_by_nitrokey"], false);
        Ok(())
    }

    #[test]
    fn test_sb2_reports_rkth() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            "custom.sb2",
            &Sb2ImageBuilder::new(Version::new(1, 8, 2)).build(),
        );

        nkctl()
            .args(["firmware", "image"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("v1.8.2"))
            .stdout(predicate::str::contains("unknown issuer (RKTH: "));
        Ok(())
    }

    #[test]
    fn test_unsigned_package() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            "package.zip",
            &Nrf52PackageBuilder::new(Version::new(1, 0, 0)).unsigned().build(),
        );

        let output = nkctl()
            .args(["--json", "firmware", "image", "--variant", "nrf52"])
            .arg(&path)
            .output()?;
        assert!(output.status.success());
        assert_eq!(stdout_json(&output)["signed_by"], Value::Null);
        Ok(())
    }

    #[test]
    fn test_ambiguous_zip_needs_variant() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "package.zip", b"not a zip");

        nkctl()
            .args(["firmware", "image"])
            .arg(&path)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("use --variant"));
        Ok(())
    }

    #[test]
    fn test_broken_image() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "broken.sb2", &[0u8; 64]);

        nkctl()
            .args(["firmware", "image"])
            .arg(&path)
            .assert()
            .code(4)
            .stderr(predicate::str::contains("Failed to parse lpc55 firmware image"));
        Ok(())
    }
}

mod migration_tests {
    use super::*;

    #[test]
    fn test_nrf_ifs_migration() -> TestResult {
        let output = nkctl()
            .args([
                "--json",
                "firmware",
                "migrations",
                "--variant",
                "nrf52",
                "--current",
                "1.2.2",
                "--new",
                "1.3.0",
            ])
            .output()?;
        assert!(output.status.success());

        let report = stdout_json(&output);
        assert_eq!(report["current"], "v1.2.2");
        assert_eq!(report["plan"]["migrations"], serde_json::json!(["nrf-ifs-migration"]));
        assert_eq!(report["plan"]["finalization_retries"], 500);
        Ok(())
    }

    #[test]
    fn test_passkey_has_no_migrations() {
        nkctl()
            .args([
                "firmware",
                "migrations",
                "-m",
                "nkpk",
                "--variant",
                "nrf52",
                "--new",
                "v1.0.0",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("No migrations"))
            .stdout(predicate::str::contains("Finalization retries: 60"));
    }
}

mod check_tests {
    use super::*;

    #[test]
    fn test_upgrade_is_accepted() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nk3, v("v1.8.2")));

        let output = nkctl()
            .args(["--json", "firmware", "check", "--current", "v1.8.1"])
            .arg(&path)
            .output()?;
        assert!(output.status.success());

        let report = stdout_json(&output);
        assert_eq!(report["reinstall"], false);
        assert_eq!(
            report["variants"]["nrf52"]["migrations"],
            serde_json::json!(["ifs-migration-v2"])
        );
        Ok(())
    }

    #[test]
    fn test_downgrade_is_rejected() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nk3, v("v1.7.0")));

        nkctl()
            .args(["firmware", "check", "--current", "v1.8.2"])
            .arg(&path)
            .assert()
            .code(5)
            .stderr(predicate::str::contains(
                "The firmware version v1.7.0 is older than the firmware version v1.8.2 currently installed.",
            ));
        Ok(())
    }

    #[test]
    fn test_rejection_in_json() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nk3, v("v1.7.0")));

        let output = nkctl()
            .args(["--json", "firmware", "check", "--current", "v1.8.2"])
            .arg(&path)
            .output()?;
        assert_eq!(output.status.code(), Some(5));

        let report = stdout_json(&output);
        assert_eq!(report["success"], false);
        assert_eq!(report["error"]["exit_code"], 5);
        assert_eq!(report["error"]["severity"], "ERROR");
        assert_eq!(report["error"]["hint"], Value::Null);
        Ok(())
    }

    #[test]
    fn test_sdk_requirement_is_a_warning() -> TestResult {
        let dir = TempDir::new()?;
        let builder = ContainerBuilder::signed(Model::Nk3, v("v1.8.2")).sdk(v("v99.0.0"));
        let path = write_container(&dir, &builder);

        nkctl()
            .args(["firmware", "check", "--current", "v1.8.1"])
            .arg(&path)
            .assert()
            .code(5)
            .stderr(predicate::str::contains("Your Nitrokey SDK version is outdated."));

        nkctl()
            .args([
                "firmware",
                "check",
                "--current",
                "v1.8.1",
                "--ignore-warning",
                "sdk-version",
            ])
            .arg(&path)
            .assert()
            .success()
            .stderr(predicate::str::contains("Warning:"));
        Ok(())
    }

    #[test]
    fn test_outdated_client() -> TestResult {
        let dir = TempDir::new()?;
        let builder = ContainerBuilder::signed(Model::Nk3, v("v1.8.2")).pynitrokey(v("v0.9.0"));
        let path = write_container(&dir, &builder);

        nkctl()
            .args(["firmware", "check"])
            .arg(&path)
            .assert()
            .code(5)
            .stderr(predicate::str::contains("requires pynitrokey v0.9.0"));

        nkctl()
            .args(["firmware", "check", "--ignore-pynitrokey-version", "--yes"])
            .arg(&path)
            .assert()
            .success();
        Ok(())
    }

    #[test]
    fn test_same_version_is_confirmed() -> TestResult {
        let dir = TempDir::new()?;
        let path = write_container(&dir, &ContainerBuilder::signed(Model::Nkpk, v("v1.0.0")));

        let output = nkctl()
            .args(["--json", "firmware", "check", "-m", "nkpk", "--current", "v1.0.0", "--yes"])
            .arg(&path)
            .output()?;
        assert!(output.status.success());
        assert_eq!(stdout_json(&output)["reinstall"], true);
        Ok(())
    }
}

mod download_tests {
    use super::*;

    #[test]
    fn test_unreachable_release_server() -> TestResult {
        let dir = TempDir::new()?;

        nkctl()
            .env("NKCTL_API_BASE", "http://127.0.0.1:9")
            .args(["firmware", "download", "--yes", "--dir"])
            .arg(dir.path())
            .assert()
            .code(6)
            .stderr(predicate::str::contains("Failed to look up the Nitrokey 3 firmware release"));
        Ok(())
    }
}
