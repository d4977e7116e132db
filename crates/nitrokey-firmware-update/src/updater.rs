//! Firmware update orchestration
//!
//! [`Updater::update`] drives a device through the whole update:
//!
//! ```text
//! Idle -> VersionCheck -> BootloaderTransition -> ImageValidation
//!      -> Flashing -> FinalizationWait -> Verified
//! ```
//!
//! Any step can end in `Failed`. Nothing is written to the device before the
//! image for its bootloader variant has been validated, and flashing is never
//! retried.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use nitrokey_device::{BootMode, Bootloader, DeviceHandle, Model, Status, TrussedDevice, Variant};
use nitrokey_errors::DeviceError;
use nitrokey_version::Version;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{PYNITROKEY_COMPAT_VERSION, UpdateConfig};
use crate::container::FirmwareContainer;
use crate::error::{UpdateError, UpdateResult};
use crate::image::validate_firmware_image_with;
use crate::migration::{
    IFS_MIGRATION_V2_MIN_BLOCKS, Migration, extra_information, finalization_wait_retries,
    migrations_for,
};
use crate::model_data::{TrustAnchors, model_data};
use crate::release::{Release, ReleaseRepository};
use crate::retry::Retries;
use crate::ui::{DeviceHandler, UpdateUi};
use crate::warning::Warning;

/// Minimum container version that requires the device status on a Nitrokey 3.
const STATUS_REQUIRED_AFTER: Version = Version::new(1, 3, 1);

/// A step of the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStep {
    /// Reading the installed version and resolving the container
    VersionCheck,
    /// Rebooting into the bootloader and reconnecting
    BootloaderTransition,
    /// Checking the image for the bootloader variant
    ImageValidation,
    /// Writing the image
    Flashing,
    /// Waiting for the updated device
    FinalizationWait,
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStep::VersionCheck => "version check",
            UpdateStep::BootloaderTransition => "bootloader transition",
            UpdateStep::ImageValidation => "image validation",
            UpdateStep::Flashing => "flashing",
            UpdateStep::FinalizationWait => "finalization wait",
        };
        f.write_str(name)
    }
}

/// Update state machine states
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum UpdateState {
    /// No update started
    #[default]
    Idle,

    /// An update is running
    InProgress {
        /// Current step
        step: UpdateStep,
    },

    /// The device reports the new version
    Verified,

    /// The update failed
    Failed {
        /// Step the update failed in, if known
        step: Option<UpdateStep>,
        /// Error description
        error: String,
    },
}

impl UpdateState {
    /// Check if an update is currently in progress
    pub fn is_in_progress(&self) -> bool {
        matches!(self, UpdateState::InProgress { .. })
    }

    /// The running or failed step.
    pub fn step(&self) -> Option<UpdateStep> {
        match self {
            UpdateState::InProgress { step } => Some(*step),
            UpdateState::Failed { step, .. } => *step,
            UpdateState::Idle | UpdateState::Verified => None,
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateState::Idle => f.write_str("idle"),
            UpdateState::InProgress { step } => write!(f, "{step}"),
            UpdateState::Verified => f.write_str("verified"),
            UpdateState::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Where the firmware container comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSource {
    /// A container file
    File(PathBuf),
    /// A container held in memory
    Bytes(Vec<u8>),
    /// A release from the configured repository, the latest one if `tag` is `None`
    Release {
        /// Release tag, e.g. `v1.8.2`
        tag: Option<String>,
    },
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Installed version
    pub version: Version,
    /// Device status after the update
    pub status: Status,
}

/// Compare the installed version with the version of an update.
///
/// Returns the version to show to the operator if the update reinstalls the
/// installed version: the full version if both are complete, the core
/// version otherwise.
///
/// # Errors
///
/// Returns [`UpdateError::DowngradeRejected`] if `new` is older than `current`.
pub fn compare_versions(current: Option<&Version>, new: &Version) -> UpdateResult<Option<Version>> {
    let Some(current) = current else {
        return Ok(None);
    };
    if current.core() > new.core() {
        return Err(UpdateError::DowngradeRejected {
            current: current.clone(),
            new: new.clone(),
        });
    }
    if current != new {
        return Ok(None);
    }
    if current.is_complete() && new.is_complete() {
        Ok(Some(current.clone()))
    } else {
        Ok(Some(current.core()))
    }
}

/// Check that this client is recent enough to install `container`.
///
/// A container with an `sdk` requirement is checked against
/// [`UpdateConfig::sdk_version`] and only raises [`Warning::SdkVersion`].
/// Otherwise a `pynitrokey` requirement newer than
/// [`PYNITROKEY_COMPAT_VERSION`] is an error unless
/// [`UpdateConfig::ignore_pynitrokey_version`] is set, in which case the
/// operator has to confirm it.
///
/// # Errors
///
/// Returns [`UpdateError::Warning`], [`UpdateError::OutdatedClient`] or the
/// refusal of the operator.
pub fn check_client_requirements(
    container: &FirmwareContainer,
    config: &UpdateConfig,
    ui: &dyn UpdateUi,
) -> UpdateResult<()> {
    if let Some(sdk) = &container.sdk {
        if *sdk > config.sdk_version {
            warn!(
                required = %sdk,
                current = %config.sdk_version,
                "Minimum SDK version required for update"
            );
            raise_warning(config, ui, Warning::SdkVersion)?;
        }
    } else if let Some(required) = &container.pynitrokey
        && *required > PYNITROKEY_COMPAT_VERSION
    {
        if !config.ignore_pynitrokey_version {
            return Err(UpdateError::OutdatedClient {
                required: required.clone(),
                current: PYNITROKEY_COMPAT_VERSION,
            });
        }
        ui.confirm_pynitrokey_version(&PYNITROKEY_COMPAT_VERSION, required)?;
    }
    Ok(())
}

fn raise_warning(config: &UpdateConfig, ui: &dyn UpdateUi, warning: Warning) -> UpdateResult<()> {
    if !config.ignores(warning) {
        return Err(UpdateError::Warning(warning));
    }
    warn!(warning = %warning, "Ignoring update warning");
    ui.show_warning(warning);
    Ok(())
}

/// Runs firmware updates.
pub struct Updater<'a> {
    ui: &'a dyn UpdateUi,
    handler: &'a mut dyn DeviceHandler,
    config: UpdateConfig,
    repository: Option<&'a dyn ReleaseRepository>,
    trust_anchors: Option<&'a TrustAnchors>,
    sleeper: Box<dyn FnMut(Duration) + 'a>,
    state: UpdateState,
}

impl<'a> Updater<'a> {
    /// Create an updater with the default configuration and no release repository.
    pub fn new(ui: &'a dyn UpdateUi, handler: &'a mut dyn DeviceHandler) -> Self {
        Self {
            ui,
            handler,
            config: UpdateConfig::default(),
            repository: None,
            trust_anchors: None,
            sleeper: Box::new(std::thread::sleep),
            state: UpdateState::Idle,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: UpdateConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow updates from releases of `repository`.
    pub fn with_repository(mut self, repository: &'a dyn ReleaseRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Validate images against `anchors` instead of the model's keys.
    pub fn with_trust_anchors(mut self, anchors: &'a TrustAnchors) -> Self {
        self.trust_anchors = Some(anchors);
        self
    }

    /// Replace the sleep function used for fixed delays and retries.
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + 'a) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    /// Update `device` with the container from `source`.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed step; see [`UpdateError::step`].
    /// Only [`UpdateError::PostUpdateVersionMismatch`] is returned after the
    /// device was flashed.
    pub fn update(
        &mut self,
        device: DeviceHandle,
        source: &UpdateSource,
    ) -> UpdateResult<UpdateOutcome> {
        let model = device.model();
        info!(%model, device = %device.name(), "Starting firmware update");
        let result = self.run(device, source);
        match &result {
            Ok(outcome) => {
                self.transition(UpdateState::Verified);
                info!(%model, version = %outcome.version, "Firmware update finished");
            }
            Err(e) => {
                let step = e.step().or_else(|| self.state.step());
                self.transition(UpdateState::Failed {
                    step,
                    error: e.to_string(),
                });
                error!(%model, error = %e, step = ?step, "Firmware update failed");
            }
        }
        result
    }

    fn transition(&mut self, state: UpdateState) {
        debug!(from = %self.state, to = %state, "Update state changed");
        self.state = state;
    }

    fn enter(&mut self, step: UpdateStep) {
        self.transition(UpdateState::InProgress { step });
    }

    fn run(&mut self, mut device: DeviceHandle, source: &UpdateSource) -> UpdateResult<UpdateOutcome> {
        let model = device.model();
        self.enter(UpdateStep::VersionCheck);

        let (current, status) = match &mut device {
            DeviceHandle::Bootloader(_) => {
                self.trigger_warning(Warning::UpdateFromBootloader)?;
                (None, None)
            }
            DeviceHandle::Device(device) => {
                let version = device.version().map_err(|e| {
                    UpdateError::device(UpdateStep::VersionCheck, "Failed to read firmware version", e)
                })?;
                let status = device.status().map_err(|e| {
                    UpdateError::device(UpdateStep::VersionCheck, "Failed to read device status", e)
                })?;
                (Some(version), Some(status))
            }
        };
        info!(
            current = %current.as_ref().map(ToString::to_string).unwrap_or_default(),
            "Firmware version before update"
        );

        let container = self.prepare(model, source, current.as_ref())?;

        if status.is_some_and(|status| status.init_status.is_none()) {
            if model == Model::Nk3 {
                if container.version > STATUS_REQUIRED_AFTER {
                    self.trigger_warning(Warning::MissingStatus)?;
                }
            } else {
                warn!(%model, "Missing status for device");
            }
        }

        self.check_minimum_version(&container)?;
        self.ui.confirm_update(current.as_ref(), &container.version)?;

        let status_variant = status.and_then(|status| status.variant);
        let mut migrations = match (&device, status_variant) {
            (_, Some(variant)) => {
                let variant = Variant::try_from(variant)
                    .ok()
                    .ok_or(UpdateError::UnsupportedVariant(variant))?;
                Some(self.check_migrations(model, variant, current.as_ref(), &container, status)?)
            }
            (DeviceHandle::Bootloader(bootloader), None) => Some(self.check_migrations(
                model,
                bootloader.variant(),
                current.as_ref(),
                &container,
                status,
            )?),
            (DeviceHandle::Device(_), None) => None,
        };

        self.enter(UpdateStep::BootloaderTransition);
        let mut bootloader = match device {
            DeviceHandle::Bootloader(bootloader) => bootloader,
            DeviceHandle::Device(device) => self.reboot_to_bootloader(model, device)?,
        };

        let flashed = self.validate_and_flash(
            model,
            bootloader.as_mut(),
            &container,
            current.as_ref(),
            status,
            &mut migrations,
        );
        if let Err(e) = bootloader.close() {
            warn!(error = %e, "Failed to close bootloader");
        }
        drop(bootloader);
        flashed?;

        self.enter(UpdateStep::FinalizationWait);
        let retries = migrations
            .as_ref()
            .map(finalization_wait_retries)
            .unwrap_or_else(|| finalization_wait_retries(&BTreeSet::new()));
        let status = self.finalize(model, &container.version, retries)?;

        Ok(UpdateOutcome {
            version: container.version,
            status,
        })
    }

    fn prepare(
        &mut self,
        model: Model,
        source: &UpdateSource,
        current: Option<&Version>,
    ) -> UpdateResult<FirmwareContainer> {
        let parse_error = |e| UpdateError::container("Failed to parse firmware container", e);
        match source {
            UpdateSource::File(path) => {
                let container = FirmwareContainer::from_path(path, model).map_err(parse_error)?;
                self.validate_version(current, &container.version)?;
                Ok(container)
            }
            UpdateSource::Bytes(data) => {
                let container = FirmwareContainer::from_bytes(data, model).map_err(parse_error)?;
                self.validate_version(current, &container.version)?;
                Ok(container)
            }
            UpdateSource::Release { tag } => {
                let repository = self.repository.ok_or(UpdateError::NoRepository(model))?;
                let release = match tag {
                    Some(tag) => {
                        info!(%tag, "Downloading firmware version");
                        repository.release(tag).map_err(|e| {
                            UpdateError::release(format!("Failed to get firmware release {tag}"), e)
                        })?
                    }
                    None => {
                        let release = repository.latest_release().map_err(|e| {
                            UpdateError::release("Failed to find latest firmware release", e)
                        })?;
                        info!(%release, "Latest firmware version");
                        release
                    }
                };
                let release_version =
                    release
                        .version()
                        .map_err(|source| UpdateError::InvalidReleaseTag {
                            tag: release.tag.clone(),
                            source,
                        })?;
                self.validate_version(current, &release_version)?;
                self.ui.confirm_download(current, &release_version)?;
                self.download(model, repository, &release, &release_version)
            }
        }
    }

    fn download(
        &self,
        model: Model,
        repository: &dyn ReleaseRepository,
        release: &Release,
        release_version: &Version,
    ) -> UpdateResult<FirmwareContainer> {
        let asset = release
            .require_asset(model_data(model).firmware_pattern())
            .map_err(|e| {
                UpdateError::release(format!("Failed to find firmware image for release {release}"), e)
            })?;

        info!(url = %asset.url, "Downloading firmware update");
        let data = {
            let mut bar = self.ui.download_progress_bar(&asset.tag);
            repository.download(&asset, &mut |current, total| bar.update(current, total))
        }
        .map_err(|e| {
            UpdateError::release(format!("Failed to download firmware update {}", asset.tag), e)
        })?;

        let container = FirmwareContainer::from_bytes(&data, model).map_err(|e| {
            UpdateError::container(
                format!("Failed to parse firmware container for {}", asset.tag),
                e,
            )
        })?;
        if *release_version != container.version {
            return Err(UpdateError::ReleaseVersionMismatch {
                tag: asset.tag,
                version: container.version,
            });
        }
        Ok(container)
    }

    fn validate_version(&self, current: Option<&Version>, new: &Version) -> UpdateResult<()> {
        info!(
            current = %current.map(ToString::to_string).unwrap_or_default(),
            new = %new,
            "Checking firmware versions"
        );
        if let Some(same) = compare_versions(current, new)? {
            self.ui.confirm_update_same_version(&same)?;
        }
        Ok(())
    }

    fn check_minimum_version(&self, container: &FirmwareContainer) -> UpdateResult<()> {
        check_client_requirements(container, &self.config, self.ui)
    }

    fn check_migrations(
        &self,
        model: Model,
        variant: Variant,
        current: Option<&Version>,
        container: &FirmwareContainer,
        status: Option<Status>,
    ) -> UpdateResult<BTreeSet<Migration>> {
        let migrations = migrations_for(model, variant, current, &container.version);
        debug!(%variant, ?migrations, "Computed migrations");
        self.ui
            .confirm_extra_information(&extra_information(&migrations))?;

        let low_ifs = status
            .and_then(|status| status.ifs_blocks)
            .is_some_and(|blocks| blocks < IFS_MIGRATION_V2_MIN_BLOCKS);
        if migrations.contains(&Migration::IfsMigrationV2) && low_ifs {
            self.trigger_warning(Warning::IfsMigrationV2)?;
        }
        Ok(migrations)
    }

    fn trigger_warning(&self, warning: Warning) -> UpdateResult<()> {
        raise_warning(&self.config, self.ui, warning)
    }

    fn reboot_to_bootloader(
        &mut self,
        model: Model,
        mut device: TrussedDevice,
    ) -> UpdateResult<Box<dyn Bootloader>> {
        self.ui.request_bootloader_confirmation();
        match device.reboot(BootMode::Bootrom) {
            Ok(_) => {}
            Err(DeviceError::ConfirmationTimeout) => return Err(UpdateError::RebootNotConfirmed),
            Err(e) if e.is_disconnect() => {
                debug!(error = %e, "Device disconnected after reboot command");
            }
            Err(e) => {
                return Err(UpdateError::device(
                    UpdateStep::BootloaderTransition,
                    "Failed to reboot the device into the bootloader",
                    e,
                ));
            }
        }
        if let Err(e) = device.close() {
            debug!(error = %e, "Failed to close device after reboot");
        }
        drop(device);

        (self.sleeper)(self.config.bootloader_settle_delay);
        self.ui.pre_bootloader_hint();

        let attempts = self.config.bootloader_retries;
        let handler = &mut *self.handler;
        let sleeper = &mut self.sleeper;
        let mut last_error = None;
        let retries = Retries::new(attempts)
            .with_timeout(self.config.bootloader_retry_delay)
            .with_sleeper(|delay| sleeper(delay));
        for t in retries {
            debug!(%t, "Trying to connect to bootloader");
            let connected = handler.await_bootloader(model).and_then(|mut bootloader| {
                bootloader.uuid()?;
                Ok(bootloader)
            });
            match connected {
                Ok(bootloader) => {
                    info!(name = %bootloader.name(), path = ?bootloader.path(), "Connected to bootloader");
                    return Ok(bootloader);
                }
                Err(e) => {
                    debug!(%t, error = %e, "Failed to connect to bootloader");
                    last_error = Some(e);
                }
            }
        }
        Err(UpdateError::BootloaderUnreachable {
            model,
            attempts,
            last_error,
        })
    }

    fn validate_and_flash(
        &mut self,
        model: Model,
        bootloader: &mut dyn Bootloader,
        container: &FirmwareContainer,
        current: Option<&Version>,
        status: Option<Status>,
        migrations: &mut Option<BTreeSet<Migration>>,
    ) -> UpdateResult<()> {
        self.enter(UpdateStep::ImageValidation);
        let variant = bootloader.variant();
        let image = container
            .image(variant)
            .ok_or(UpdateError::NoImageForVariant(variant))?;
        let anchors = self
            .trust_anchors
            .unwrap_or_else(|| model_data(model).trust_anchors());
        validate_firmware_image_with(variant, image, &container.version, anchors)
            .map_err(UpdateError::InvalidImage)?;
        if migrations.is_none() {
            *migrations = Some(self.check_migrations(model, variant, current, container, status)?);
        }

        self.enter(UpdateStep::Flashing);
        debug!(%variant, size = image.len(), "Starting firmware update");
        {
            let mut bar = self.ui.update_progress_bar();
            bootloader
                .update(image, &mut |current, total| bar.update(current, total))
                .map_err(UpdateError::FlashFailed)?;
        }
        debug!("Firmware update finished successfully");
        Ok(())
    }

    fn finalize(&mut self, model: Model, expected: &Version, retries: usize) -> UpdateResult<Status> {
        let step = UpdateStep::FinalizationWait;
        let ui = self.ui;
        let mut bar = ui.finalization_progress_bar();
        let mut device = self
            .handler
            .await_device(model, retries, &mut |current, total| bar.update(current, total))
            .map_err(|e| {
                UpdateError::device(step, format!("Failed to connect to {model} after the update"), e)
            })?;

        let version = device
            .version()
            .map_err(|e| UpdateError::device(step, "Failed to read firmware version", e))?;
        if version != *expected {
            return Err(UpdateError::PostUpdateVersionMismatch {
                expected: expected.clone(),
                actual: version,
            });
        }
        let status = device
            .status()
            .map_err(|e| UpdateError::device(step, "Failed to read device status", e))?;
        info!(%version, status = ?status, "Device reports the new firmware");
        Ok(status)
    }
}

impl fmt::Debug for Updater<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("has_repository", &self.repository.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use nitrokey_device::Uuid;
    use nitrokey_errors::DeviceResult;

    use super::*;
    use crate::ui::{NoProgress, ProgressBar};

    #[derive(Default)]
    struct RecordingUi {
        events: RefCell<Vec<String>>,
    }

    impl RecordingUi {
        fn record(&self, event: impl Into<String>) {
            self.events.borrow_mut().push(event.into());
        }
    }

    impl UpdateUi for RecordingUi {
        fn show_warning(&self, warning: Warning) {
            self.record(format!("warning {warning}"));
        }

        fn confirm_download(&self, _current: Option<&Version>, new: &Version) -> UpdateResult<()> {
            self.record(format!("download {new}"));
            Ok(())
        }

        fn confirm_update(&self, _current: Option<&Version>, new: &Version) -> UpdateResult<()> {
            self.record(format!("update {new}"));
            Ok(())
        }

        fn confirm_pynitrokey_version(&self, _current: &Version, _required: &Version) -> UpdateResult<()> {
            Ok(())
        }

        fn confirm_extra_information(&self, _lines: &[String]) -> UpdateResult<()> {
            Ok(())
        }

        fn confirm_update_same_version(&self, version: &Version) -> UpdateResult<()> {
            self.record(format!("same {version}"));
            Ok(())
        }

        fn pre_bootloader_hint(&self) {}

        fn request_bootloader_confirmation(&self) {}

        fn download_progress_bar(&self, _desc: &str) -> Box<dyn ProgressBar + '_> {
            Box::new(NoProgress)
        }

        fn update_progress_bar(&self) -> Box<dyn ProgressBar + '_> {
            Box::new(NoProgress)
        }

        fn finalization_progress_bar(&self) -> Box<dyn ProgressBar + '_> {
            Box::new(NoProgress)
        }
    }

    struct NoDevices;

    impl DeviceHandler for NoDevices {
        fn await_bootloader(&mut self, model: Model) -> DeviceResult<Box<dyn Bootloader>> {
            Err(DeviceError::not_found(model.name()))
        }

        fn await_device(
            &mut self,
            model: Model,
            _retries: usize,
            _progress: &mut dyn FnMut(u64, u64),
        ) -> DeviceResult<TrussedDevice> {
            Err(DeviceError::not_found(model.name()))
        }
    }

    struct IdleBootloader;

    impl Bootloader for IdleBootloader {
        fn model(&self) -> Model {
            Model::Nk3
        }

        fn variant(&self) -> Variant {
            Variant::Nrf52
        }

        fn path(&self) -> Option<&str> {
            None
        }

        fn uuid(&mut self) -> DeviceResult<Option<Uuid>> {
            Ok(None)
        }

        fn update(&mut self, _image: &[u8], _progress: &mut dyn FnMut(u64, u64)) -> DeviceResult<()> {
            Err(DeviceError::disconnected("bootloader"))
        }

        fn reboot(&mut self) -> DeviceResult<bool> {
            Ok(true)
        }

        fn close(&mut self) -> DeviceResult<()> {
            Ok(())
        }
    }

    fn v(major: u32, minor: u32, patch: u32) -> Version {
        Version::new(major, minor, patch)
    }

    #[test]
    fn test_compare_versions() -> UpdateResult<()> {
        assert_eq!(compare_versions(None, &v(1, 0, 0))?, None);
        assert_eq!(compare_versions(Some(&v(1, 0, 0)), &v(1, 1, 0))?, None);
        assert_eq!(compare_versions(Some(&v(1, 1, 0)), &v(1, 1, 0))?, Some(v(1, 1, 0)));
        assert!(matches!(
            compare_versions(Some(&v(1, 2, 0)), &v(1, 1, 0)),
            Err(UpdateError::DowngradeRejected { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_same_version_keeps_pre_release_only_if_complete() -> UpdateResult<()> {
        let installed = v(1, 8, 2).with_pre("rc.1").into_complete();
        let same = compare_versions(Some(&installed), &installed)?;
        assert_eq!(same.map(|v| v.to_string()), Some("v1.8.2-rc.1".to_string()));

        let packed = Version::from_packed((1 << 22) | (8 << 6) | 2);
        let same = compare_versions(Some(&packed), &installed)?;
        assert_eq!(same.map(|v| v.to_string()), Some("v1.8.2".to_string()));
        Ok(())
    }

    #[test]
    fn test_pre_release_of_same_core_is_no_downgrade() -> UpdateResult<()> {
        let installed = v(1, 8, 2).into_complete();
        let rc = v(1, 8, 2).with_pre("rc.1").into_complete();
        assert_eq!(compare_versions(Some(&installed), &rc)?, None);
        Ok(())
    }

    #[test]
    fn test_update_from_bootloader_requires_ignored_warning() {
        let ui = RecordingUi::default();
        let mut handler = NoDevices;
        let mut updater = Updater::new(&ui, &mut handler).with_sleeper(|_| {});

        let device = DeviceHandle::Bootloader(Box::new(IdleBootloader));
        let result = updater.update(device, &UpdateSource::Release { tag: None });

        assert!(matches!(
            result,
            Err(UpdateError::Warning(Warning::UpdateFromBootloader))
        ));
        assert!(matches!(
            updater.state(),
            UpdateState::Failed { step: Some(UpdateStep::VersionCheck), .. }
        ));
        assert!(ui.events.borrow().is_empty());
    }

    #[test]
    fn test_release_source_needs_repository() {
        let ui = RecordingUi::default();
        let mut handler = NoDevices;
        let config = UpdateConfig::default().ignore_warning(Warning::UpdateFromBootloader);
        let mut updater = Updater::new(&ui, &mut handler)
            .with_config(config)
            .with_sleeper(|_| {});

        let device = DeviceHandle::Bootloader(Box::new(IdleBootloader));
        let result = updater.update(device, &UpdateSource::Release { tag: None });

        assert!(matches!(result, Err(UpdateError::NoRepository(Model::Nk3))));
        assert_eq!(*ui.events.borrow(), ["warning update-from-bootloader"]);
        assert!(!updater.state().is_in_progress());
    }

    #[test]
    fn test_invalid_container_bytes() {
        let ui = RecordingUi::default();
        let mut handler = NoDevices;
        let config = UpdateConfig::default().ignore_warning(Warning::UpdateFromBootloader);
        let mut updater = Updater::new(&ui, &mut handler).with_config(config);

        let device = DeviceHandle::Bootloader(Box::new(IdleBootloader));
        let result = updater.update(device, &UpdateSource::Bytes(b"not a zip".to_vec()));

        assert!(matches!(result, Err(UpdateError::Container { .. })));
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("Failed to parse firmware container".to_string())
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(UpdateState::Idle.to_string(), "idle");
        assert_eq!(
            UpdateState::InProgress {
                step: UpdateStep::FinalizationWait
            }
            .to_string(),
            "finalization wait"
        );
        assert!(
            UpdateState::InProgress {
                step: UpdateStep::Flashing
            }
            .is_in_progress()
        );
        assert!(!UpdateState::Verified.is_in_progress());
    }
}
