//! Boundaries between the updater and its caller
//!
//! The updater never talks to the operator or the USB bus directly. It asks
//! an [`UpdateUi`] for confirmations and progress bars and a
//! [`DeviceHandler`] for devices that show up after a reboot.

use nitrokey_device::{Bootloader, Model, TrussedDevice};
use nitrokey_errors::DeviceResult;
use nitrokey_version::Version;

use crate::error::UpdateResult;
use crate::warning::Warning;

/// A progress indicator. Implementations finish the indicator on drop.
pub trait ProgressBar {
    /// Report `current` of `total` units. `total` may be zero if unknown.
    fn update(&mut self, current: u64, total: u64);
}

/// A progress bar that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressBar for NoProgress {
    fn update(&mut self, _current: u64, _total: u64) {}
}

/// Operator interaction during an update.
///
/// Every `confirm_*` method returns [`UpdateError::Aborted`](crate::UpdateError::Aborted)
/// if the operator declines.
pub trait UpdateUi {
    /// Show a warning that is configured to be ignored.
    fn show_warning(&self, warning: Warning);

    /// Confirm downloading the release `new`.
    fn confirm_download(&self, current: Option<&Version>, new: &Version) -> UpdateResult<()>;

    /// Confirm updating from `current` to `new`.
    fn confirm_update(&self, current: Option<&Version>, new: &Version) -> UpdateResult<()>;

    /// Confirm an update that requires a newer legacy client.
    fn confirm_pynitrokey_version(&self, current: &Version, required: &Version)
    -> UpdateResult<()>;

    /// Confirm the migration notes. `lines` may be empty.
    fn confirm_extra_information(&self, lines: &[String]) -> UpdateResult<()>;

    /// Confirm reinstalling the installed version.
    fn confirm_update_same_version(&self, version: &Version) -> UpdateResult<()>;

    /// Shown after the reboot while waiting for the bootloader.
    fn pre_bootloader_hint(&self);

    /// Ask the operator to touch the device when it starts blinking.
    fn request_bootloader_confirmation(&self);

    /// Progress of a release download.
    fn download_progress_bar(&self, desc: &str) -> Box<dyn ProgressBar + '_>;

    /// Progress of flashing the image.
    fn update_progress_bar(&self) -> Box<dyn ProgressBar + '_>;

    /// Progress of waiting for the device after the update.
    fn finalization_progress_bar(&self) -> Box<dyn ProgressBar + '_>;
}

/// Finds devices that re-enumerate during an update.
pub trait DeviceHandler {
    /// Open the bootloader of `model` after the reboot.
    ///
    /// # Errors
    ///
    /// Returns an error if no bootloader can be opened. The updater retries.
    fn await_bootloader(&mut self, model: Model) -> DeviceResult<Box<dyn Bootloader>>;

    /// Wait until the updated device is back in firmware mode.
    ///
    /// Implementations poll up to `retries` times and report `(try, retries)`
    /// through `progress`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device does not show up.
    fn await_device(
        &mut self,
        model: Model,
        retries: usize,
        progress: &mut dyn FnMut(u64, u64),
    ) -> DeviceResult<TrussedDevice>;
}
