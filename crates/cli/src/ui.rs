//! Terminal implementation of the updater UI

use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar as Bar, ProgressDrawTarget, ProgressStyle};
use nitrokey_firmware_update::{ProgressBar, UpdateError, UpdateResult, UpdateUi, Warning};
use nitrokey_version::Version;
use tracing::debug;

const BAR_TEMPLATE: &str = "{msg:<24} [{bar:40.cyan/blue}] {percent:>3}% {bytes}/{total_bytes}";

/// Prompts on stderr, progress bars from `indicatif`.
///
/// With `assume_yes` every confirmation is accepted without asking. With
/// `quiet` no progress bars are drawn and nothing but warnings reach stderr,
/// which keeps `--json` output parseable.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalUi {
    assume_yes: bool,
    quiet: bool,
}

impl TerminalUi {
    pub fn new(assume_yes: bool, quiet: bool) -> Self {
        Self { assume_yes, quiet }
    }

    fn confirm(&self, prompt: &str) -> UpdateResult<()> {
        if self.assume_yes {
            debug!(prompt, "Confirmation assumed");
            return Ok(());
        }
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);
        if confirmed {
            Ok(())
        } else {
            Err(UpdateError::Aborted)
        }
    }

    fn note(&self, message: &str) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    fn bar(&self, message: &str) -> Box<dyn ProgressBar + '_> {
        let bar = Bar::no_length();
        if self.quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(message.to_string());
        Box::new(TerminalBar(bar))
    }
}

fn describe(version: Option<&Version>) -> String {
    version.map_or_else(|| "[unknown]".to_string(), ToString::to_string)
}

impl UpdateUi for TerminalUi {
    fn show_warning(&self, warning: Warning) {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning.message());
    }

    fn confirm_download(&self, current: Option<&Version>, new: &Version) -> UpdateResult<()> {
        self.confirm(&format!(
            "Do you want to download the firmware version {new} (installed: {})?",
            describe(current)
        ))
    }

    fn confirm_update(&self, current: Option<&Version>, new: &Version) -> UpdateResult<()> {
        self.note("");
        self.note(&format!(
            "{} Please do not remove the device or close this program during the update.",
            "Note:".bold()
        ));
        self.confirm(&format!(
            "Do you want to update the firmware from {} to {new}?",
            describe(current)
        ))
    }

    fn confirm_pynitrokey_version(
        &self,
        current: &Version,
        required: &Version,
    ) -> UpdateResult<()> {
        self.note(&format!(
            "This update requires pynitrokey {required} or newer, but the current version is {current}."
        ));
        self.confirm("Do you want to continue anyway?")
    }

    fn confirm_extra_information(&self, lines: &[String]) -> UpdateResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        for line in lines {
            self.note(line);
        }
        self.confirm("Have you read the information above?")
    }

    fn confirm_update_same_version(&self, version: &Version) -> UpdateResult<()> {
        self.confirm(&format!(
            "The firmware version {version} is already installed. Do you want to install it again?"
        ))
    }

    fn pre_bootloader_hint(&self) {
        self.note("Rebooting the device into bootloader mode.");
    }

    fn request_bootloader_confirmation(&self) {
        self.note(
            &"Please press the touch button to reboot the device into bootloader mode ..."
                .bold()
                .to_string(),
        );
    }

    fn download_progress_bar(&self, desc: &str) -> Box<dyn ProgressBar + '_> {
        self.bar(desc)
    }

    fn update_progress_bar(&self) -> Box<dyn ProgressBar + '_> {
        self.bar("Performing firmware update")
    }

    fn finalization_progress_bar(&self) -> Box<dyn ProgressBar + '_> {
        self.bar("Finalizing firmware update")
    }
}

/// An `indicatif` bar that is finished when dropped.
struct TerminalBar(Bar);

impl ProgressBar for TerminalBar {
    fn update(&mut self, current: u64, total: u64) {
        if total > 0 {
            self.0.set_length(total);
        }
        self.0.set_position(current);
    }
}

impl Drop for TerminalBar {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}
