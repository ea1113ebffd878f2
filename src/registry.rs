//! Process-wide steering wheel provider slot.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex, MutexGuard},
};

use log::{error, info};
use thiserror::Error;

use crate::{
    drivers::{
        logitech::{LogitechSteeringWheelSdk, layout::ButtonLayout},
        null::{NULL_SDK_NAME, NullSteeringWheelSdk},
    },
    wheel_sdk::SteeringWheelSdk,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstallError {
    #[error("steering wheel provider already set to {current}; {rejected} will NOT install")]
    AlreadyInstalled {
        current: &'static str,
        rejected: &'static str,
    },
}

/// Single provider slot, first installer wins.
///
/// The slot starts out holding [`NullSteeringWheelSdk`]. Any other provider
/// can be installed exactly once; later installs fail with
/// [`InstallError::AlreadyInstalled`] and leave the current provider in place.
///
/// # Example
///
/// ```
/// use wheel_ffb::drivers::null::NullSteeringWheelSdk;
/// use wheel_ffb::registry::SdkRegistry;
///
/// let mut registry = SdkRegistry::new();
/// assert!(registry.is_default());
/// assert_eq!(registry.installed_name(), "NullSteeringWheelSdk");
///
/// let sdk = registry.take();
/// assert_eq!(sdk.name(), "NullSteeringWheelSdk");
/// ```
pub struct SdkRegistry {
    sdk: Box<dyn SteeringWheelSdk>,
}

impl std::fmt::Debug for SdkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkRegistry")
            .field("installed", &self.sdk.name())
            .finish()
    }
}

impl SdkRegistry {
    pub fn new() -> Self {
        Self {
            sdk: Box::new(NullSteeringWheelSdk),
        }
    }

    /// Installs `sdk` if the slot still holds the default provider.
    pub fn install(&mut self, sdk: Box<dyn SteeringWheelSdk>) -> Result<(), InstallError> {
        if !self.is_default() {
            let err = InstallError::AlreadyInstalled {
                current: self.sdk.name(),
                rejected: sdk.name(),
            };
            error!("{}", err);
            return Err(err);
        }

        info!("Steering wheel provider {} installed", sdk.name());
        self.sdk = sdk;
        Ok(())
    }

    pub fn installed_name(&self) -> &'static str {
        self.sdk.name()
    }

    /// True while the slot holds the null provider.
    pub fn is_default(&self) -> bool {
        self.sdk.name() == NULL_SDK_NAME
    }

    /// Moves the provider out, leaving the default provider behind.
    pub fn take(&mut self) -> Box<dyn SteeringWheelSdk> {
        std::mem::replace(&mut self.sdk, Box::new(NullSteeringWheelSdk))
    }
}

impl Default for SdkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<Mutex<SdkRegistry>> = LazyLock::new(|| Mutex::new(SdkRegistry::new()));

/// Locks the process-wide registry.
///
/// A registry poisoned by a panicking holder is still usable: the slot only
/// ever holds a fully constructed provider.
pub fn global() -> MutexGuard<'static, SdkRegistry> {
    GLOBAL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Installs the Logitech provider into the process-wide registry.
///
/// `library` overrides the platform file name of the vendor wrapper.
pub fn install_logitech(
    library: Option<PathBuf>,
    layout: ButtonLayout,
) -> Result<(), InstallError> {
    let sdk = match library {
        Some(path) => LogitechSteeringWheelSdk::new(path),
        None => LogitechSteeringWheelSdk::with_default_library(),
    }
    .with_layout(layout);

    global().install(Box::new(sdk))?;
    info!("Logitech steering wheel SDK installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::logitech::LOGITECH_SDK_NAME;
    use crate::wheel_sdk::MockSteeringWheelSdk;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn named_mock(name: &'static str) -> Box<dyn SteeringWheelSdk> {
        let mut sdk = MockSteeringWheelSdk::new();
        sdk.expect_name().return_const(name);
        Box::new(sdk)
    }

    #[test]
    fn first_non_null_install_wins() {
        let mut registry = SdkRegistry::new();
        assert!(registry.install(named_mock("First")).is_ok());
        assert_eq!(registry.installed_name(), "First");
        assert!(!registry.is_default());

        let err = registry.install(named_mock("Second")).unwrap_err();
        assert_eq!(
            err,
            InstallError::AlreadyInstalled {
                current: "First",
                rejected: "Second"
            }
        );
        assert!(err.to_string().contains("First"));
        assert_eq!(registry.installed_name(), "First");
    }

    #[test]
    fn installing_over_default_null_is_allowed_repeatedly() {
        let mut registry = SdkRegistry::new();
        assert!(registry.install(Box::new(NullSteeringWheelSdk)).is_ok());
        assert!(registry.is_default());
        assert!(registry.install(named_mock("Vendor")).is_ok());
    }

    #[test]
    fn take_restores_default() {
        let mut registry = SdkRegistry::new();
        registry.install(named_mock("Vendor")).unwrap();

        let sdk = registry.take();
        assert_eq!(sdk.name(), "Vendor");
        assert!(registry.is_default());
        assert!(registry.install(named_mock("Another")).is_ok());
    }

    #[test]
    #[serial]
    fn global_logitech_install_is_one_shot() {
        let _ = global().take();

        install_logitech(None, ButtonLayout::logitech_default()).unwrap();
        assert_eq!(global().installed_name(), LOGITECH_SDK_NAME);

        let err = install_logitech(Some(PathBuf::from("other.dll")), ButtonLayout::default())
            .unwrap_err();
        assert_eq!(
            err,
            InstallError::AlreadyInstalled {
                current: LOGITECH_SDK_NAME,
                rejected: LOGITECH_SDK_NAME
            }
        );

        let _ = global().take();
        assert!(global().is_default());
    }
}
