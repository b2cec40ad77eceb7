//! Stable device fingerprint provider
//!
//! The cipher derives its keys from an identity that is stable for one app
//! installation on one device. What that identity is made of is a host
//! platform concern, so the cipher only sees this trait; `DeviceProfile` is
//! the standard composition of model, manufacturer, package name, and a
//! stable device identifier, with an optional hardware serial.

use common::Secret;

/// Supplies the stable device identity the cipher keys are derived from.
///
/// The returned value must be identical across process restarts on the
/// same device and installation; a changed fingerprint makes previously
/// encrypted data undecryptable.
pub trait FingerprintProvider: Send + Sync {
    fn fingerprint(&self) -> Secret<String>;
}

/// Device-and-package identity assembled by the host environment.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub model: String,
    pub manufacturer: String,
    pub package_name: String,
    /// Stable per-installation identifier (e.g. the platform's app-scoped
    /// device id).
    pub device_id: String,
    /// Hardware serial. Unavailable on most modern platforms; omit unless
    /// the host can read it reliably.
    pub serial: Option<String>,
}

impl FingerprintProvider for DeviceProfile {
    fn fingerprint(&self) -> Secret<String> {
        let serial = self.serial.as_deref().unwrap_or("");
        Secret::new(format!(
            "{}{}{}{}{}",
            self.model, self.manufacturer, serial, self.device_id, self.package_name
        ))
    }
}
