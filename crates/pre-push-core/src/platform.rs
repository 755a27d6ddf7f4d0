//! Platform-variable collection — the opaque context provider `spec.md`
//! §1 carves out of the core engine's contract. Deliberately thin: it reads
//! `std::env::consts` and the logical CPU count once per run.

/// Platform facts exposed as `platform`/`arch`/`os`/`os_version`/`cpu`
/// interpolation keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Operating system family (`linux`, `macos`, `windows`, …).
    pub os: String,
    /// CPU architecture (`x86_64`, `aarch64`, …).
    pub arch: String,
    /// Best-effort OS version string; `"unknown"` if it cannot be read.
    pub os_version: String,
    /// Logical CPU count.
    pub cpu: usize,
}

impl PlatformInfo {
    /// Collect platform facts for the running process.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_version: os_version(),
            cpu: num_cpus::get(),
        }
    }

    /// `{os}/{arch}` combined string, used for the `platform` key.
    #[must_use]
    pub fn platform_string(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }
}

fn os_version() -> String {
    // No cross-platform stdlib accessor exists for this; callers that need
    // precision can override via manifest `env.*` interpolation instead.
    std::env::var("PRE_PUSH_OS_VERSION").unwrap_or_else(|_| "unknown".to_string())
}
