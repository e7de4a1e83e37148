//! Startup probe selecting the identity implementation for this target.

use anyhow::Result;
use fileman_platform::PlatformIdentity;

#[cfg(unix)]
pub fn probe() -> Result<Box<dyn PlatformIdentity>> {
    Ok(Box::new(fileman_unix::identity::PosixIdentity::new()))
}

#[cfg(target_os = "windows")]
pub fn probe() -> Result<Box<dyn PlatformIdentity>> {
    Ok(Box::new(fileman_windows::identity::WindowsIdentity::new()))
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn probe() -> Result<Box<dyn PlatformIdentity>> {
    anyhow::bail!("file ownership is not supported on {}", std::env::consts::OS)
}
