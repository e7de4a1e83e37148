// Windows platform implementations

#[cfg(target_os = "windows")]
pub mod identity;

#[cfg(target_os = "windows")]
pub mod security;
