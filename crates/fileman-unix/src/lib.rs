// POSIX-like platform implementations

#[cfg(unix)]
pub mod identity;
