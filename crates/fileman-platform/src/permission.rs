use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Highest mode accepted: setuid/setgid/sticky plus rwx for owner, group and other.
pub const MAX_MODE: u32 = 0o7777;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission value '{input}': expected octal between 0 and 7777")]
pub struct InvalidPermission {
    pub input: String,
}

/// Numeric access mode in chmod encoding (e.g. `0o644`).
///
/// Only POSIX-like platforms apply it; elsewhere it is carried through
/// untouched and reported as ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PermissionSpec(u32);

impl PermissionSpec {
    pub fn from_mode(mode: u32) -> Result<Self, InvalidPermission> {
        if mode > MAX_MODE {
            return Err(InvalidPermission {
                input: format!("{:o}", mode),
            });
        }
        Ok(Self(mode))
    }

    pub fn mode(self) -> u32 {
        self.0
    }
}

impl FromStr for PermissionSpec {
    type Err = InvalidPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);

        let invalid = || InvalidPermission {
            input: s.to_string(),
        };

        if digits.is_empty() {
            return Err(invalid());
        }
        let mode = u32::from_str_radix(digits, 8).map_err(|_| invalid())?;
        Self::from_mode(mode).map_err(|_| invalid())
    }
}

impl TryFrom<u32> for PermissionSpec {
    type Error = InvalidPermission;

    fn try_from(mode: u32) -> Result<Self, Self::Error> {
        Self::from_mode(mode)
    }
}

impl From<PermissionSpec> for u32 {
    fn from(spec: PermissionSpec) -> u32 {
        spec.0
    }
}

impl fmt::Display for PermissionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03o}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_octal() {
        let spec: PermissionSpec = "644".parse().unwrap();
        assert_eq!(spec.mode(), 0o644);
        assert_eq!(spec.to_string(), "644");
    }

    #[test]
    fn test_parse_prefixed_and_padded() {
        assert_eq!("0o600".parse::<PermissionSpec>().unwrap().mode(), 0o600);
        assert_eq!(" 0755\n".parse::<PermissionSpec>().unwrap().mode(), 0o755);
        assert_eq!("4755".parse::<PermissionSpec>().unwrap().mode(), 0o4755);
    }

    #[test]
    fn test_parse_rejects_non_octal() {
        assert!("".parse::<PermissionSpec>().is_err());
        assert!("0o".parse::<PermissionSpec>().is_err());
        assert!("648".parse::<PermissionSpec>().is_err());
        assert!("rw-r--r--".parse::<PermissionSpec>().is_err());
        assert!("-644".parse::<PermissionSpec>().is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let err = "17777".parse::<PermissionSpec>().unwrap_err();
        assert_eq!(err.input, "17777");
        assert!(PermissionSpec::from_mode(0o10000).is_err());
        assert!(PermissionSpec::from_mode(0o7777).is_ok());
    }

    #[test]
    fn test_display_keeps_three_digits() {
        assert_eq!(PermissionSpec::from_mode(0o7).unwrap().to_string(), "007");
        assert_eq!(PermissionSpec::from_mode(0).unwrap().to_string(), "000");
    }
}
