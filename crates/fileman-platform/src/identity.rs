use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::permission::PermissionSpec;

/// Which native ownership model backs an identity implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Numeric uid ownership and chmod mode bits.
    Posix,
    /// Security descriptors with SID owners; mode bits are not applied.
    Windows,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Posix => f.write_str("posix"),
            PlatformKind::Windows => f.write_str("windows"),
        }
    }
}

/// Owning principal of a file, as the platform names it.
///
/// The variants are not comparable across platforms: treat the value as a
/// display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OwnerDescriptor {
    Uid { uid: u32 },
    Account { domain: String, name: String },
    Unknown,
}

impl OwnerDescriptor {
    pub fn uid(uid: u32) -> Self {
        OwnerDescriptor::Uid { uid }
    }

    pub fn account(domain: impl Into<String>, name: impl Into<String>) -> Self {
        OwnerDescriptor::Account {
            domain: domain.into(),
            name: name.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, OwnerDescriptor::Unknown)
    }
}

impl fmt::Display for OwnerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerDescriptor::Uid { uid } => write!(f, "{}", uid),
            OwnerDescriptor::Account { domain, name } if domain.is_empty() => f.write_str(name),
            OwnerDescriptor::Account { domain, name } => write!(f, "{}\\{}", domain, name),
            OwnerDescriptor::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Step of a native owner lookup that can fail on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    /// File status query (POSIX).
    Stat,
    /// Security descriptor retrieval.
    DescriptorFetch,
    /// Owner SID extraction from the descriptor.
    OwnerExtraction,
    /// SID to account name resolution.
    NameLookup,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupStage::Stat => "stat",
            LookupStage::DescriptorFetch => "security descriptor fetch",
            LookupStage::OwnerExtraction => "owner sid extraction",
            LookupStage::NameLookup => "account name lookup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("owner resolution failed during {stage}: {source}")]
pub struct OwnerResolutionFailed {
    pub stage: LookupStage,
    #[source]
    pub source: io::Error,
}

impl OwnerResolutionFailed {
    pub fn new(stage: LookupStage, source: io::Error) -> Self {
        Self { stage, source }
    }
}

/// Outcome of an owner query. Never an error from the caller's side:
/// `Unresolved` still carries the failed stage for diagnostics.
#[derive(Debug)]
pub enum OwnerLookup {
    Resolved(OwnerDescriptor),
    Unresolved(OwnerResolutionFailed),
}

impl OwnerLookup {
    pub fn is_resolved(&self) -> bool {
        matches!(self, OwnerLookup::Resolved(_))
    }

    /// Collapse to a descriptor, mapping `Unresolved` to `Unknown`.
    pub fn into_descriptor(self) -> OwnerDescriptor {
        match self {
            OwnerLookup::Resolved(owner) => owner,
            OwnerLookup::Unresolved(_) => OwnerDescriptor::Unknown,
        }
    }
}

/// What `apply_permissions` actually did on this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// Mode bits were written to the file.
    Applied(PermissionSpec),
    /// The platform has no mode-bit mutation; the owner was looked up instead.
    OwnerReported(OwnerDescriptor),
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to set permissions {mode} on {}: {source}", path.display())]
    PermissionChangeFailed {
        path: PathBuf,
        mode: PermissionSpec,
        #[source]
        source: io::Error,
    },
}

/// Ownership query and permission mutation for one platform.
///
/// Queries always succeed from the caller's perspective. Mutation has a
/// platform-dependent effect, see [`PermissionOutcome`].
pub trait PlatformIdentity: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Run the native owner lookup, reporting which stage failed if any.
    fn lookup_owner(&self, path: &Path) -> OwnerLookup;

    /// Best-effort owner of `path`; `Unknown` when the lookup fails.
    fn resolve_owner(&self, path: &Path) -> OwnerDescriptor {
        match self.lookup_owner(path) {
            OwnerLookup::Resolved(owner) => owner,
            OwnerLookup::Unresolved(e) => {
                tracing::debug!("owner of {} unresolved: {}", path.display(), e);
                OwnerDescriptor::Unknown
            }
        }
    }

    fn apply_permissions(
        &self,
        path: &Path,
        spec: PermissionSpec,
    ) -> Result<PermissionOutcome, IdentityError>;
}
