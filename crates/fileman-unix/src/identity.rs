//! Ownership via `stat(2)` and permission changes via `chmod(2)`.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use fileman_platform::{
    IdentityError, LookupStage, OwnerDescriptor, OwnerLookup, OwnerResolutionFailed,
    PermissionOutcome, PermissionSpec, PlatformIdentity, PlatformKind,
};
use tracing::info;

pub struct PosixIdentity;

impl PosixIdentity {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PosixIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformIdentity for PosixIdentity {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Posix
    }

    fn lookup_owner(&self, path: &Path) -> OwnerLookup {
        match nix::sys::stat::stat(path) {
            Ok(st) => OwnerLookup::Resolved(OwnerDescriptor::uid(st.st_uid)),
            Err(errno) => OwnerLookup::Unresolved(OwnerResolutionFailed::new(
                LookupStage::Stat,
                io::Error::from(errno),
            )),
        }
    }

    fn apply_permissions(
        &self,
        path: &Path,
        spec: PermissionSpec,
    ) -> Result<PermissionOutcome, IdentityError> {
        fs::set_permissions(path, fs::Permissions::from_mode(spec.mode())).map_err(|source| {
            IdentityError::PermissionChangeFailed {
                path: path.to_path_buf(),
                mode: spec,
                source,
            }
        })?;

        info!("chmod {} {}", spec, path.display());
        Ok(PermissionOutcome::Applied(spec))
    }
}
