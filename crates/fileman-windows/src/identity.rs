use std::path::Path;

use fileman_platform::security::resolve_account_owner;
use fileman_platform::{
    IdentityError, OwnerLookup, PermissionOutcome, PermissionSpec, PlatformIdentity, PlatformKind,
};
use tracing::warn;

use crate::security::Win32SecurityApi;

/// Windows identity: owner comes from the file's security descriptor.
/// Numeric modes are never translated into ACL entries.
pub struct WindowsIdentity {
    api: Win32SecurityApi,
}

impl WindowsIdentity {
    pub fn new() -> Self {
        Self {
            api: Win32SecurityApi,
        }
    }
}

impl Default for WindowsIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformIdentity for WindowsIdentity {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Windows
    }

    fn lookup_owner(&self, path: &Path) -> OwnerLookup {
        resolve_account_owner(&self.api, path)
    }

    fn apply_permissions(
        &self,
        path: &Path,
        spec: PermissionSpec,
    ) -> Result<PermissionOutcome, IdentityError> {
        warn!(
            "mode {} not applied to {}: windows permissions are ACL based",
            spec,
            path.display()
        );
        Ok(PermissionOutcome::OwnerReported(self.resolve_owner(path)))
    }
}
