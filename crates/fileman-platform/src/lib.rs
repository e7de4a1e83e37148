// Platform-neutral contracts shared by the unix and windows identity crates

pub mod identity;
pub mod permission;
pub mod security;

pub use identity::{
    IdentityError, LookupStage, OwnerDescriptor, OwnerLookup, OwnerResolutionFailed,
    PermissionOutcome, PlatformIdentity, PlatformKind,
};
pub use permission::{InvalidPermission, PermissionSpec};
