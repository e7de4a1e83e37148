//! Staged owner lookup for security-descriptor based platforms.
//!
//! Each native step is a separate method so a failure can be attributed to
//! the stage that produced it. Buffers are owned so no pointer into a freed
//! descriptor ever escapes a step.

use std::io;
use std::path::Path;

use crate::identity::{LookupStage, OwnerDescriptor, OwnerLookup, OwnerResolutionFailed};

/// Account a SID resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountName {
    pub domain: String,
    pub name: String,
}

pub trait SecurityDescriptorApi {
    /// Self-relative security descriptor of `path`, owner information only.
    fn file_security(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Copy of the owner SID stored in `descriptor`.
    fn owner_sid(&self, descriptor: &[u8]) -> io::Result<Vec<u8>>;

    /// Reverse lookup of `sid` to its account.
    fn account_name(&self, sid: &[u8]) -> io::Result<AccountName>;
}

/// Run descriptor fetch, owner extraction and name lookup in order.
pub fn resolve_account_owner<A>(api: &A, path: &Path) -> OwnerLookup
where
    A: SecurityDescriptorApi + ?Sized,
{
    let descriptor = match api.file_security(path) {
        Ok(d) => d,
        Err(e) => return unresolved(LookupStage::DescriptorFetch, e),
    };

    let sid = match api.owner_sid(&descriptor) {
        Ok(s) => s,
        Err(e) => return unresolved(LookupStage::OwnerExtraction, e),
    };

    match api.account_name(&sid) {
        Ok(account) => OwnerLookup::Resolved(OwnerDescriptor::Account {
            domain: account.domain,
            name: account.name,
        }),
        Err(e) => unresolved(LookupStage::NameLookup, e),
    }
}

fn unresolved(stage: LookupStage, source: io::Error) -> OwnerLookup {
    OwnerLookup::Unresolved(OwnerResolutionFailed::new(stage, source))
}
