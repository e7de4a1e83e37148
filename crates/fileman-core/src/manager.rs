//! Stateful facade over a single working directory.
//!
//! Every name argument is joined onto the working directory before any
//! filesystem call. Ownership and permission concerns go through the
//! [`PlatformIdentity`] chosen at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fileman_platform::{
    IdentityError, OwnerDescriptor, PermissionOutcome, PermissionSpec, PlatformIdentity,
    PlatformKind,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FileManagerError {
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' is not an existing directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    PermissionChangeFailed(#[from] IdentityError),

    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileManagerError {
    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        FileManagerError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileManagerError>;

/// One child of the working directory, recomputed on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub owner: OwnerDescriptor,
}

#[derive(Debug)]
pub struct Created {
    pub path: PathBuf,
    /// Present when a mode was supplied at creation. A failed permission
    /// change leaves the file created.
    pub permissions: Option<std::result::Result<PermissionOutcome, IdentityError>>,
}

pub struct FileManager {
    cwd: PathBuf,
    identity: Box<dyn PlatformIdentity>,
}

impl FileManager {
    pub fn new(start_dir: impl AsRef<Path>, identity: Box<dyn PlatformIdentity>) -> Result<Self> {
        let start_dir = start_dir.as_ref();
        if !start_dir.is_dir() {
            return Err(FileManagerError::NotADirectory(start_dir.to_path_buf()));
        }
        let cwd = fs::canonicalize(start_dir)
            .map_err(|e| FileManagerError::io("resolve", start_dir, e))?;

        info!(
            "file manager ready in {} (platform={})",
            cwd.display(),
            identity.kind()
        );
        Ok(Self { cwd, identity })
    }

    /// Start in the directory the process was launched from.
    pub fn from_process(identity: Box<dyn PlatformIdentity>) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| FileManagerError::io("read current directory", Path::new("."), e))?;
        Self::new(cwd, identity)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn platform(&self) -> PlatformKind {
        self.identity.kind()
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        self.cwd.join(name)
    }

    fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(FileManagerError::NotFound(path))
        }
    }

    pub fn create_file(&self, name: &str, spec: Option<PermissionSpec>) -> Result<Created> {
        let path = self.resolve(name);
        if path.exists() {
            return Err(FileManagerError::AlreadyExists(path));
        }

        // create_new keeps a racing or dangling target from being truncated
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => FileManagerError::AlreadyExists(path.clone()),
                _ => FileManagerError::io("create", &path, e),
            })?;
        info!("created {}", path.display());

        let permissions = spec.map(|spec| {
            let result = self.identity.apply_permissions(&path, spec);
            if let Err(e) = &result {
                warn!("{} created but {}", path.display(), e);
            }
            result
        });

        Ok(Created { path, permissions })
    }

    pub fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.existing(name)?;
        fs::remove_file(&path).map_err(|e| FileManagerError::io("delete", &path, e))?;
        info!("deleted {}", path.display());
        Ok(())
    }

    /// Whole file as text; invalid UTF-8 is replaced for display.
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.existing(name)?;
        let data = fs::read(&path).map_err(|e| FileManagerError::io("read", &path, e))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Replace the file's content entirely.
    pub fn write_file(&self, name: &str, content: &str) -> Result<()> {
        let path = self.existing(name)?;
        fs::write(&path, content).map_err(|e| FileManagerError::io("write", &path, e))?;
        info!("wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    pub fn set_permissions(&self, name: &str, spec: PermissionSpec) -> Result<PermissionOutcome> {
        let path = self.existing(name)?;
        Ok(self.identity.apply_permissions(&path, spec)?)
    }

    pub fn owner_of(&self, name: &str) -> Result<OwnerDescriptor> {
        let path = self.existing(name)?;
        Ok(self.identity.resolve_owner(&path))
    }

    /// Move the working directory; unchanged unless the target is a directory.
    pub fn change_directory(&mut self, dir: &str) -> Result<&Path> {
        let target = self.resolve(dir);
        if !target.is_dir() {
            return Err(FileManagerError::NotADirectory(target));
        }
        let target =
            fs::canonicalize(&target).map_err(|e| FileManagerError::io("resolve", &target, e))?;

        info!("cwd {} -> {}", self.cwd.display(), target.display());
        self.cwd = target;
        Ok(&self.cwd)
    }

    /// Immediate children in directory enumeration order.
    pub fn list_directory(&self) -> Result<Vec<FileEntry>> {
        let entries =
            fs::read_dir(&self.cwd).map_err(|e| FileManagerError::io("list", &self.cwd, e))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping dir entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            result.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: path.is_dir(),
                owner: self.identity.resolve_owner(&path),
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use fileman_platform::{LookupStage, OwnerLookup, OwnerResolutionFailed};

    pub(crate) type Applied = Arc<Mutex<Vec<(PathBuf, PermissionSpec)>>>;

    /// Uid 42 for anything that exists; records every mode it is asked to apply.
    pub(crate) struct StubIdentity {
        pub kind: PlatformKind,
        pub applied: Applied,
        /// Every permission change fails with EACCES.
        pub deny: bool,
    }

    impl StubIdentity {
        pub(crate) fn boxed(kind: PlatformKind) -> (Box<dyn PlatformIdentity>, Applied) {
            Self::build(kind, false)
        }

        pub(crate) fn denying(kind: PlatformKind) -> (Box<dyn PlatformIdentity>, Applied) {
            Self::build(kind, true)
        }

        fn build(kind: PlatformKind, deny: bool) -> (Box<dyn PlatformIdentity>, Applied) {
            let applied = Applied::default();
            let identity = StubIdentity {
                kind,
                applied: applied.clone(),
                deny,
            };
            (Box::new(identity), applied)
        }
    }

    impl PlatformIdentity for StubIdentity {
        fn kind(&self) -> PlatformKind {
            self.kind
        }

        fn lookup_owner(&self, path: &Path) -> OwnerLookup {
            if path.exists() {
                OwnerLookup::Resolved(OwnerDescriptor::uid(42))
            } else {
                OwnerLookup::Unresolved(OwnerResolutionFailed::new(
                    LookupStage::Stat,
                    io::Error::from(io::ErrorKind::NotFound),
                ))
            }
        }

        fn apply_permissions(
            &self,
            path: &Path,
            spec: PermissionSpec,
        ) -> std::result::Result<PermissionOutcome, IdentityError> {
            self.applied.lock().unwrap().push((path.to_path_buf(), spec));
            if self.deny {
                return Err(IdentityError::PermissionChangeFailed {
                    path: path.to_path_buf(),
                    mode: spec,
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            match self.kind {
                PlatformKind::Posix => Ok(PermissionOutcome::Applied(spec)),
                PlatformKind::Windows => Ok(PermissionOutcome::OwnerReported(
                    self.resolve_owner(path),
                )),
            }
        }
    }

    fn manager(dir: &Path) -> (FileManager, Applied) {
        let (identity, applied) = StubIdentity::boxed(PlatformKind::Posix);
        (FileManager::new(dir, identity).unwrap(), applied)
    }

    fn mode(m: u32) -> PermissionSpec {
        PermissionSpec::from_mode(m).unwrap()
    }

    #[test]
    fn test_create_then_create_again() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, applied) = manager(dir.path());

        let created = fm.create_file("a.txt", None).unwrap();
        assert!(created.path.exists());
        assert!(created.permissions.is_none());
        assert!(applied.lock().unwrap().is_empty());

        fs::write(&created.path, "keep me").unwrap();
        match fm.create_file("a.txt", None) {
            Err(FileManagerError::AlreadyExists(p)) => assert_eq!(p, created.path),
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&created.path).unwrap(), "keep me");
    }

    #[test]
    fn test_create_with_mode_forwards_to_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, applied) = manager(dir.path());

        let created = fm.create_file("b.txt", Some(mode(0o640))).unwrap();
        assert_eq!(
            created.permissions.unwrap().unwrap(),
            PermissionOutcome::Applied(mode(0o640))
        );

        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], (created.path.clone(), mode(0o640)));
    }

    #[test]
    fn test_create_keeps_file_when_mode_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let (identity, applied) = StubIdentity::denying(PlatformKind::Posix);
        let fm = FileManager::new(dir.path(), identity).unwrap();

        let created = fm.create_file("locked.txt", Some(mode(0o600))).unwrap();
        assert!(created.path.exists());
        match created.permissions {
            Some(Err(IdentityError::PermissionChangeFailed { mode: m, .. })) => {
                assert_eq!(m, mode(0o600))
            }
            other => panic!("expected a failed permission change, got {:?}", other),
        }
        assert_eq!(applied.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_set_permissions_denied_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (identity, _) = StubIdentity::denying(PlatformKind::Posix);
        let fm = FileManager::new(dir.path(), identity).unwrap();
        fm.create_file("f", None).unwrap();

        assert!(matches!(
            fm.set_permissions("f", mode(0o644)),
            Err(FileManagerError::PermissionChangeFailed(_))
        ));
    }

    #[test]
    fn test_delete_then_delete_again() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, _) = manager(dir.path());

        fm.create_file("gone.txt", None).unwrap();
        fm.delete_file("gone.txt").unwrap();
        assert!(!fm.resolve("gone.txt").exists());

        assert!(matches!(
            fm.delete_file("gone.txt"),
            Err(FileManagerError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let (fm, _) = manager(dir.path());

        match fm.delete_file("sub") {
            Err(FileManagerError::Io { op, .. }) => assert_eq!(op, "delete"),
            other => panic!("expected Io error, got {:?}", other),
        }
        assert!(dir.path().join("sub").is_dir());
    }

    #[test]
    fn test_write_read_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, _) = manager(dir.path());
        fm.create_file("notes.txt", None).unwrap();

        fm.write_file("notes.txt", "first line\nsecond line").unwrap();
        assert_eq!(fm.read_file("notes.txt").unwrap(), "first line\nsecond line");

        fm.write_file("notes.txt", "short").unwrap();
        assert_eq!(fm.read_file("notes.txt").unwrap(), "short");
    }

    #[test]
    fn test_read_and_write_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, _) = manager(dir.path());

        assert!(matches!(fm.read_file("nope"), Err(FileManagerError::NotFound(_))));
        assert!(matches!(
            fm.write_file("nope", "x"),
            Err(FileManagerError::NotFound(_))
        ));
        assert!(!fm.resolve("nope").exists());
    }

    #[test]
    fn test_read_invalid_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin"), [b'o', b'k', 0xff]).unwrap();
        let (fm, _) = manager(dir.path());

        assert_eq!(fm.read_file("bin").unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_set_permissions_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, applied) = manager(dir.path());

        assert!(matches!(
            fm.set_permissions("missing", mode(0o600)),
            Err(FileManagerError::NotFound(_))
        ));
        assert!(applied.lock().unwrap().is_empty());

        fm.create_file("present", None).unwrap();
        let outcome = fm.set_permissions("present", mode(0o600)).unwrap();
        assert_eq!(outcome, PermissionOutcome::Applied(mode(0o600)));
    }

    #[test]
    fn test_windows_style_set_permissions_reports_owner() {
        let dir = tempfile::tempdir().unwrap();
        let (identity, applied) = StubIdentity::boxed(PlatformKind::Windows);
        let fm = FileManager::new(dir.path(), identity).unwrap();
        fm.create_file("w.txt", None).unwrap();

        let outcome = fm.set_permissions("w.txt", mode(0o600)).unwrap();
        assert_eq!(outcome, PermissionOutcome::OwnerReported(OwnerDescriptor::uid(42)));
        assert_eq!(applied.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_change_directory_and_relative_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let (mut fm, _) = manager(dir.path());
        let root = fm.cwd().to_path_buf();

        let new_cwd = fm.change_directory("sub").unwrap().to_path_buf();
        assert_eq!(new_cwd, root.join("sub"));

        fm.create_file("inner.txt", None).unwrap();
        assert!(dir.path().join("sub").join("inner.txt").exists());

        fm.change_directory("..").unwrap();
        assert_eq!(fm.cwd(), root.as_path());
    }

    #[test]
    fn test_change_directory_rejects_missing_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "").unwrap();
        let (mut fm, _) = manager(dir.path());
        let before = fm.cwd().to_path_buf();

        assert!(matches!(
            fm.change_directory("does-not-exist"),
            Err(FileManagerError::NotADirectory(_))
        ));
        assert!(matches!(
            fm.change_directory("file.txt"),
            Err(FileManagerError::NotADirectory(_))
        ));
        assert_eq!(fm.cwd(), before.as_path());
    }

    #[test]
    fn test_list_directory_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let (fm, _) = manager(dir.path());

        let mut entries = fm.list_directory().unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                FileEntry {
                    name: "file.txt".to_string(),
                    is_dir: false,
                    owner: OwnerDescriptor::uid(42),
                },
                FileEntry {
                    name: "subdir".to_string(),
                    is_dir: true,
                    owner: OwnerDescriptor::uid(42),
                },
            ]
        );
    }

    #[test]
    fn test_list_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (fm, _) = manager(dir.path());
        assert!(fm.list_directory().unwrap().is_empty());
    }

    #[test]
    fn test_new_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();

        let (identity, _) = StubIdentity::boxed(PlatformKind::Posix);
        assert!(matches!(
            FileManager::new(&file, identity),
            Err(FileManagerError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = FileEntry {
            name: "a".to_string(),
            is_dir: false,
            owner: OwnerDescriptor::Unknown,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"name":"a","is_dir":false,"owner":{"kind":"unknown"}}"#
        );
    }

    #[cfg(unix)]
    mod posix {
        use super::*;
        use fileman_unix::identity::PosixIdentity;
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        #[test]
        fn test_set_permissions_applies_mode() {
            let dir = tempfile::tempdir().unwrap();
            let fm = FileManager::new(dir.path(), Box::new(PosixIdentity::new())).unwrap();
            fm.create_file("secret", None).unwrap();

            fm.set_permissions("secret", mode(0o600)).unwrap();
            let meta = fs::metadata(fm.resolve("secret")).unwrap();
            assert_eq!(meta.permissions().mode() & 0o7777, 0o600);
        }

        #[test]
        fn test_create_with_mode() {
            let dir = tempfile::tempdir().unwrap();
            let fm = FileManager::new(dir.path(), Box::new(PosixIdentity::new())).unwrap();

            fm.create_file("script.sh", Some(mode(0o750))).unwrap();
            let meta = fs::metadata(fm.resolve("script.sh")).unwrap();
            assert_eq!(meta.permissions().mode() & 0o7777, 0o750);
        }

        #[test]
        fn test_listing_keeps_dangling_symlink_as_unknown() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("real.txt"), "").unwrap();
            std::os::unix::fs::symlink(dir.path().join("vanished"), dir.path().join("dangling"))
                .unwrap();
            let fm = FileManager::new(dir.path(), Box::new(PosixIdentity::new())).unwrap();

            let mut entries = fm.list_directory().unwrap();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            assert_eq!(entries.len(), 2);

            assert_eq!(entries[0].name, "dangling");
            assert!(!entries[0].is_dir);
            assert_eq!(entries[0].owner, OwnerDescriptor::Unknown);

            assert_eq!(entries[1].name, "real.txt");
            assert!(!entries[1].owner.is_unknown());
        }

        #[test]
        fn test_listing_owner_is_uid() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("mine"), "").unwrap();
            let fm = FileManager::new(dir.path(), Box::new(PosixIdentity::new())).unwrap();

            let uid = fs::metadata(dir.path().join("mine")).unwrap().uid();
            let entries = fm.list_directory().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].owner, OwnerDescriptor::uid(uid));
        }
    }
}
