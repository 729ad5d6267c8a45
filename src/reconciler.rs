use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use image::ImageFormat;
use log::{debug, info, warn};

use crate::content::{Fingerprint, Invocation, render_desktop_entry, render_mime_xml};
use crate::error::{Error, Result, Stage};
use crate::executor::{
    CommandRunner, ProcessRelauncher, Relauncher, SystemCommandRunner, UPDATE_DESKTOP_DATABASE,
    UPDATE_MIME_DATABASE,
};
use crate::identity::{CurrentProcess, ProcessIdentity, is_transient};
use crate::model::DesktopEntry;

/// What a `create` call wrote. A skipped run reports nothing written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub icon_written: bool,
    pub entry_changed: bool,
    pub mime_written: bool,
    pub relaunch_requested: bool,
}

impl Outcome {
    pub fn wrote_anything(&self) -> bool {
        self.icon_written || self.entry_changed || self.mime_written
    }
}

pub struct Reconciler {
    identity: Box<dyn ProcessIdentity>,
    runner: Box<dyn CommandRunner>,
    relauncher: Box<dyn Relauncher>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            identity: Box::new(CurrentProcess),
            runner: Box::new(SystemCommandRunner),
            relauncher: Box::new(ProcessRelauncher),
        }
    }

    pub fn with_identity(mut self, identity: impl ProcessIdentity + 'static) -> Self {
        self.identity = Box::new(identity);
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_relauncher(mut self, relauncher: impl Relauncher + 'static) -> Self {
        self.relauncher = Box::new(relauncher);
        self
    }

    /// Creates the entry, icon and mime package, or brings a stale entry up
    /// to date. Safe to call on every startup.
    pub fn create(&self, entry: &DesktopEntry) -> Result<Outcome> {
        let identity = self.identity.as_ref();
        let mut outcome = Outcome::default();

        if is_transient(identity) {
            debug!("Skipping desktop entry for transient build");
            return Ok(outcome);
        }
        let os = identity.os();
        if !entry.oss.iter().any(|allowed| *allowed == os) {
            debug!("Skipping desktop entry, {} is not in {:?}", os, entry.oss);
            return Ok(outcome);
        }

        let mime_target = match entry.mime_package() {
            Some(mime) => mime.package_path()?.map(|path| (mime, path)),
            None => None,
        };
        let invocation = Invocation::resolve(identity)?;

        for dir in entry.target_dirs() {
            ensure_dir(dir, entry.perm, Stage::Paths)?;
        }

        outcome.icon_written = self.provision_icon(entry)?;
        outcome.entry_changed = self.provision_entry(entry, &invocation)?;

        if let Some((mime, path)) = mime_target {
            outcome.mime_written = self.provision_mime(entry, &render_mime_xml(mime), &path)?;
        }

        if outcome.entry_changed && entry.rerun_if_changed {
            outcome.relaunch_requested = true;
            self.relauncher.relaunch(identity)?;
        }

        Ok(outcome)
    }

    fn provision_icon(&self, entry: &DesktopEntry) -> Result<bool> {
        let path = entry.icon_path();
        if exists(&path, Stage::Icon)? {
            debug!("Icon {:?} already present", path);
            return Ok(false);
        }

        if !matches!(image::guess_format(&entry.icon), Ok(ImageFormat::Png)) {
            warn!("Icon data for {} does not look like a PNG image", entry.name);
        }
        write_file(&path, &entry.icon, entry.perm, Stage::Icon)?;
        info!("Wrote icon {:?}", path);
        Ok(true)
    }

    fn provision_entry(&self, entry: &DesktopEntry, invocation: &Invocation) -> Result<bool> {
        let path = entry.entry_path();

        if exists(&path, Stage::Entry)? {
            if !entry.update_if_changed {
                debug!("Entry {:?} exists and updates are disabled", path);
                return Ok(false);
            }
            let existing = fs::read(&path).map_err(Error::fs(Stage::Entry, &path))?;
            let found = Fingerprint::extract(&String::from_utf8_lossy(&existing));
            if !found.is_stale_against(&Fingerprint::of(invocation)) {
                debug!("Entry {:?} is up to date", path);
                return Ok(false);
            }
            info!("Entry {:?} is stale, regenerating", path);
        }

        let content = render_desktop_entry(entry, invocation);
        write_file(&path, content.as_bytes(), entry.perm, Stage::Entry)?;
        info!("Wrote desktop entry {:?}", path);

        self.runner
            .run_best_effort(UPDATE_DESKTOP_DATABASE, &[entry.apps_path.as_os_str()]);
        Ok(true)
    }

    fn provision_mime(&self, entry: &DesktopEntry, content: &str, path: &Path) -> Result<bool> {
        if exists(path, Stage::MimeType)? {
            if !entry.update_if_changed {
                debug!("Mime package {:?} exists and updates are disabled", path);
                return Ok(false);
            }
            let existing = fs::read(path).map_err(Error::fs(Stage::MimeType, path))?;
            if existing == content.as_bytes() {
                debug!("Mime package {:?} is up to date", path);
                return Ok(false);
            }
        }

        if let Some(packages) = path.parent() {
            ensure_dir(packages, entry.perm, Stage::MimeType)?;
        }
        write_file(path, content.as_bytes(), entry.perm, Stage::MimeType)?;
        info!("Wrote mime package {:?}", path);

        if let Some(dir) = entry.mime_type.as_ref().and_then(|m| m.path.as_deref()) {
            self.runner.run_best_effort(UPDATE_MIME_DATABASE, &[dir.as_os_str()]);
        }
        Ok(true)
    }
}

impl DesktopEntry {
    /// Runs [`Reconciler::create`] against the current process.
    pub fn create(&self) -> Result<Outcome> {
        Reconciler::new().create(self)
    }
}

fn exists(path: &Path, stage: Stage) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::fs(stage, path)(e)),
    }
}

fn ensure_dir(path: &Path, perm: u32, stage: Stage) -> Result<()> {
    if exists(path, stage)? {
        return Ok(());
    }
    match DirBuilder::new().recursive(true).mode(perm).create(path) {
        Ok(()) => {
            debug!("Created {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(Error::fs(stage, path)(e)),
    }
}

fn write_file(path: &Path, data: &[u8], perm: u32, stage: Stage) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(perm)
        .open(path)
        .map_err(Error::fs(stage, path))?;
    file.write_all(data).map_err(Error::fs(stage, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn ensure_dir_creates_nested_tree_with_mode() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");
        ensure_dir(&dir, 0o700, Stage::Paths).unwrap();
        assert!(dir.is_dir());
        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);

        // second call is a no-op
        ensure_dir(&dir, 0o700, Stage::Paths).unwrap();
    }

    #[test]
    fn ensure_dir_reports_stage_on_failure() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        let err = ensure_dir(&file.join("sub"), 0o755, Stage::Paths).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Paths));
    }

    #[test]
    fn write_file_truncates_existing_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        write_file(&path, b"longer content", 0o644, Stage::Entry).unwrap();
        write_file(&path, b"short", 0o644, Stage::Entry).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn outcome_default_wrote_nothing() {
        assert!(!Outcome::default().wrote_anything());
    }
}
