use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{Error, Result};

/// Application metadata and placement policy for a desktop entry.
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    pub name: String,            // Display name, lower-cased it becomes the file id
    pub version: String,
    pub icon: Vec<u8>,           // PNG bytes, written verbatim
    pub entry_type: String,      // `Type=` value
    pub categories: String,      // Semicolon separated
    pub comment: String,
    pub arch: String,            // Informational, never emitted
    pub apps_path: PathBuf,
    pub icons_path: PathBuf,
    pub perm: u32,               // Mode for created directories and files
    pub oss: Vec<String>,        // Allowed `std::env::consts::OS` values
    pub update_if_changed: bool,
    pub rerun_if_changed: bool,
    pub mime_type: Option<MimeType>,
}

/// A shared-mime-info registration tied to the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeType {
    pub mime_type: String,
    pub path: Option<PathBuf>,
    pub comment: String,
    pub generic_icon: String,
    pub patterns: Vec<String>,
}

pub const DEFAULT_PERM: u32 = 0o755;

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_default()
}

pub fn default_apps_path() -> PathBuf {
    home_dir().join(".local/share/applications")
}

pub fn default_icons_path() -> PathBuf {
    home_dir().join(".icons")
}

impl DesktopEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>, icon: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            icon,
            entry_type: "Application".to_string(),
            categories: String::new(),
            comment: String::new(),
            arch: "x86_64".to_string(),
            apps_path: default_apps_path(),
            icons_path: default_icons_path(),
            perm: DEFAULT_PERM,
            oss: vec!["linux".to_string()],
            update_if_changed: true,
            rerun_if_changed: true,
            mime_type: None,
        }
    }

    /// On-disk base name shared by the entry and icon files.
    pub fn id(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn icon_path(&self) -> PathBuf {
        self.icons_path.join(format!("{}.png", self.id()))
    }

    pub fn entry_path(&self) -> PathBuf {
        self.apps_path.join(format!("{}.desktop", self.id()))
    }

    /// Mime registration that needs an XML package, if any.
    pub(crate) fn mime_package(&self) -> Option<&MimeType> {
        let mime = self.mime_type.as_ref()?;
        let path = mime.path.as_deref()?;
        if mime.mime_type.is_empty() || path.as_os_str().is_empty() {
            return None;
        }
        Some(mime)
    }

    /// Directories provisioned before any file is written.
    pub(crate) fn target_dirs(&self) -> Vec<&Path> {
        let mut dirs = vec![self.apps_path.as_path(), self.icons_path.as_path()];
        if let Some(path) = self.mime_type.as_ref().and_then(|m| m.path.as_deref()) {
            if !path.as_os_str().is_empty() {
                dirs.push(path);
            }
        }
        dirs
    }
}

impl MimeType {
    pub fn new(mime_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            mime_type: mime_type.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Segment after the first `/`, e.g. `png` for `image/png`.
    pub fn subtype(&self) -> Result<&str> {
        match self.mime_type.split('/').nth(1) {
            Some(subtype) if !subtype.is_empty() => Ok(subtype),
            Some(_) => Err(Error::InvalidConfiguration(format!(
                "mime type '{}' has an empty subtype",
                self.mime_type
            ))),
            None => Err(Error::InvalidConfiguration(format!(
                "mime type '{}' has no '/' separator",
                self.mime_type
            ))),
        }
    }

    /// `<path>/packages/<subtype>.xml`
    pub fn package_path(&self) -> Result<Option<PathBuf>> {
        let subtype = self.subtype()?;
        Ok(self
            .path
            .as_ref()
            .map(|dir| dir.join("packages").join(format!("{}.xml", subtype))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let entry = DesktopEntry::new("Viewer", "1.2.0", b"png".to_vec());
        assert_eq!(entry.entry_type, "Application");
        assert_eq!(entry.arch, "x86_64");
        assert_eq!(entry.perm, 0o755);
        assert_eq!(entry.oss, vec!["linux".to_string()]);
        assert!(entry.update_if_changed);
        assert!(entry.rerun_if_changed);
        assert!(entry.mime_type.is_none());
        assert!(entry.apps_path.ends_with(".local/share/applications"));
        assert!(entry.icons_path.ends_with(".icons"));
    }

    #[test]
    fn id_is_lowercased_name() {
        let mut entry = DesktopEntry::new("My Viewer", "1.0", Vec::new());
        entry.apps_path = PathBuf::from("/apps");
        entry.icons_path = PathBuf::from("/icons");
        assert_eq!(entry.id(), "my viewer");
        assert_eq!(entry.entry_path(), PathBuf::from("/apps/my viewer.desktop"));
        assert_eq!(entry.icon_path(), PathBuf::from("/icons/my viewer.png"));
    }

    #[test]
    fn subtype_requires_separator() {
        let good = MimeType::new("application/x-viewer", "/mime");
        assert_eq!(good.subtype().unwrap(), "x-viewer");
        assert_eq!(
            good.package_path().unwrap(),
            Some(PathBuf::from("/mime/packages/x-viewer.xml"))
        );

        let bad = MimeType::new("viewer", "/mime");
        assert!(matches!(bad.subtype(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn empty_subtype_is_rejected() {
        let bad = MimeType::new("image/", "/mime");
        assert!(matches!(bad.subtype(), Err(Error::InvalidConfiguration(_))));
        assert!(bad.package_path().is_err());
    }

    #[test]
    fn mime_package_needs_type_and_path() {
        let mut entry = DesktopEntry::new("app", "1", Vec::new());
        entry.mime_type = Some(MimeType {
            mime_type: "text/x-app".into(),
            ..Default::default()
        });
        assert!(entry.mime_package().is_none());
        assert_eq!(entry.target_dirs().len(), 2);

        entry.mime_type = Some(MimeType::new("text/x-app", "/mime"));
        assert!(entry.mime_package().is_some());
        assert_eq!(entry.target_dirs().len(), 3);
    }
}
