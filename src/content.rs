//! Rendering of `.desktop` bodies and shared-mime-info packages.
//!
//! Output is byte-exact and deterministic: the reconciler compares the
//! `Exec=` and `StartupWMClass=` lines of an existing entry with a fresh
//! render, so field order and formatting must stay stable across releases.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::identity::ProcessIdentity;
use crate::model::{DesktopEntry, MimeType};

pub const HEADER: &str = "[Desktop Entry]";

static EXEC_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Exec=sh -c '.*'").unwrap());

static STARTUP_CLASS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"StartupWMClass=.*").unwrap());

/// Resolved executable location and invocation name of the program the
/// entry launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: PathBuf,
    pub program_name: String,
}

impl Invocation {
    /// Fails when the path or name spans lines, since such an entry could
    /// never match its own fingerprint.
    pub fn resolve(identity: &dyn ProcessIdentity) -> Result<Self> {
        let executable = identity.executable()?;
        let program_name = identity.program_name()?;

        let multiline = |s: &str| s.contains(['\n', '\r']);
        if multiline(&executable.to_string_lossy()) {
            return Err(Error::PathResolution {
                what: format!("executable {:?} (contains a line break)", executable),
                source: None,
            });
        }
        if multiline(&program_name) {
            return Err(Error::PathResolution {
                what: format!("invocation name {:?} (contains a line break)", program_name),
                source: None,
            });
        }

        Ok(Self { executable, program_name })
    }

    pub fn exec_line(&self) -> String {
        format!("Exec=sh -c '{} %F'", self.executable.display())
    }

    pub fn startup_class_line(&self) -> String {
        format!("StartupWMClass={}", self.program_name)
    }
}

pub fn render_desktop_entry(entry: &DesktopEntry, invocation: &Invocation) -> String {
    let mut lines = vec![
        HEADER.to_string(),
        format!("Type={}", entry.entry_type),
        format!("Name={}", entry.name),
        invocation.exec_line(),
        format!("Icon={}", entry.icon_path().display()),
        invocation.startup_class_line(),
    ];

    if !entry.categories.is_empty() {
        lines.push(format!("Categories={}", entry.categories));
    }
    if !entry.comment.is_empty() {
        lines.push(format!("Comment={}", entry.comment));
    }
    if let Some(mime) = entry.mime_type.as_ref().filter(|m| !m.mime_type.is_empty()) {
        lines.push(format!("MimeType={}", mime.mime_type));
    }

    lines.join("\n")
}

/// Renders a shared-mime-info package. Values are inserted unescaped and
/// must already be XML-safe.
pub fn render_mime_xml(mime: &MimeType) -> String {
    let mut lines = vec![
        r#"<?xml version="1.0" encoding="utf-8"?>"#.to_string(),
        r#"<mime-info xmlns="http://www.freedesktop.org/standards/shared-mime-info">"#.to_string(),
        format!(r#"  <mime-type type="{}">"#, mime.mime_type),
    ];

    for pattern in &mime.patterns {
        lines.push(format!(r#"    <glob pattern="{}"/>"#, pattern));
    }
    if !mime.comment.is_empty() {
        lines.push(format!("    <comment>{}</comment>", mime.comment));
    }
    if !mime.generic_icon.is_empty() {
        lines.push(format!(r#"    <generic-icon name="{}"/>"#, mime.generic_icon));
    }

    lines.push("  </mime-type>".to_string());
    lines.push("</mime-info>".to_string());
    lines.join("\n")
}

/// The two lines of an entry that decide whether it must be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub exec: Option<String>,
    pub startup_class: Option<String>,
}

impl Fingerprint {
    pub fn extract(content: &str) -> Self {
        Self {
            exec: EXEC_LINE.find(content).map(|m| m.as_str().to_string()),
            startup_class: STARTUP_CLASS_LINE.find(content).map(|m| m.as_str().to_string()),
        }
    }

    pub fn of(invocation: &Invocation) -> Self {
        Self {
            exec: Some(invocation.exec_line()),
            startup_class: Some(invocation.startup_class_line()),
        }
    }

    /// A missing line on either side counts as a mismatch.
    pub fn is_stale_against(&self, fresh: &Fingerprint) -> bool {
        let differs = |old: &Option<String>, new: &Option<String>| match (old, new) {
            (Some(old), Some(new)) => old != new,
            _ => true,
        };
        differs(&self.exec, &fresh.exec) || differs(&self.startup_class, &fresh.startup_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;

    fn invocation() -> Invocation {
        let id = StaticIdentity::new("/opt/viewer/viewer").with_args(["viewer", "a.png"]);
        Invocation::resolve(&id).unwrap()
    }

    fn entry() -> DesktopEntry {
        let mut entry = DesktopEntry::new("Viewer", "0.3.1", Vec::new());
        entry.icons_path = PathBuf::from("/home/u/.icons");
        entry
    }

    #[test]
    fn minimal_entry_is_exact() {
        let content = render_desktop_entry(&entry(), &invocation());
        assert_eq!(
            content,
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Viewer\n\
             Exec=sh -c '/opt/viewer/viewer %F'\n\
             Icon=/home/u/.icons/viewer.png\n\
             StartupWMClass=viewer"
        );
    }

    #[test]
    fn optional_fields_follow_in_order() {
        let mut entry = entry();
        entry.categories = "Graphics;Viewer;".into();
        entry.comment = "Look at pictures".into();
        entry.mime_type = Some(MimeType::new("image/x-view", "/m"));

        let content = render_desktop_entry(&entry, &invocation());
        let tail: Vec<&str> = content.lines().skip(6).collect();
        assert_eq!(
            tail,
            vec![
                "Categories=Graphics;Viewer;",
                "Comment=Look at pictures",
                "MimeType=image/x-view",
            ]
        );
        assert!(!content.ends_with('\n'));
    }

    #[test]
    fn empty_mime_type_string_is_not_emitted() {
        let mut entry = entry();
        entry.mime_type = Some(MimeType::default());
        assert!(!render_desktop_entry(&entry, &invocation()).contains("MimeType="));
    }

    #[test]
    fn mime_xml_shape() {
        let mime = MimeType {
            mime_type: "application/x-viewer".into(),
            path: None,
            comment: "Viewer document".into(),
            generic_icon: "image-x-generic".into(),
            patterns: vec!["*.vw".into(), "*.view".into()],
        };
        assert_eq!(
            render_mime_xml(&mime),
            r#"<?xml version="1.0" encoding="utf-8"?>
<mime-info xmlns="http://www.freedesktop.org/standards/shared-mime-info">
  <mime-type type="application/x-viewer">
    <glob pattern="*.vw"/>
    <glob pattern="*.view"/>
    <comment>Viewer document</comment>
    <generic-icon name="image-x-generic"/>
  </mime-type>
</mime-info>"#
        );
    }

    #[test]
    fn mime_xml_without_optionals() {
        let xml = render_mime_xml(&MimeType::new("text/x-a", "/m"));
        assert!(!xml.contains("<glob"));
        assert!(!xml.contains("<comment>"));
        assert!(!xml.contains("<generic-icon"));
        assert!(xml.ends_with("  </mime-type>\n</mime-info>"));
    }

    #[test]
    fn fingerprint_round_trips_through_render() {
        let inv = invocation();
        let rendered = render_desktop_entry(&entry(), &inv);
        let found = Fingerprint::extract(&rendered);
        assert_eq!(found, Fingerprint::of(&inv));
        assert!(!found.is_stale_against(&Fingerprint::of(&inv)));
    }

    #[test]
    fn moved_binary_is_stale() {
        let rendered = render_desktop_entry(&entry(), &invocation());
        let moved = StaticIdentity::new("/usr/lib/viewer/viewer").with_args(["viewer"]);
        let fresh = Fingerprint::of(&Invocation::resolve(&moved).unwrap());
        assert!(Fingerprint::extract(&rendered).is_stale_against(&fresh));
    }

    #[test]
    fn line_breaks_in_invocation_are_rejected() {
        let odd_dir = StaticIdentity::new("/opt/odd\ndir/viewer").with_args(["viewer"]);
        assert!(matches!(
            Invocation::resolve(&odd_dir),
            Err(Error::PathResolution { .. })
        ));

        let odd_name = StaticIdentity::new("/opt/viewer/viewer").with_args(["view\rer"]);
        assert!(matches!(
            Invocation::resolve(&odd_name),
            Err(Error::PathResolution { .. })
        ));
    }

    #[test]
    fn garbage_is_stale() {
        let found = Fingerprint::extract("not changed");
        assert_eq!(found.exec, None);
        assert!(found.is_stale_against(&Fingerprint::of(&invocation())));
    }
}
