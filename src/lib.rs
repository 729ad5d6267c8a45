//! Self-installing desktop integration for Linux binaries.
//!
//! Call [`DesktopEntry::create`] at the top of `main`. The first qualifying
//! run writes `~/.local/share/applications/<name>.desktop`, the icon and an
//! optional shared-mime-info package. Later runs leave everything alone unless
//! the binary moved or was invoked under a different name, in which case the
//! entry is regenerated and the program relaunched.
//!
//! ```rust,no_run
//! use desktop_entry::DesktopEntry;
//!
//! let icon = std::fs::read("/usr/share/viewer/icon.png").unwrap_or_default();
//! let mut entry = DesktopEntry::new("Viewer", "0.3.1", icon);
//! entry.comment = "Look at pictures".into();
//! entry.categories = "Graphics;Viewer;".into();
//! if let Err(e) = entry.create() {
//!     eprintln!("desktop entry: {e}");
//! }
//! ```

pub mod content;
pub mod error;
pub mod executor;
pub mod identity;
pub mod model;
pub mod reconciler;

pub use content::{Fingerprint, Invocation, render_desktop_entry, render_mime_xml};
pub use error::{Error, Result, Stage};
pub use executor::{CommandRunner, ProcessRelauncher, Relauncher, SystemCommandRunner};
pub use identity::{CurrentProcess, ProcessIdentity, StaticIdentity};
pub use model::{DesktopEntry, MimeType};
pub use reconciler::{Outcome, Reconciler};
