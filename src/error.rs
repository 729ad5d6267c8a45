use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Provisioning stage a filesystem failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Paths,
    Icon,
    Entry,
    MimeType,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Paths => write!(f, "paths-creation"),
            Stage::Icon => write!(f, "icon-creation"),
            Stage::Entry => write!(f, "entry-creation"),
            Stage::MimeType => write!(f, "mime-creation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Own executable path or invocation name could not be determined.
    #[error("cannot resolve {what}")]
    PathResolution {
        what: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("{stage} failed for {}: {source}", .path.display())]
    Filesystem {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    pub(crate) fn fs(stage: Stage, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Error::Filesystem { stage, path, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Filesystem { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
