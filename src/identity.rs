use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

/// Where the running program lives and how it was invoked.
pub trait ProcessIdentity {
    /// Absolute path of the executable.
    fn executable(&self) -> Result<PathBuf>;

    /// Argument vector, argv[0] included.
    fn args(&self) -> Result<Vec<OsString>>;

    fn os(&self) -> String {
        env::consts::OS.to_string()
    }

    fn temp_dir(&self) -> PathBuf {
        env::temp_dir()
    }

    /// Basename of argv[0].
    fn program_name(&self) -> Result<String> {
        let args = self.args()?;
        let arg0 = args.first().ok_or_else(|| Error::PathResolution {
            what: "invocation name (empty argument vector)".to_string(),
            source: None,
        })?;
        let name = Path::new(arg0)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            // "/" and "" have no basename, keep the raw value like `basename(1)` would
            .unwrap_or_else(|| arg0.to_string_lossy().into_owned());
        Ok(name)
    }
}

impl<T: ProcessIdentity + ?Sized> ProcessIdentity for Box<T> {
    fn executable(&self) -> Result<PathBuf> {
        (**self).executable()
    }

    fn args(&self) -> Result<Vec<OsString>> {
        (**self).args()
    }

    fn os(&self) -> String {
        (**self).os()
    }

    fn temp_dir(&self) -> PathBuf {
        (**self).temp_dir()
    }

    fn program_name(&self) -> Result<String> {
        (**self).program_name()
    }
}

/// The real process, read from `std::env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentProcess;

impl ProcessIdentity for CurrentProcess {
    fn executable(&self) -> Result<PathBuf> {
        let exe = env::current_exe().map_err(|e| Error::PathResolution {
            what: "current executable".to_string(),
            source: Some(e),
        })?;
        fs::canonicalize(&exe).map_err(|e| Error::PathResolution {
            what: format!("symlinks of {}", exe.display()),
            source: Some(e),
        })
    }

    fn args(&self) -> Result<Vec<OsString>> {
        Ok(env::args_os().collect())
    }
}

/// Fixed identity, for managing another binary's entry or for tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    pub executable: PathBuf,
    pub args: Vec<OsString>,
    pub os: String,
    pub temp_dir: PathBuf,
}

impl StaticIdentity {
    /// Identity of `executable` invoked by its own path, on this host.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        Self {
            args: vec![executable.clone().into_os_string()],
            executable,
            os: env::consts::OS.to_string(),
            temp_dir: env::temp_dir(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

impl ProcessIdentity for StaticIdentity {
    fn executable(&self) -> Result<PathBuf> {
        Ok(self.executable.clone())
    }

    fn args(&self) -> Result<Vec<OsString>> {
        Ok(self.args.clone())
    }

    fn os(&self) -> String {
        self.os.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone()
    }
}

/// True for throwaway builds living under the temp directory.
pub fn is_transient(identity: &dyn ProcessIdentity) -> bool {
    let mut temp = identity.temp_dir();
    if temp.as_os_str().is_empty() {
        // an empty TMPDIR means the platform default, not "everything"
        temp = PathBuf::from("/tmp");
    }
    let under_temp = |path: &Path| path.starts_with(&temp);

    if let Some(arg0) = identity.args().ok().and_then(|a| a.into_iter().next()) {
        if under_temp(Path::new(&arg0)) {
            debug!("argv[0] {:?} is under {:?}", arg0, temp);
            return true;
        }
    }
    if let Ok(exe) = identity.executable() {
        if under_temp(&exe) {
            debug!("executable {:?} is under {:?}", exe, temp);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_name_is_basename_of_arg0() {
        let id = StaticIdentity::new("/opt/viewer/bin/viewer")
            .with_args(["./bin/viewer-gtk", "--flag"]);
        assert_eq!(id.program_name().unwrap(), "viewer-gtk");
    }

    #[test]
    fn empty_args_fail_resolution() {
        let id = StaticIdentity::new("/opt/viewer").with_args(Vec::<OsString>::new());
        assert!(matches!(id.program_name(), Err(Error::PathResolution { .. })));
    }

    #[test]
    fn transient_when_binary_under_temp_dir() {
        let id = StaticIdentity::new("/scratch/build-1/viewer").with_temp_dir("/scratch");
        assert!(is_transient(&id));

        let id = StaticIdentity::new("/usr/bin/viewer").with_temp_dir("/scratch");
        assert!(!is_transient(&id));
    }

    #[test]
    fn transient_when_arg0_under_temp_dir() {
        let id = StaticIdentity::new("/usr/bin/viewer")
            .with_args(["/tmp"])
            .with_temp_dir("/tmp");
        assert!(is_transient(&id));
    }

    #[test]
    fn empty_temp_dir_falls_back_to_tmp() {
        let id = StaticIdentity::new("/usr/bin/viewer").with_temp_dir("");
        assert!(!is_transient(&id));

        let id = StaticIdentity::new("/tmp/build/viewer").with_temp_dir("");
        assert!(is_transient(&id));
    }

    #[test]
    fn sibling_prefix_is_not_transient() {
        let id = StaticIdentity::new("/tmpfoo/viewer").with_temp_dir("/tmp");
        assert!(!is_transient(&id));
    }

    #[test]
    fn current_process_resolves_absolute_executable() {
        let exe = CurrentProcess.executable().unwrap();
        assert!(exe.is_absolute());
        assert!(!CurrentProcess.program_name().unwrap().is_empty());
    }
}
