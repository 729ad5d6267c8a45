use std::ffi::OsStr;
use std::os::unix::process::CommandExt;
use std::process::{self, Command, Stdio};

use log::{debug, info, warn};

use crate::error::Result;
use crate::identity::ProcessIdentity;

pub const UPDATE_DESKTOP_DATABASE: &str = "update-desktop-database";
pub const UPDATE_MIME_DATABASE: &str = "update-mime-database";

/// Runs advisory external commands whose outcome never matters to the caller.
pub trait CommandRunner {
    fn run_best_effort(&self, program: &str, args: &[&OsStr]);
}

/// Re-executes the current program after its desktop entry changed.
pub trait Relauncher {
    fn relaunch(&self, identity: &dyn ProcessIdentity) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run_best_effort(&self, program: &str, args: &[&OsStr]) {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => debug!("{} {:?} finished", program, args),
            Ok(status) => debug!("{} {:?} exited with {}", program, args, status),
            Err(e) => warn!("could not run {}: {}", program, e),
        }
    }
}

/// Runs the program again with the same arguments and terminates this
/// process once the child is done.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRelauncher;

impl Relauncher for ProcessRelauncher {
    fn relaunch(&self, identity: &dyn ProcessIdentity) -> Result<()> {
        let executable = identity.executable()?;
        let args = identity.args()?;

        let mut command = Command::new(&executable);
        if let Some((arg0, rest)) = args.split_first() {
            // keep argv[0] so the child reports the same StartupWMClass
            command.arg0(arg0).args(rest);
        }
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!("Relaunching {:?}", executable);
        match command.status() {
            Ok(status) => {
                debug!("relaunched child exited with {}", status);
                process::exit(0);
            }
            Err(e) => {
                warn!(
                    "relaunch of {:?} failed, continuing in current process: {}",
                    executable, e
                );
                Ok(())
            }
        }
    }
}
