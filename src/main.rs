mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use desktop_entry::{
    CurrentProcess, DesktopEntry, Invocation, ProcessIdentity, Reconciler, StaticIdentity,
    render_desktop_entry, render_mime_xml,
};
use log::debug;

use crate::config::load_config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with [app] and [mime] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the content that would be written
    Render {
        /// Print the mime package instead of the desktop entry
        #[arg(long)]
        mime: bool,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// Create or update the desktop entry, icon and mime package
    Install {
        #[command(flatten)]
        entry: EntryArgs,
    },
}

#[derive(Args, Debug)]
struct EntryArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "version-tag")]
    version: Option<String>,
    /// PNG icon file
    #[arg(long)]
    icon: Option<PathBuf>,
    #[arg(long)]
    categories: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    apps_path: Option<PathBuf>,
    #[arg(long)]
    icons_path: Option<PathBuf>,
    /// Manage the entry of another binary instead of this one (never relaunches)
    #[arg(long)]
    exec: Option<PathBuf>,
    #[arg(long)]
    no_update: bool,
    #[arg(long)]
    no_rerun: bool,
}

impl EntryArgs {
    fn resolve(
        self,
        config_path: Option<&Path>,
    ) -> Result<(DesktopEntry, Box<dyn ProcessIdentity>)> {
        let mut config = load_config(config_path)?;
        let app = &mut config.app;
        if let Some(name) = self.name {
            app.name = Some(name);
        }
        if let Some(version) = self.version {
            app.version = version;
        }
        if let Some(icon) = self.icon {
            app.icon = Some(icon);
        }
        if let Some(categories) = self.categories {
            app.categories = categories;
        }
        if let Some(comment) = self.comment {
            app.comment = comment;
        }
        if let Some(path) = self.apps_path {
            app.apps_path = Some(path);
        }
        if let Some(path) = self.icons_path {
            app.icons_path = Some(path);
        }
        if self.no_update {
            app.update_if_changed = false;
        }
        if self.no_rerun || self.exec.is_some() {
            app.rerun_if_changed = false;
        }

        let entry = config.into_entry()?;
        let identity: Box<dyn ProcessIdentity> = match self.exec {
            Some(exec) => {
                let exec = std::fs::canonicalize(&exec).unwrap_or(exec);
                Box::new(StaticIdentity::new(exec))
            }
            None => Box::new(CurrentProcess),
        };
        Ok((entry, identity))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Render { mime, entry } => {
            let (entry, identity) = entry.resolve(config_path)?;
            if mime {
                let mime = entry
                    .mime_type
                    .as_ref()
                    .context("no mime type configured ([mime] table)")?;
                println!("{}", render_mime_xml(mime));
            } else {
                let invocation = Invocation::resolve(&*identity)?;
                println!("{}", render_desktop_entry(&entry, &invocation));
            }
        }
        Command::Install { entry } => {
            let (entry, identity) = entry.resolve(config_path)?;
            debug!("Installing {} into {:?}", entry.id(), entry.apps_path);
            let outcome = Reconciler::new()
                .with_identity(identity)
                .create(&entry)
                .context("failed to install desktop entry")?;

            let status = |written: bool| if written { "written" } else { "unchanged" };
            let entry_path = entry.entry_path();
            let icon_path = entry.icon_path();
            println!("entry {}: {}", entry_path.display(), status(outcome.entry_changed));
            println!("icon {}: {}", icon_path.display(), status(outcome.icon_written));
            let mime_path = entry
                .mime_type
                .as_ref()
                .and_then(|m| m.package_path().ok().flatten());
            if let Some(path) = mime_path {
                println!("mime {}: {}", path.display(), status(outcome.mime_written));
            }
        }
    }

    Ok(())
}
