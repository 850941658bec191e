use super::{loader_context, print_status, resource_path};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scened_workspace::{DocumentUpdate, FileWatcher, Workspace};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Content root to watch
    pub root: PathBuf,

    /// Document to keep open
    pub document: PathBuf,

    /// Milliseconds to wait for further changes before reloading
    #[arg(long, default_value = "300")]
    pub debounce: u64,
}

pub fn watch(args: WatchArgs) -> Result<()> {
    let config = Config::load(&args.root)?;
    let ctx = loader_context(&args.root, &config)?;
    let path = resource_path(&args.root, &args.document)?;

    let mut workspace = Workspace::with_context(ctx, config.editor());
    let status = workspace.open(&path)?.status();
    println!("👀 {} {}", "Watching".green().bold(), args.root.display());
    print_status(&path, &status, true);

    let watcher = FileWatcher::new(&args.root)?;
    info!(document = %path, "Waiting for changes");
    loop {
        let Some(delta) = watcher.next_delta(Duration::from_secs(1)) else {
            continue;
        };
        // Editors often write a file in several steps
        std::thread::sleep(Duration::from_millis(args.debounce));
        let mut delta = delta;
        for changed in watcher.try_delta().paths() {
            delta.insert(changed);
        }

        for update in workspace.apply_delta(&delta) {
            let label = match &update {
                DocumentUpdate::Reloaded(_) => "Reloaded".blue().bold(),
                DocumentUpdate::Reopened(_) => "Reopened".blue().bold(),
                DocumentUpdate::Conflict(_) => "Conflict".yellow().bold(),
            };
            println!("{} {}", label, update.path());
            if let Some(document) = workspace.document(update.path()) {
                print_status(update.path(), &document.status(), true);
            }
        }
    }
}
