pub mod check;
pub mod fmt;
pub mod watch;

pub use check::{check, CheckArgs};
pub use fmt::{fmt, FmtArgs};
pub use watch::{watch, WatchArgs};

use crate::config::Config;
use anyhow::{anyhow, Result};
use colored::Colorize;
use scened_common::{FileSystem, RealFileSystem};
use scened_editor::{registry, LoadError, LoaderContext, NodeTypeRegistry, Severity, Status};
use scened_parser::format_error;
use std::path::Path;
use std::rc::Rc;
use tracing::warn;

/// Loader context over a content root, with the config's templates applied
pub fn loader_context(root: &Path, config: &Config) -> Result<Rc<LoaderContext>> {
    if !root.is_dir() {
        return Err(anyhow!("Content root does not exist: {}", root.display()));
    }

    let mut types = NodeTypeRegistry::with_defaults();
    for (extension, template) in &config.templates {
        if !types.set_template(extension, template.clone()) {
            warn!(extension = %extension, "Template for an unknown node type");
        }
    }
    let fs = Rc::new(RealFileSystem::new(root));
    Ok(Rc::new(LoaderContext::with_registries(fs, types, registry()?)))
}

/// Resource path of a file given on the command line
pub fn resource_path(root: &Path, file: &Path) -> Result<String> {
    let root = root.canonicalize()?;
    let file = file
        .canonicalize()
        .map_err(|e| anyhow!("{}: {}", file.display(), e))?;
    RealFileSystem::new(root)
        .to_resource_path(&file)
        .ok_or_else(|| anyhow!("{} is outside the content root", file.display()))
}

/// Leaf statuses of a (multi-)status
pub fn leaves(status: &Status) -> Vec<&Status> {
    if status.children.is_empty() {
        if status.is_ok() {
            Vec::new()
        } else {
            vec![status]
        }
    } else {
        status.children.iter().flat_map(leaves).collect()
    }
}

pub fn print_status(path: &str, status: &Status, verbose: bool) {
    if status.is_ok() {
        if verbose {
            println!("{} {}", "✓".green(), path);
        }
        return;
    }

    println!("{}", path);
    for leaf in leaves(status) {
        let level = match leaf.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info | Severity::Ok => "info".blue().bold(),
        };
        if !verbose && leaf.severity == Severity::Info {
            continue;
        }
        match &leaf.property {
            Some(property) => println!("  {} [{}] {}", level, property, leaf.message),
            None => println!("  {} {}", level, leaf.message),
        }
    }
}

/// Print a load failure, rendering parse errors against their source
pub fn print_load_error(ctx: &LoaderContext, path: &str, err: &LoadError) {
    match err {
        LoadError::Parse { path: file, source } => {
            let text = ctx.file_system().read_to_string(file).unwrap_or_default();
            eprintln!("{} {}", "✗".red(), path);
            eprintln!("{}", format_error(&text, file, source));
        }
        other => eprintln!("{} {}: {}", "✗".red(), path, other),
    }
}
