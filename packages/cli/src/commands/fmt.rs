use super::{loader_context, print_load_error, resource_path};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use scened_common::FileSystem;
use scened_editor::LoaderContext;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Document to rewrite in canonical form
    pub file: PathBuf,

    /// Content root the document's references resolve against
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Only report whether the document would change
    #[arg(long)]
    pub check: bool,
}

pub fn fmt(args: FmtArgs) -> Result<()> {
    let config = Config::load(&args.root)?;
    let ctx = loader_context(&args.root, &config)?;
    let path = resource_path(&args.root, &args.file)?;

    let (original, formatted) = match format_document(&ctx, &path) {
        Ok(texts) => texts,
        Err(err) => {
            print_load_error(&ctx, &path, &err);
            return Err(anyhow!("Could not format {}", path));
        }
    };

    if original == formatted {
        println!("{} {} is formatted", "✓".green(), path);
        return Ok(());
    }

    if args.check {
        println!("{} {} would be reformatted", "✗".yellow(), path);
        std::process::exit(1);
    }

    ctx.file_system().write(&path, formatted.as_bytes())?;
    println!("{} Formatted {}", "✓".green(), path);
    Ok(())
}

/// Current and canonical text of a document
pub fn format_document(
    ctx: &LoaderContext,
    path: &str,
) -> Result<(String, String), scened_editor::LoadError> {
    let original = ctx
        .file_system()
        .read_to_string(path)
        .map_err(|source| scened_editor::LoadError::Io {
            path: path.to_string(),
            source,
        })?;
    let node = ctx.load_node(path)?;
    let formatted = ctx.build_node_text(&node);
    node.dispose();
    Ok((original, formatted?))
}
