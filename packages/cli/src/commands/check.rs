use super::{loader_context, print_load_error, print_status};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scened_common::{resource_extension, RealFileSystem};
use scened_editor::{update_status, LoadError, LoaderContext, Severity, Status};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Content root to check
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Show documents without issues and info messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Outcome of loading and validating one document
pub struct Checked {
    pub path: String,
    pub outcome: Result<Status, LoadError>,
}

impl Checked {
    pub fn severity(&self) -> Severity {
        match &self.outcome {
            Ok(status) => status.severity,
            Err(_) => Severity::Error,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a str,
    status: Status,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let config = Config::load(&args.input)?;
    let ctx = loader_context(&args.input, &config)?;
    let results = check_root(&ctx, &args.input, &config)?;

    let errors = results.iter().filter(|c| c.severity() == Severity::Error).count();
    let warnings = results.iter().filter(|c| c.severity() == Severity::Warning).count();

    if args.format == "json" {
        let reports: Vec<Report> = results
            .iter()
            .map(|c| Report {
                path: &c.path,
                status: match &c.outcome {
                    Ok(status) => status.clone(),
                    Err(err) => Status::error(err.to_string()),
                },
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("🔍 {} {}", "Checking".green().bold(), args.input.display());
        println!();
        for checked in &results {
            match &checked.outcome {
                Ok(status) => print_status(&checked.path, status, args.verbose),
                Err(err) => print_load_error(&ctx, &checked.path, err),
            }
        }

        println!();
        println!(
            "✨ {} Check complete!",
            if errors > 0 {
                "Done".red().bold()
            } else {
                "Done".green().bold()
            }
        );
        println!("   Documents checked: {}", results.len());
        if errors > 0 {
            println!("   {} {}", "Errors:".red(), errors);
        }
        if warnings > 0 {
            println!("   {} {}", "Warnings:".yellow(), warnings);
        }
        if errors == 0 && warnings == 0 {
            println!("   {} No issues found!", "✓".green());
        }
    }

    // Exit with error code if there are errors
    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Load and validate every document under `root`
pub fn check_root(ctx: &Rc<LoaderContext>, root: &Path, config: &Config) -> Result<Vec<Checked>> {
    let ignore = config.ignore_patterns()?;
    let mut results = Vec::new();

    for path in find_documents(ctx, root)? {
        if ignore.iter().any(|p| p.matches(path.trim_start_matches('/'))) {
            debug!(path = %path, "Ignored");
            continue;
        }

        let outcome = ctx.load_node(&path).map(|node| {
            let status = update_status(&node, ctx);
            node.dispose();
            status
        });
        results.push(Checked { path, outcome });
    }
    Ok(results)
}

/// Resource paths of every file with a registered extension, sorted
fn find_documents(ctx: &LoaderContext, root: &Path) -> Result<Vec<String>> {
    let root = root.canonicalize()?;
    let content = RealFileSystem::new(&root);
    let mut documents = Vec::new();

    for entry in WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = content.to_resource_path(entry.path()) else {
            continue;
        };
        let known = resource_extension(&path)
            .is_some_and(|ext| ctx.node_type_registry().node_type(ext).is_some());
        if known {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_check_reports_every_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("main")).unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("main/enemy.go"), "").unwrap();
        fs::write(
            dir.path().join("main/level.collection"),
            "instances {\n  id: \"a\"\n  prototype: \"/main/missing.go\"\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("main/broken.go"), "components {\n").unwrap();
        fs::write(dir.path().join("main/notes.txt"), "not a document").unwrap();
        fs::write(dir.path().join("build/copy.go"), "components {\n").unwrap();

        let config = Config {
            ignore: vec!["build/**".into()],
            ..Config::default()
        };
        let ctx = loader_context(dir.path(), &config).unwrap();
        let results = check_root(&ctx, dir.path(), &config).unwrap();

        let paths: Vec<_> = results.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/main/broken.go", "/main/enemy.go", "/main/level.collection"]);

        assert!(matches!(results[0].outcome, Err(LoadError::Parse { .. })));
        assert_eq!(results[1].severity(), Severity::Ok);
        assert_eq!(results[2].severity(), Severity::Error);
    }
}
