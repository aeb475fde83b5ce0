//! Run orchestration.
//!
//! Scans the source directory, ingests every source concurrently (archive
//! reads overlap, merges apply one completion at a time), waits for resource
//! staging, runs the optional post passes in fixed order (consolidate, sort,
//! fold), and writes the output archive.

use crate::archive;
use crate::merge::{MergeOptions, MergeSession, MergeStatus};
use crate::resources::ResourceStager;
use crate::template::TEMPLATE_CONTENT;
use futures::{stream, StreamExt};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Source documents are selected by filename suffix.
pub const SUFFIX: &str = ".xmind";

/// How many source archives are read concurrently.
const CONCURRENT_LOADS: usize = 4;

/// Options for one merge run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub src_dir: PathBuf,
    pub dst_xmind: PathBuf,
    pub debug: bool,
    pub fold: bool,
    pub src_attr: bool,
    pub deeper: bool,
    pub sort_topics: bool,
}

/// What a finished run did, for reporting and tests.
#[derive(Debug)]
pub struct RunSummary {
    pub sources_found: usize,
    pub sources_merged: usize,
    pub consolidations: Option<usize>,
    pub errors: Vec<String>,
}

/// Execute a full merge run.
///
/// Fatal conditions (unreadable source directory, no sources, bad template,
/// archive write failure) return `Err` after printing a one-line message;
/// per-source problems are recorded in the summary's error log and the run
/// still succeeds.
pub async fn run(opts: RunOptions) -> Result<RunSummary, String> {
    if opts.debug {
        println!("Debug mode activated");
    }

    print!("Scanning source directory '{}' ... ", opts.src_dir.display());
    flush_stdout();
    let src_names = match scan_sources(&opts.src_dir) {
        Ok(names) => names,
        Err(e) => return fatal(e),
    };
    if src_names.is_empty() {
        return fatal(format!("No {} files found", SUFFIX));
    }
    println!("Done (Found {} {} files to merge)", src_names.len(), SUFFIX);

    if opts.debug {
        println!("Source Files:");
        for name in &src_names {
            println!("  {}", name);
        }
    }

    print!("Loading template ... ");
    flush_stdout();
    let merge_options = MergeOptions {
        attribution: opts.src_attr,
        deeper: opts.deeper,
    };
    let mut session = match MergeSession::new(TEMPLATE_CONTENT, merge_options) {
        Ok(session) => session,
        Err(e) => return fatal(e),
    };
    let mut stager = match ResourceStager::new() {
        Ok(stager) => stager,
        Err(e) => return fatal(e),
    };
    println!("Done");

    // Ingest sources with overlapping I/O. Merges into the master apply on
    // this task, one source at a time, in filename order.
    print!("Processing files ");
    flush_stdout();
    {
        let src_dir = &opts.src_dir;
        let mut loads = stream::iter(src_names.iter().cloned())
            .map(|name| async move {
                let path = src_dir.join(&name);
                tokio::task::spawn_blocking(move || archive::load_source(&path, &name))
                    .await
                    .unwrap_or_else(|e| Err(format!("Source read task failed: {}", e)))
            })
            .buffered(CONCURRENT_LOADS);

        while let Some(outcome) = loads.next().await {
            let status = match outcome {
                Err(message) => {
                    session.record_failure(message);
                    MergeStatus::Failure
                }
                Ok(load) => {
                    let status =
                        session.merge_source(&load.content_json, &load.name, load.resources.len());
                    session.errors.extend(load.resource_errors);
                    if status != MergeStatus::Failure {
                        for (res_path, bytes) in load.resources {
                            debug_trace(
                                opts.debug,
                                &format!("staging {} from {}", res_path, load.name),
                            );
                            stager.stage(res_path, bytes);
                        }
                    }
                    status
                }
            };
            print!("{}", status.glyph());
            flush_stdout();
        }
    }

    // Resource writes race with merge completion; wait for all of them
    // before touching the scratch area.
    let staging_errors = stager.wait().await;
    session.errors.extend(staging_errors);

    print!(" Done (");
    if session.errors.is_empty() {
        println!("No errors)");
    } else {
        println!("Errors)");
        println!("\nError Log:");
        for message in &session.errors {
            println!("{}", message);
        }
    }

    if opts.debug {
        if let Ok(json) = session.to_json() {
            println!("\nMerged JSON:");
            println!("{}", json);
        }
    }

    let mut consolidations = None;
    if opts.deeper {
        print!("Consolidating matching top-level topics ... ");
        flush_stdout();
        let logged = session.errors.len();
        let count = session.consolidate();
        println!("Done ({} matches)", count);
        for warning in &session.errors[logged..] {
            eprintln!("{}", warning);
        }
        consolidations = Some(count);
    }

    if opts.sort_topics {
        print!("Sorting topics ... ");
        flush_stdout();
        session.sort_topics();
        println!("Done");
    }

    if opts.fold {
        print!("Folding top-level topics ... ");
        flush_stdout();
        session.fold_top_level();
        println!("Done");
    }

    print!("Writing merged data ... ");
    flush_stdout();
    let content_json = match session.to_json() {
        Ok(json) => json,
        Err(e) => return fatal(e),
    };
    let staged = stager.staged();
    match archive::write_output(&content_json, &staged, &opts.dst_xmind) {
        Ok(resource_errors) => {
            for message in &resource_errors {
                println!("Error: ({})", message);
            }
            session.errors.extend(resource_errors);
        }
        Err(e) => return fatal(e),
    }
    println!("Done");
    println!("\nThe merged XMind file is in {}", opts.dst_xmind.display());

    Ok(RunSummary {
        sources_found: src_names.len(),
        sources_merged: session.sources_merged,
        consolidations,
        errors: session.errors,
    })
}

/// List `.xmind` files in the source directory, alphabetically.
fn scan_sources(dir: &Path) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| e.to_string())?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.ends_with(SUFFIX))
        .collect();
    names.sort();
    Ok(names)
}

fn fatal<T>(message: String) -> Result<T, String> {
    println!("Error ({})", message);
    Err(message)
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn debug_trace(enabled: bool, message: &str) {
    if enabled {
        println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), message);
    }
}
