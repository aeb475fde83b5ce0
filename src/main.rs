//! mindmerge - merge all the XMind files from a source directory into one
//! master workbook.

use clap::Parser;
use mindmerge_lib::run::{run, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mindmerge", version)]
#[command(about = "Merges all the XMind files from a source directory into one master workbook")]
struct Cli {
    /// The source directory with XMind files to merge
    src_dir: PathBuf,

    /// The new XMind file to merge into
    dst_xmind: PathBuf,

    /// Run in debug mode
    #[arg(long)]
    debug: bool,

    /// Fold the merged XMind tree
    #[arg(long)]
    fold: bool,

    /// Add a source file attribution note to each top-level topic in the
    /// merged tree, or to every topic if a deeper merge is performed
    #[arg(long = "src-attr")]
    src_attr: bool,

    /// Perform a deeper merge, consolidating matching top-level topics
    #[arg(long)]
    deeper: bool,

    /// Sort the merged XMind tree by topic instead of by source filename
    #[arg(long = "sort-topics")]
    sort_topics: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Termination performs no cleanup of scratch or partial output.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nReceived quit signal");
            std::process::exit(1);
        }
    });

    let options = RunOptions {
        src_dir: cli.src_dir,
        dst_xmind: cli.dst_xmind,
        debug: cli.debug,
        fold: cli.fold,
        src_attr: cli.src_attr,
        deeper: cli.deeper,
        sort_topics: cli.sort_topics,
    };

    if run(options).await.is_err() {
        std::process::exit(1);
    }
}
