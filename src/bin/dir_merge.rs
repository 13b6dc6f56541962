use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use reorg_tools::distribute::merge;
use reorg_tools::{list_immediate_directories, list_immediate_files, path_to_filename_string};

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.magenta/blue} {pos}/{len} {percent}%";

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Merge subfolder contents back into the parent directory"
)]
struct Args {
    /// Optional input directory, defaults to the current directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Only print the files that would move without moving anything
    #[arg(short, long)]
    print: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let root = reorg_tools::resolve_input_path(args.path.as_deref())?;

    if args.print {
        for subdir in list_immediate_directories(&root)? {
            let name = path_to_filename_string(&subdir);
            for file in list_immediate_files(&subdir)? {
                println!("{name}/{} -> .", path_to_filename_string(&file));
            }
        }
        return Ok(());
    }

    let mut file_count = 0;
    for subdir in list_immediate_directories(&root)? {
        file_count += list_immediate_files(&subdir)?.len();
    }
    let progress_bar = create_progress_bar(file_count as u64);
    let callback = |processed: usize, _total: usize| {
        progress_bar.set_position(processed as u64);
    };

    let summary = merge(&root, Some(&callback))?;
    progress_bar.finish_and_clear();

    println!("{summary}");
    Ok(())
}

/// Create a progress bar that is hidden during tests.
fn create_progress_bar(len: u64) -> ProgressBar {
    #[cfg(test)]
    {
        let _ = len;
        ProgressBar::hidden()
    }
    #[cfg(not(test))]
    {
        let progress_bar = ProgressBar::new(len);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_BAR_TEMPLATE)
                .expect("Failed to set progress bar template")
                .progress_chars(PROGRESS_BAR_CHARS),
        );
        progress_bar
    }
}
