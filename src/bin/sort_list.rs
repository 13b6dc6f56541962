use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use reorg_tools::distribute::{move_from_list, read_restored_list};

const PROGRESS_BAR_CHARS: &str = "=> ";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Sort files from a restored-file list into folders named after each file"
)]
struct Args {
    /// Text file with one absolute file path per line
    #[arg(value_hint = clap::ValueHint::FilePath)]
    list: PathBuf,

    /// Destination root directory, defaults to the current directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    destination: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let destination = reorg_tools::resolve_input_path(args.destination.as_deref())?;

    let entries = read_restored_list(&args.list)?;
    if entries.is_empty() {
        anyhow::bail!("File list contains no usable entries: '{}'", args.list.display());
    }

    let progress_bar = create_progress_bar(entries.len() as u64);
    let callback = |processed: usize, _total: usize| {
        progress_bar.set_position(processed as u64);
    };

    let moved = move_from_list(&entries, &destination, Some(&callback))?;
    progress_bar.finish_and_clear();

    if moved == entries.len() {
        println!("{}", format!("Moved {moved} files").green());
    } else {
        println!(
            "{}",
            format!("Moved {moved} of {} listed files", entries.len()).yellow()
        );
    }
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
