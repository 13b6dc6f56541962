use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use reorg_tools::distribute::{DistributeOutcome, DistributionPlan, distribute};
use reorg_tools::path_to_filename_string;

const PROGRESS_BAR_CHARS: &str = "=> ";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Distribute files into numbered subfolders round-robin, with rollback on failure"
)]
struct Args {
    /// Number of subfolders to create
    number: usize,

    /// Optional input directory, defaults to the current directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Only print the assignment without moving anything
    #[arg(short, long)]
    print: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let root = reorg_tools::resolve_input_path(args.path.as_deref())?;
    let plan = DistributionPlan::new(&root, args.number)?;

    if args.print {
        for (subfolder, file) in plan.assignments() {
            println!("{} -> {subfolder}/", path_to_filename_string(file));
        }
        return Ok(());
    }

    let progress_bar = create_progress_bar(plan.files.len() as u64);
    let callback = |processed: usize, _total: usize| {
        progress_bar.set_position(processed as u64);
    };

    let outcome = distribute(&plan, Some(&callback))?;
    progress_bar.finish_and_clear();

    println!("{outcome}");
    match outcome {
        DistributeOutcome::Completed { .. } => Ok(()),
        DistributeOutcome::RolledBack { .. } => anyhow::bail!("Distribution failed and was rolled back"),
    }
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
