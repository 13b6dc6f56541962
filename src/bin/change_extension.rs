use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

use reorg_tools::config::ConvertConfig;
use reorg_tools::convert::FileEntry;
use reorg_tools::convert::batch::BatchRunner;
use reorg_tools::convert::pipeline::ConversionPipeline;

const PROGRESS_BAR_CHARS: &str = "=> ";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.cyan/blue} {pos}/{len} {percent}%";

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Change file extensions, converting image formats when needed"
)]
struct Args {
    /// Target extension, for example "jpg"
    extension: Option<String>,

    /// Files to convert, or a single directory meaning all files in it
    #[arg(value_hint = clap::ValueHint::AnyPath, num_args = 0..)]
    files: Vec<PathBuf>,

    /// Delete originals directly instead of using the trash
    #[arg(short, long)]
    delete: bool,

    /// Skip the repair pass for broken images
    #[arg(long)]
    no_repair: bool,

    /// Leave failed files in place instead of quarantining them
    #[arg(long)]
    no_quarantine: bool,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Create shell completion
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(shell) = args.completion {
        return reorg_tools::generate_shell_completion(shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let Some(extension) = args.extension.as_deref() else {
        anyhow::bail!("Target extension is required");
    };

    let mut user_config = ConvertConfig::get_user_config()?;
    if args.delete {
        user_config.use_trash = false;
    }
    if args.no_repair {
        user_config.repair = false;
    }
    if args.verbose {
        println!("{user_config}");
    }

    let files = collect_files(&args.files)?;
    let mut pipeline = ConversionPipeline::from_user_config(&user_config);
    if args.no_quarantine {
        pipeline = pipeline.without_quarantine();
    }

    let progress_bar = create_progress_bar(files.len() as u64);
    let callback = |processed: usize, _total: usize| {
        progress_bar.set_position(processed as u64);
    };

    let result = BatchRunner::new(pipeline).run(files, extension, Some(&callback))?;
    progress_bar.finish_and_clear();

    println!("{result}");
    Ok(())
}

/// Turn the argument list into file snapshots.
///
/// No arguments means every file in the current directory; a single directory
/// argument means every file in that directory.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<FileEntry>> {
    let paths = match paths {
        [] => reorg_tools::list_immediate_files(&reorg_tools::resolve_input_path(None)?)?,
        [single] if single.is_dir() => reorg_tools::list_immediate_files(&reorg_tools::resolve_input_path(Some(single))?)?,
        other => other.to_vec(),
    };
    FileEntry::from_paths(paths)
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
