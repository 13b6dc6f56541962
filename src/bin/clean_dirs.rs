use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use reorg_tools::normalize::normalize;
use reorg_tools::organize::clean_folder_names;
use reorg_tools::{list_immediate_directories, path_to_filename_string};

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Normalize subfolder names, merging folders that end up with the same name"
)]
struct Args {
    /// Optional input directory, defaults to the current directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Only print the planned renames without changing anything
    #[arg(short, long)]
    print: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let parent = reorg_tools::resolve_input_path(args.path.as_deref())?;

    if args.print {
        for subdir in list_immediate_directories(&parent)? {
            let name = path_to_filename_string(&subdir);
            let normalized = normalize(&name);
            if normalized != name {
                println!("{name} -> {normalized}");
            }
        }
        return Ok(());
    }

    let cleaned = clean_folder_names(&parent, None)?;
    println!("{}", format!("Cleaned {cleaned} directories").green());
    Ok(())
}
