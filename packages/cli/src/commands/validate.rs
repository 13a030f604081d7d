use super::{find_json_files, load_document};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Documents or directories to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn validate(args: ValidateArgs, _cwd: &str) -> Result<()> {
    println!("{}", "🔍 Validating documents...".bright_blue().bold());

    let mut files = Vec::new();
    for input in &args.files {
        if input.is_dir() {
            files.extend(find_json_files(input));
        } else {
            files.push(input.clone());
        }
    }

    let mut failed = 0;
    for file in &files {
        match load_document(file) {
            Ok(state) => println!(
                "  {} {} ({} nodes, {} blocks)",
                "✓".green(),
                file.display(),
                state.len(),
                state.blocks().len()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), format!("{:#}", e).red());
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(anyhow!("{} of {} documents failed validation", failed, files.len()));
    }
    println!("{} {} documents valid", "✅".green(), files.len());
    Ok(())
}
