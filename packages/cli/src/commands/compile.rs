use super::{find_json_files, load_document};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use quire_compiler_html::{compile_to_html, CompileOptions, DEFAULT_TITLE};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Document or directory to compile (defaults to the configured srcDir)
    pub path: Option<String>,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Emit full HTML pages
    #[arg(long)]
    pub standalone: bool,
}

pub fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = match &args.path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    };

    // Paths in the output are relative to this
    let (root, files) = if input.is_file() {
        let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, vec![input.clone()])
    } else if input.is_dir() {
        let files = find_json_files(&input);
        (input.clone(), files)
    } else {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    };

    let mut options = config.html.clone();
    options.standalone |= args.standalone;
    let out_dir = config.get_out_dir(cwd, args.out_dir.as_deref());

    if !args.stdout {
        println!("{}", "🔨 Compiling documents...".bright_blue().bold());
    }
    if files.is_empty() {
        println!("{}", "⚠️  No .json documents found".yellow());
        return Ok(());
    }

    let mut success_count = 0;
    let mut error_count = 0;

    for file in &files {
        let relative_path = file.strip_prefix(&root).unwrap_or(file);
        match compile_file(file, relative_path, &options, &out_dir, args.stdout) {
            Ok(output_path) => {
                success_count += 1;
                if !args.stdout {
                    println!("  {} {} → {}", "✓".green(), relative_path.display(), output_path.display());
                }
            }
            Err(e) => {
                error_count += 1;
                eprintln!("  {} {} - {}", "✗".red(), relative_path.display(), format!("{:#}", e).red());
            }
        }
    }

    if args.stdout {
        return finish(success_count, error_count);
    }

    println!();
    if error_count == 0 {
        println!("{} Compiled {} documents successfully", "✅".green(), success_count);
    } else {
        println!(
            "{} Compiled {} documents, {} errors",
            "⚠️".yellow(),
            success_count,
            error_count
        );
    }
    finish(success_count, error_count)
}

fn finish(success_count: usize, error_count: usize) -> Result<()> {
    if error_count > 0 {
        return Err(anyhow!(
            "{} of {} documents failed to compile",
            error_count,
            success_count + error_count
        ));
    }
    Ok(())
}

fn compile_file(
    file_path: &Path,
    relative_path: &Path,
    options: &CompileOptions,
    out_dir: &Path,
    stdout: bool,
) -> Result<PathBuf> {
    let state = load_document(file_path)?;
    let html = compile_to_html(&state, titled_options(options, file_path));

    if stdout {
        print!("{}", html);
        return Ok(PathBuf::from("stdout"));
    }

    let output_file = out_dir.join(relative_path).with_extension("html");
    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_file, html)?;
    Ok(output_file)
}

/// Untitled pages are named after their document
fn titled_options(options: &CompileOptions, file_path: &Path) -> CompileOptions {
    let mut options = options.clone();
    if options.title.is_empty() {
        options.title = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title_comes_from_file_stem() {
        let options = titled_options(&CompileOptions::default(), Path::new("src/notes/meeting.json"));
        assert_eq!(options.title, "meeting");
    }

    #[test]
    fn test_configured_title_is_kept() {
        let configured = CompileOptions {
            title: "Handbook".to_string(),
            ..CompileOptions::default()
        };
        let options = titled_options(&configured, Path::new("src/intro.json"));
        assert_eq!(options.title, "Handbook");
    }
}
