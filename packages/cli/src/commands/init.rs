use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use quire_compiler_html::CompileOptions;
use quire_editor::{json, BlockType, Command, Editor, EditorConfig, HeadingLevel, ListType, TextFormat};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Source directory
    #[arg(short, long, default_value = "src")]
    pub src_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Quire project...".bright_blue().bold());

    let src_dir = PathBuf::from(cwd).join(&args.src_dir);
    if !src_dir.exists() {
        fs::create_dir_all(&src_dir)?;
        println!("  {} Created {}/", "✓".green(), args.src_dir);
    }

    let example_file = src_dir.join("welcome.json");
    if !example_file.exists() {
        fs::write(&example_file, welcome_document()?)?;
        println!("  {} Created welcome.json", "✓".green());
    }

    let config = Config {
        src_dir: args.src_dir.clone(),
        out_dir: Some("dist".to_string()),
        html: CompileOptions::default(),
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: quire validate {}", args.src_dir);
    println!("  2. Run: quire compile");
    println!("  3. Check output in dist/");

    Ok(())
}

/// Sample document, built through the same commands an editor host sends
fn welcome_document() -> Result<String> {
    let mut editor = Editor::with_rich_text(EditorConfig::default().with_namespace("init"));
    let commands = [
        Command::InsertText("Welcome to Quire".into()),
        Command::SetBlockType(BlockType::Heading(HeadingLevel::TOP)),
        Command::InsertParagraph,
        Command::InsertText("Documents are plain JSON. ".into()),
        Command::ToggleFormat(TextFormat::BOLD),
        Command::InsertText("Compile them to HTML".into()),
        Command::ToggleFormat(TextFormat::BOLD),
        Command::InsertText(" with quire compile.".into()),
        Command::InsertParagraph,
        Command::InsertText("Headings, quotes and lists".into()),
        Command::InsertList(ListType::Bullet),
        Command::InsertParagraph,
        Command::InsertText("Bold, italic, underline and strikethrough".into()),
    ];
    for command in commands {
        editor.dispatch(command)?;
    }
    Ok(json::to_json_pretty(&editor.state())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor::KeyGenerator;

    #[test]
    fn test_welcome_document_imports() {
        let source = welcome_document().unwrap();
        let mut keys = KeyGenerator::new();
        let state = json::from_json_str(&source, &mut keys).unwrap();

        assert_eq!(
            state.text_content(),
            "Welcome to Quire\n\
             Documents are plain JSON. Compile them to HTML with quire compile.\n\
             Headings, quotes and lists\n\
             Bold, italic, underline and strikethrough"
        );
    }
}
