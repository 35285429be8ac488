use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lsp_types::Position;
use ropey::Rope;
use tracing::{debug, info};

use phel_completion::config::CompletionConfig;
use phel_completion::errors::CompletionError;
use phel_completion::logging::init_logger;
use phel_completion::lsp::features::completion::{Candidate, CompletionEngine, completion_items};
use phel_completion::lsp::features::node_finder::position_to_offset;
use phel_completion::workspace::WorkspaceDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Ranked candidates as JSON
    Json,
    /// LSP `CompletionItem`s as JSON
    Lsp,
    /// One display label per line
    Plain,
}

/// Suggest completions for a cursor in a Phel source file
#[derive(Parser, Debug)]
#[command(name = "phel-complete", author, version, about, long_about = None)]
struct Args {
    /// Source file to complete in (reads stdin when omitted)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Cursor as a byte offset into the source
    #[arg(long, conflicts_with_all = ["line", "character"])]
    offset: Option<usize>,

    /// Cursor line (0-based)
    #[arg(long, requires = "character")]
    line: Option<u32>,

    /// Cursor column in UTF-16 code units (0-based)
    #[arg(long, requires = "line")]
    character: Option<u32>,

    /// Project root scanned for definitions and namespaces
    #[arg(long)]
    project: Option<PathBuf>,

    /// JSON file overriding completion limits
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log level for stderr (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    no_color: bool,

    /// Also write a debug session log to the user cache directory
    #[arg(long)]
    log_file: bool,
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source file {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read source from stdin")?;
            Ok(text)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CompletionConfig> {
    match path {
        Some(path) => CompletionConfig::from_json_file(path)
            .with_context(|| format!("invalid completion config {}", path.display())),
        None => Ok(CompletionConfig::default()),
    }
}

fn build_engine(config: CompletionConfig, project: Option<&Path>) -> Result<CompletionEngine> {
    let engine = CompletionEngine::new(config);
    let Some(root) = project else {
        return Ok(engine);
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("project root {} not found", root.display()))?;
    let workspace = WorkspaceDirectory::new(root).context("invalid project root")?;
    Ok(engine.with_project(Arc::new(workspace)))
}

fn print_plain(candidates: &[Candidate]) {
    for candidate in candidates {
        match &candidate.type_hint {
            Some(hint) => println!("{}\t{}", candidate.display_text, hint),
            None => println!("{}", candidate.display_text),
        }
    }
}

fn run(args: Args) -> Result<()> {
    let source = read_source(args.file.as_deref())?;
    let config = load_config(args.config.as_deref())?;
    let engine = build_engine(config, args.project.as_deref())?;
    let current_file = args.file.as_deref().and_then(|file| file.canonicalize().ok());

    let offset = match (args.line, args.character) {
        (Some(line), Some(character)) => {
            let position = Position { line, character };
            position_to_offset(&Rope::from_str(&source), &position)
                .ok_or(CompletionError::PositionOutOfBounds { line, character })?
        }
        _ => args.offset.unwrap_or(source.len()),
    };
    debug!("Completing at byte offset {} of {}", offset, source.len());
    let candidates = engine
        .complete_source_in(&source, offset, current_file.as_deref())
        .context("completion request failed")?;
    info!("Produced {} candidate(s)", candidates.len());

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
        OutputFormat::Lsp => {
            let items = completion_items(&candidates);
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Plain => print_plain(&candidates),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logger(args.no_color, args.log_level.as_deref(), args.log_file)
        .context("failed to initialize logging")?;
    run(args)
}
