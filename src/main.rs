use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use atomfeed::config::Config;
use atomfeed::feed::{self, Feed, SeenKeys};
use atomfeed::storage::SeenStore;
use atomfeed::util::{single_line, strip_control_chars, truncate_to_width};

/// Get the config directory path (~/.config/atomfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("atomfeed"))
}

#[derive(Parser, Debug)]
#[command(
    name = "atomfeed",
    about = "Parse an Atom feed, printing only entries not seen on earlier runs"
)]
struct Args {
    /// Atom document to read ("-" for stdin)
    #[arg(value_name = "FILE")]
    document: PathBuf,

    /// Identifier the seen set is stored under (defaults to the file path)
    #[arg(long, value_name = "ID")]
    source: Option<String>,

    /// Do not load or save the seen set
    #[arg(long)]
    no_persist: bool,

    /// Print the feed as JSON
    #[arg(long)]
    json: bool,

    /// Config file (defaults to ~/.config/atomfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let document = read_document(&args.document, config.max_document_bytes)?;
    let source = match &args.source {
        Some(source) => source.clone(),
        None => source_for(&args.document),
    };

    let store = SeenStore::new(config.seen_dir_or(&config_dir));
    let mut seen = if args.no_persist {
        SeenKeys::new()
    } else {
        store
            .load(&source)
            .with_context(|| format!("Failed to load seen set for '{}'", source))?
    };

    let parsed = feed::parse(&document, &mut seen)
        .with_context(|| format!("Failed to parse '{}'", args.document.display()))?;

    if !args.no_persist {
        store
            .save(&source, &seen)
            .with_context(|| format!("Failed to save seen set for '{}'", source))?;
    }

    tracing::info!(source = %source, unread = parsed.unread, "Parsed feed");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &parsed).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        print_listing(&mut out, &parsed, config.title_width)?;
    }

    Ok(())
}

/// Reads the document, refusing anything over `max_bytes`.
fn read_document(path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let reader: Box<dyn Read> = if path == Path::new("-") {
        Box::new(std::io::stdin())
    } else {
        Box::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open '{}'", path.display()))?,
        )
    };

    let mut bytes = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;

    if bytes.len() as u64 > max_bytes {
        anyhow::bail!(
            "Document '{}' exceeds the {} byte limit",
            path.display(),
            max_bytes
        );
    }
    Ok(bytes)
}

/// Default seen-set key: the canonical path, so relative and absolute
/// invocations share state.
fn source_for(path: &Path) -> String {
    if path == Path::new("-") {
        return "stdin".to_string();
    }
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn print_listing(out: &mut impl Write, feed: &Feed, title_width: usize) -> Result<()> {
    let title = strip_control_chars(&feed.title);
    writeln!(out, "{}", single_line(&title))?;
    if !feed.link.is_empty() {
        writeln!(out, "{}", strip_control_chars(&feed.link))?;
    }
    writeln!(
        out,
        "{} new item(s), refresh after {}",
        feed.unread,
        feed.refresh.to_rfc3339()
    )?;

    for item in &feed.items {
        let title = strip_control_chars(&item.title);
        let title = single_line(&title);
        let date = item
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        writeln!(out, "  {}  {}", date, truncate_to_width(&title, title_width))?;
        if !item.link.is_empty() {
            writeln!(out, "              {}", strip_control_chars(&item.link))?;
        }
    }
    Ok(())
}
