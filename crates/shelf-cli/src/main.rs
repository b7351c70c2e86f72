//! Shelf CLI - Command-line interface for the offline reading shelf
//!
//! Save remote assets into the local cache, inspect it, and replay pending
//! mutations against the remote store.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};
use serde::Serialize;
use shelf_core::cache::SaveOutcome;
use shelf_core::config::ShelfConfig;
use shelf_core::models::{AssetId, AssetRecord, RemoteAsset};
use shelf_core::remote::{
    HttpDocumentStore, HttpPayloadFetcher, ListOptions, PayloadFetcher, RemoteCatalog,
    ShelfApiCatalog, SortBy,
};
use shelf_core::services::ShelfService;
use shelf_core::sync::DrainOutcome;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Cache remote reading material for offline use")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local profile directory
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a remote asset into the local cache
    Save {
        /// Catalog id of the asset
        id: String,
        /// URL serving the asset bytes
        url: String,
        /// Display title (derived from the URL when omitted)
        #[arg(long)]
        title: Option<String>,
        /// Author
        #[arg(long)]
        author: Option<String>,
    },
    /// List cached assets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a cached asset's bytes to a file
    Export {
        /// Catalog id of the asset
        id: String,
        /// Output path
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Remove a cached asset
    Remove {
        /// Catalog id of the asset
        id: String,
    },
    /// Browse the remote catalog
    Browse {
        /// Name prefix to filter by
        #[arg(long, default_value = "")]
        prefix: String,
        /// Number of entries to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
        /// Skip this many entries
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Sort by creation time instead of name
        #[arg(long)]
        by_date: bool,
    },
    /// Replay pending mutations against the remote store
    Sync,
    /// Show cache and queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] shelf_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Asset id cannot be empty")]
    EmptyAssetId,
    #[error("No cached asset for id: {0}")]
    AssetNotFound(String),
    #[error("Remote API is not configured. Set SHELF_API_BASE_URL to enable `shelf {0}`.")]
    RemoteNotConfigured(&'static str),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shelf=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.data_dir)?;

    match cli.command {
        Commands::Save {
            id,
            url,
            title,
            author,
        } => {
            let service = open_service(&config).await?;
            let message = run_save(&service, &id, &url, title, author).await?;
            println!("{message}");
        }
        Commands::List { json } => {
            let service = open_service(&config).await?;
            run_list(&service, json).await?;
        }
        Commands::Export { id, output } => {
            let service = open_service(&config).await?;
            run_export(&service, &id, &output).await?;
        }
        Commands::Remove { id } => {
            let service = open_service(&config).await?;
            let message = run_remove(&service, &id).await?;
            println!("{message}");
        }
        Commands::Browse {
            prefix,
            limit,
            offset,
            by_date,
        } => run_browse(&config, &prefix, limit, offset, by_date).await?,
        Commands::Sync => {
            let service = open_service(&config).await?;
            let message = run_sync(&service, &config).await?;
            println!("{message}");
        }
        Commands::Status { json } => {
            let service = open_service(&config).await?;
            run_status(&service, &config, json).await?;
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}

async fn open_service(config: &ShelfConfig) -> Result<ShelfService<HttpPayloadFetcher>, CliError> {
    tracing::debug!("Opening profile at {}", config.data_dir.display());
    Ok(ShelfService::open(config, HttpPayloadFetcher::new()?).await?)
}

async fn run_save<F: PayloadFetcher>(
    service: &ShelfService<F>,
    id: &str,
    url: &str,
    title: Option<String>,
    author: Option<String>,
) -> Result<String, CliError> {
    let asset = RemoteAsset {
        id: parse_asset_id(id)?,
        display_name: title.unwrap_or_else(|| title_from_url(url)),
        author,
        url: url.to_string(),
    };

    let message = match service.save_asset(&asset).await? {
        SaveOutcome::Saved { tier } => format!("Saved {} ({} tier)", asset.id, tier),
        // Duplicate saves are informational, not errors
        SaveOutcome::AlreadySaved => format!("{} is already on the shelf", asset.id),
        SaveOutcome::Failed { reason } => format!("Save failed: {reason}"),
    };
    Ok(message)
}

#[derive(Debug, Serialize)]
struct AssetListItem {
    id: String,
    title: String,
    author: Option<String>,
    saved_at: i64,
    relative_time: String,
    tier: String,
    size_bytes: i64,
}

async fn run_list<F: PayloadFetcher>(
    service: &ShelfService<F>,
    as_json: bool,
) -> Result<(), CliError> {
    let records = service.list_saved_assets().await?;

    if as_json {
        let items = records
            .iter()
            .map(asset_to_list_item)
            .collect::<Vec<AssetListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_asset_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}

async fn run_export<F: PayloadFetcher>(
    service: &ShelfService<F>,
    id: &str,
    output: &Path,
) -> Result<(), CliError> {
    let asset_id = parse_asset_id(id)?;
    let saved = service
        .load_asset(&asset_id)
        .await?
        .ok_or_else(|| CliError::AssetNotFound(id.to_string()))?;

    std::fs::write(output, &saved.payload)?;
    println!("{}", output.display());
    Ok(())
}

async fn run_remove<F: PayloadFetcher>(
    service: &ShelfService<F>,
    id: &str,
) -> Result<String, CliError> {
    let asset_id = parse_asset_id(id)?;
    service.remove_asset(&asset_id).await?;
    Ok(format!("Removed {asset_id}"))
}

async fn run_browse(
    config: &ShelfConfig,
    prefix: &str,
    limit: usize,
    offset: usize,
    by_date: bool,
) -> Result<(), CliError> {
    let base_url = config
        .api_base_url
        .as_deref()
        .ok_or(CliError::RemoteNotConfigured("browse"))?;
    let catalog = ShelfApiCatalog::new(base_url)?;

    let options = ListOptions {
        limit,
        offset,
        sort_by: if by_date { SortBy::CreatedAt } else { SortBy::Name },
    };
    let entries = catalog.list(prefix, options).await?;

    for entry in entries {
        println!("{:<28}  {:<40}  {}", entry.id, entry.name, entry.size);
    }
    Ok(())
}

async fn run_sync<F: PayloadFetcher>(
    service: &ShelfService<F>,
    config: &ShelfConfig,
) -> Result<String, CliError> {
    let base_url = config
        .api_base_url
        .as_deref()
        .ok_or(CliError::RemoteNotConfigured("sync"))?;
    let remote = HttpDocumentStore::new(base_url)?;

    let message = match service.drain(&remote).await? {
        DrainOutcome::Drained(report) => match report.failure {
            Some(failure) => format!(
                "Replayed {} mutations; stopped on failure: {failure} ({} left)",
                report.replayed, report.remaining
            ),
            None => format!("Replayed {} mutations", report.replayed),
        },
        DrainOutcome::AlreadySyncing => "A sync is already running".to_string(),
    };
    Ok(message)
}

#[derive(Debug, Serialize)]
struct StatusReport {
    cached_assets: usize,
    pending_mutations: usize,
    blob_tier_available: bool,
    sync_state: String,
    api_base_url: Option<String>,
}

async fn run_status<F: PayloadFetcher>(
    service: &ShelfService<F>,
    config: &ShelfConfig,
    as_json: bool,
) -> Result<(), CliError> {
    let report = StatusReport {
        cached_assets: service.list_saved_assets().await?.len(),
        pending_mutations: service.pending_mutations().await?,
        blob_tier_available: service.blob_tier_available(),
        sync_state: service.sync_state().label().to_string(),
        api_base_url: config.api_base_url.clone(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Cached assets:     {}", report.cached_assets);
        println!("Pending mutations: {}", report.pending_mutations);
        println!(
            "Blob tier:         {}",
            if report.blob_tier_available {
                "available"
            } else {
                "unavailable (inline only)"
            }
        );
        println!("Sync state:        {}", report.sync_state);
        println!(
            "Remote API:        {}",
            report.api_base_url.as_deref().unwrap_or("not configured")
        );
    }
    Ok(())
}

fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();

    match shell {
        CompletionShell::Bash => generate_for_shell(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => generate_for_shell(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => generate_for_shell(shells::Fish, &mut command, &mut buffer),
    }

    if let Some(path) = output_path {
        std::fs::write(path, &buffer)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&buffer)?;
    }

    Ok(())
}

fn generate_for_shell<G: Generator>(
    generator: G,
    command: &mut clap::Command,
    buffer: &mut Vec<u8>,
) {
    generate(generator, command, "shelf", buffer);
}

fn parse_asset_id(raw: &str) -> Result<AssetId, CliError> {
    AssetId::new(raw).map_err(|_| CliError::EmptyAssetId)
}

fn asset_to_list_item(record: &AssetRecord) -> AssetListItem {
    let now_ms = Utc::now().timestamp_millis();
    AssetListItem {
        id: record.id.to_string(),
        title: record.display_name.clone(),
        author: record.author.clone(),
        saved_at: record.saved_at,
        relative_time: format_relative_time(record.saved_at, now_ms),
        tier: record.storage_tier.to_string(),
        size_bytes: record.size_bytes,
    }
}

fn format_asset_lines(records: &[AssetRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let author = record.author.as_deref().unwrap_or("-");
            let relative_time = format_relative_time(record.saved_at, now_ms);
            format!(
                "{:<24}  {:<36}  {:<20}  {relative_time}",
                record.id,
                truncate(&record.display_name, 36),
                truncate(author, 20),
            )
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let take_len = max_chars.saturating_sub(3);
    let mut truncated = text.chars().take(take_len).collect::<String>();
    truncated.push_str("...");
    truncated
}

fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

/// Derive a display title from the last path segment of a URL.
fn title_from_url(url: &str) -> String {
    let segment = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    let decoded = segment.replace("%20", " ");
    let stem = decoded.rsplit_once('.').map_or(decoded.as_str(), |(s, _)| s);
    let cleaned = stem
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        url.to_string()
    } else {
        cleaned
    }
}

fn resolve_config(cli_data_dir: Option<PathBuf>) -> Result<ShelfConfig, CliError> {
    let default_dir = cli_data_dir.unwrap_or_else(default_data_dir);
    Ok(ShelfConfig::from_env(default_dir)?)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use pretty_assertions::assert_eq;
    use shelf_core::error::Result as CoreResult;
    use shelf_core::models::StorageTier;
    use tempfile::tempdir;

    use super::{
        format_asset_lines, format_relative_time, run_completions, run_export, run_list,
        run_remove, run_save, run_status, title_from_url, truncate, CliError, CompletionShell,
        PayloadFetcher, ShelfConfig, ShelfService,
    };

    struct StubFetcher;

    impl PayloadFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> CoreResult<Vec<u8>> {
            Ok(b"stub payload".to_vec())
        }
    }

    async fn in_memory_service() -> ShelfService<StubFetcher> {
        ShelfService::open_in_memory(StubFetcher).await.unwrap()
    }

    #[test]
    fn title_from_url_strips_extension_and_separators() {
        assert_eq!(
            title_from_url("https://cdn.example.com/books/the_rust-book.pdf"),
            "the rust book"
        );
        assert_eq!(
            title_from_url("https://cdn.example.com/books/My%20Book.pdf"),
            "My Book"
        );
        assert_eq!(title_from_url("plain"), "plain");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long title", 10), "a rathe...");
    }

    #[test]
    fn format_relative_time_units() {
        let now = 10_000_000;
        assert_eq!(format_relative_time(now - 30_000, now), "just now");
        assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
        assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_reports_saved_then_duplicate() {
        let service = in_memory_service().await;

        let first = run_save(&service, "book-1", "https://cdn/book-1.pdf", None, None)
            .await
            .unwrap();
        assert_eq!(first, "Saved book-1 (INLINE tier)");

        let second = run_save(&service, "book-1", "https://cdn/book-1.pdf", None, None)
            .await
            .unwrap();
        assert_eq!(second, "book-1 is already on the shelf");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_rejects_empty_id() {
        let service = in_memory_service().await;
        let error = run_save(&service, "  ", "https://cdn/x.pdf", None, None)
            .await
            .unwrap_err();
        assert!(matches!(error, CliError::EmptyAssetId));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn export_writes_payload_to_file() {
        let service = in_memory_service().await;
        run_save(
            &service,
            "book-1",
            "https://cdn/book-1.pdf",
            Some("Book".to_string()),
            None,
        )
        .await
        .unwrap();

        let output = std::env::temp_dir().join(format!(
            "shelf-export-test-{}.pdf",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |duration| duration.as_nanos())
        ));
        run_export(&service, "book-1", &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"stub payload");
        let _ = std::fs::remove_file(output);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn export_missing_asset_fails() {
        let service = in_memory_service().await;
        let output = std::env::temp_dir().join("shelf-export-missing.pdf");

        let error = run_export(&service, "ghost", &output).await.unwrap_err();
        assert!(matches!(error, CliError::AssetNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remove_succeeds_for_missing_asset() {
        let service = in_memory_service().await;
        let message = run_remove(&service, "never-saved").await.unwrap();
        assert_eq!(message, "Removed never-saved");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_and_status_run_against_on_disk_profile() {
        let tmp = tempdir().unwrap();
        let config = ShelfConfig::new(tmp.path().join("profile"));
        let service = ShelfService::open(&config, StubFetcher).await.unwrap();

        run_save(&service, "book-1", "https://cdn/book-1.pdf", None, None)
            .await
            .unwrap();

        run_list(&service, false).await.unwrap();
        run_list(&service, true).await.unwrap();
        run_status(&service, &config, false).await.unwrap();
        run_status(&service, &config, true).await.unwrap();

        let records = service.list_saved_assets().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].storage_tier, StorageTier::Inline);
    }

    #[test]
    fn format_asset_lines_includes_title_and_author() {
        let record = shelf_core::models::AssetRecord::new(
            shelf_core::AssetId::new("book-1").unwrap(),
            "A Long Winter Read",
            Some("Somebody".to_string()),
            StorageTier::Inline,
            64,
        )
        .unwrap();

        let lines = format_asset_lines(&[record]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("book-1"));
        assert!(lines[0].contains("A Long Winter Read"));
        assert!(lines[0].contains("Somebody"));
    }

    #[test]
    fn run_completions_writes_bash_script_file() {
        let output_path = std::env::temp_dir().join(format!(
            "shelf-completions-test-{}.bash",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |duration| duration.as_nanos())
        ));

        run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

        let script = std::fs::read_to_string(&output_path).unwrap();
        assert!(script.contains("_shelf()"));
        assert!(script.contains("complete -F _shelf"));

        let _ = std::fs::remove_file(output_path);
    }
}
