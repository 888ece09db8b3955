/// # dashboard-sync CLI
///
/// Command parsing and routing for the dashboard sync jobs. Each subcommand is
/// one job a scheduler (cron, Cloud Scheduler) can trigger on its own.
///
/// All provider, storage and orchestration logic lives in `dashboard-sync-core`;
/// this module builds the clients from settings + environment, injects them and
/// prints the result.
///
/// ## Dry runs
/// With `--dry-run` every document and object goes to in-memory stores, and the
/// documents a job would have written are printed as JSON instead.
///
/// ## Extending
/// Add a variant to [`Commands`] and a routing arm in [`run`]; keep anything
/// beyond wiring inside the core crate.
use crate::load_config::load_config;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use dashboard_sync_core::config::{ProviderConfig, SyncSettings, ENV_MAPPING};
use dashboard_sync_core::contract::{DocumentStore, ObjectStore};
use dashboard_sync_core::discogs::DiscogsClient;
use dashboard_sync_core::firestore::FirestoreClient;
use dashboard_sync_core::flickr::FlickrClient;
use dashboard_sync_core::gcs::GcsClient;
use dashboard_sync_core::github::GithubClient;
use dashboard_sync_core::http::RetryPolicy;
use dashboard_sync_core::media::{fetch_and_upload_file, list_stored_media, ReqwestMediaFetcher};
use dashboard_sync_core::memory::{MemoryDocumentStore, MemoryObjectStore};
use dashboard_sync_core::spotify::SpotifyClient;
use dashboard_sync_core::synchronise::StatsSync;
use dashboard_sync_core::wakatime::WakaTimeClient;
use serde::Serialize;
use std::path::PathBuf;

/// Key under which the latest published lists are stored.
const RECENT: &str = "recent";

/// CLI for dashboard-sync: pull provider stats and publish them for the dashboard.
#[derive(Parser)]
#[clap(
    name = "dashboard-sync",
    version,
    about = "Fetch WakaTime, Spotify, Flickr, GitHub and Discogs data into Firestore and Cloud Storage"
)]
pub struct Cli {
    /// Path to the YAML settings file; built-in defaults when omitted
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use in-memory stores and print what would have been written
    #[clap(long, global = true)]
    pub dry_run: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch stats for every configured range and store one document per range
    SyncStats,
    /// Fetch day-by-day summaries for every configured summary range
    SyncSummaries,
    /// Store the code summary for a single day (yesterday by default)
    SyncYesterday {
        /// Day to summarise, YYYY-MM-DD
        #[clap(long)]
        date: Option<NaiveDate>,
    },
    /// Publish the current Spotify top tracks
    SyncTracks,
    /// Publish the most recent Flickr photos
    SyncPhotos,
    /// Publish the most recent public GitHub repositories
    SyncRepos,
    /// Look up a single Discogs release
    Discogs {
        #[clap(long)]
        release: u64,
    },
    /// Download a media file and store it in the bucket
    UploadMedia {
        #[clap(long)]
        id: String,
        #[clap(long)]
        url: String,
        /// Object name in the bucket
        #[clap(long)]
        destination: String,
    },
    /// List every object in the media bucket
    ListMedia,
    /// Print the last published stats document for a range
    ShowStats {
        #[clap(long)]
        range: String,
    },
    /// Show which credential variables are set (values are never printed)
    Env,
}

enum Documents {
    Firestore(FirestoreClient),
    Memory(MemoryDocumentStore),
}

impl Documents {
    fn connect(
        http: &reqwest::Client,
        config: &ProviderConfig,
        settings: &SyncSettings,
        dry_run: bool,
    ) -> Result<Self> {
        if dry_run {
            tracing::info!("Dry run: documents are kept in memory");
            return Ok(Documents::Memory(MemoryDocumentStore::new()));
        }
        let client = FirestoreClient::from_config(http.clone(), config, settings)
            .context("GCP_PROJECT_ID must be set unless --dry-run is used")?;
        Ok(Documents::Firestore(client))
    }

    fn store(&self) -> &dyn DocumentStore {
        match self {
            Documents::Firestore(client) => client,
            Documents::Memory(memory) => memory,
        }
    }

    fn print_dry_run(&self) -> Result<()> {
        if let Documents::Memory(memory) = self {
            for (collection, id, document) in memory.snapshot() {
                println!(
                    "{collection}/{id} {}",
                    serde_json::to_string_pretty(&document)?
                );
            }
        }
        Ok(())
    }
}

fn object_store(
    http: &reqwest::Client,
    config: &ProviderConfig,
    settings: &SyncSettings,
    dry_run: bool,
) -> Result<Box<dyn ObjectStore>> {
    if dry_run {
        tracing::info!("Dry run: objects are kept in memory");
        return Ok(Box::new(MemoryObjectStore::new()));
    }
    let client = GcsClient::from_config(http.clone(), config, settings)
        .context("CLOUD_STORAGE_BUCKET must be set unless --dry-run is used")?;
    Ok(Box::new(client))
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("dashboard-sync/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_env(config: &ProviderConfig) {
    let missing = config.missing();
    for (path, var) in ENV_MAPPING {
        let state = if missing.contains(&(*path, *var)) {
            "unset"
        } else {
            "set"
        };
        println!("{var:<26} {path:<24} {state}");
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let settings = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            tracing::info!("No --config given, using default settings");
            SyncSettings::default()
        }
    };
    settings.trace_loaded();
    let config = ProviderConfig::from_env();
    let http = http_client()?;
    let retry = RetryPolicy::on_error(&settings.retry);
    let today = Utc::now().date_naive();
    let collections = &settings.collections;

    // Only jobs that write documents need a document store configured.
    let connect = || Documents::connect(&http, &config, &settings, cli.dry_run);
    let wakatime = WakaTimeClient::from_config(http.clone(), &config, &settings);

    match cli.command {
        Commands::Env => {
            print_env(&config);
            Ok(())
        }
        Commands::SyncStats => {
            tracing::info!(command = "sync-stats", "Starting stats sync");
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            print_json(&job.sync_all_stats().await?)?;
            documents.print_dry_run()
        }
        Commands::SyncSummaries => {
            tracing::info!(command = "sync-summaries", "Starting summaries sync");
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            print_json(&job.sync_all_summaries(today).await?)?;
            documents.print_dry_run()
        }
        Commands::SyncYesterday { date } => {
            let today = date.map(|d| d + Duration::days(1)).unwrap_or(today);
            tracing::info!(command = "sync-yesterday", %today, "Starting daily summary sync");
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            print_json(&job.sync_yesterdays_code_summary(today).await?)?;
            documents.print_dry_run()
        }
        Commands::SyncTracks => {
            let spotify = SpotifyClient::from_config(http.clone(), &config, &settings);
            let tracks = spotify
                .fetch_top_tracks(&settings.spotify_time_range, settings.spotify_limit, &retry)
                .await?;
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            let count = job
                .publish_items(&collections.tracks, &settings.spotify_time_range, &tracks)
                .await?;
            println!("Published {count} tracks");
            documents.print_dry_run()
        }
        Commands::SyncPhotos => {
            let flickr = FlickrClient::from_config(http.clone(), &config, &settings);
            let photos = flickr.fetch_photos(settings.flickr_per_page, &retry).await?;
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            let count = job.publish_items(&collections.photos, RECENT, &photos).await?;
            println!("Published {count} photos");
            documents.print_dry_run()
        }
        Commands::SyncRepos => {
            let github = GithubClient::from_config(http.clone(), &config, &settings);
            let repositories = github
                .fetch_repositories(settings.github_repository_count, &retry)
                .await?;
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            let count = job
                .publish_items(&collections.repositories, RECENT, &repositories)
                .await?;
            println!("Published {count} repositories");
            documents.print_dry_run()
        }
        Commands::ShowStats { range } => {
            let documents = connect()?;
            let job = StatsSync::new(&wakatime, documents.store(), &settings);
            match job.read_published_stats(&range).await? {
                Some(document) => print_json(&document),
                None => {
                    println!("No published stats for {range}");
                    Ok(())
                }
            }
        }
        Commands::Discogs { release } => {
            let discogs = DiscogsClient::from_config(http.clone(), &config, &settings);
            match discogs.fetch_release_item(release).await? {
                Some(item) => print_json(&item),
                None => {
                    tracing::warn!(release, "Discogs release not available");
                    println!("Release {release} not found");
                    Ok(())
                }
            }
        }
        Commands::UploadMedia {
            id,
            url,
            destination,
        } => {
            let objects = object_store(&http, &config, &settings, cli.dry_run)?;
            let fetcher = ReqwestMediaFetcher::new(http.clone());
            let result = fetch_and_upload_file(
                &fetcher,
                objects.as_ref(),
                &id,
                Some(url.as_str()),
                &destination,
                Some(settings.media_cache_control.as_str()),
            )
            .await?;
            print_json(&result)
        }
        Commands::ListMedia => {
            let objects = object_store(&http, &config, &settings, cli.dry_run)?;
            for name in list_stored_media(objects.as_ref()).await? {
                println!("{name}");
            }
            Ok(())
        }
    }
}
