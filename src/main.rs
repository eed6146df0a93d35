use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use elecmate_upload_queue::api::{ApiClient, HttpUploader, PhotoUploadOptions};
use elecmate_upload_queue::config::QueueConfig;
use elecmate_upload_queue::queue::{
    ConnectivityMonitor, FileStore, LogNotifier, QueueStore, UploadFile, UploadQueue,
};

#[derive(Parser, Debug)]
#[command(name = "elecmate-queue", about = "Inspect and drain the offline upload queue")]
struct Args {
    /// Queue directory (overrides ELECMATE_QUEUE_DIR)
    #[arg(long, global = true)]
    queue_dir: Option<PathBuf>,

    /// Backend base URL (overrides ELECMATE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a file in the queue for a later upload
    Enqueue {
        path: PathBuf,
        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// Print the number of pending uploads
    Status,
    /// List pending uploads
    List,
    /// Run one drain pass against the backend
    Drain {
        /// Treat the device as offline (the pass becomes a no-op)
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    let mut config = QueueConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(dir) = args.queue_dir {
        config.queue_dir = dir;
    }
    if let Some(url) = args.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    log::debug!("Using queue at {}", config.queue_dir.display());

    let online = !matches!(args.command, Command::Drain { offline: true });

    let api = Arc::new(ApiClient::new(&config.api_base_url));
    if let Some(token) = config.api_token.clone() {
        api.set_access_token(token).await;
    }

    let store: FileStore<PhotoUploadOptions> = FileStore::open(&config.queue_dir)
        .await
        .map_err(|e| e.to_string())?;
    let queue = UploadQueue::new(
        store,
        HttpUploader::new(api),
        ConnectivityMonitor::new(online),
        LogNotifier,
    )
    .with_max_retries(config.max_retries);

    match args.command {
        Command::Enqueue {
            path,
            mime,
            description,
            category,
            tags,
            location,
            project,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            let mime = mime.unwrap_or_else(|| content_type(&path));
            let options = PhotoUploadOptions {
                description,
                category,
                tags,
                location,
                project_reference: project,
                ..Default::default()
            };

            let id = queue
                .enqueue(UploadFile::new(name, mime, bytes), options)
                .await
                .ok_or_else(|| format!("{} was not queued", path.display()))?;
            println!("{}", id);
        }
        Command::Status => {
            let count = queue
                .refresh_count()
                .await
                .ok_or_else(|| "Queue storage unavailable".to_string())?;
            println!("{} pending", count);
        }
        Command::List => {
            let entries = queue.store().get_all().await.map_err(|e| e.to_string())?;
            for entry in entries {
                println!(
                    "{}\t{}\t{} bytes\t{} retries",
                    entry.id,
                    entry.file_name,
                    entry.payload.len(),
                    entry.retry_count
                );
            }
        }
        Command::Drain { .. } => {
            let report = queue.process_queue().await;
            if let Some(reason) = report.skipped {
                println!("skipped: {:?}", reason);
            } else {
                println!(
                    "uploaded {}, retrying {}, abandoned {}{}",
                    report.uploaded,
                    report.retried,
                    report.abandoned,
                    if report.stopped_early { " (stopped early)" } else { "" }
                );
            }
        }
    }

    Ok(())
}

/// MIME type from a file extension, octet-stream when unknown.
fn content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}
