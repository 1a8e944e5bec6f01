use anyhow::Context;
use clap::Parser;
use label_logic::{resolve, ImageSource, Session};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};
use tracing::info;

mod preview;
mod routes;

use routes::{build_router, AppState};

/// Shows images one after the other in the browser and copies each one into
/// `<output-folder>/<label>` for the label voted for.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Possible labels; keys 1..N vote for them in this order
    #[arg(short, long, num_args = 1.., required = true)]
    labels: Vec<String>,

    /// Copy images to <output-folder>/<label>
    #[arg(short, long, default_value = "sorted")]
    output_folder: PathBuf,

    /// Label exactly these images, in this order
    #[arg(long, num_args = 0..)]
    images: Option<Vec<PathBuf>>,

    /// Find images in this directory
    #[arg(short = 'f', long)]
    input_folder: Option<PathBuf>,

    /// Resume from a data.json written by an earlier run
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Height of the displayed image in pixels
    #[arg(long, default_value_t = 500)]
    max_height: u32,
}

// One session per process; actions are handled one at a time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let source = ImageSource::select(args.images, args.input_folder, args.snapshot)?;
    match &source {
        ImageSource::Explicit(paths) => info!("Using {} images from the command line", paths.len()),
        ImageSource::Directory(dir) => info!("Scanning {:?}", dir),
        ImageSource::Snapshot(path) => info!("Resuming from {:?}", path),
    }

    let resolved = resolve(&source)?;
    let session = Session::new(resolved.store, args.labels, &args.output_folder)?;
    info!(
        labels = ?session.labels(),
        snapshot = %session.snapshot_path().display(),
        "Output: {:?}",
        session.destination()
    );

    let state = Arc::new(AppState::new(session, args.max_height));
    let app = build_router(state.clone());

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {}", addr))?;
    info!("Labeling at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .context("server failed")?;

    let progress = state.lock().progress();
    info!(
        "Closed with {}/{} images labeled",
        progress.labeled, progress.count
    );
    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = state.quit_requested() => info!("Quit requested"),
        _ = ctrl_c => info!("Interrupted"),
    }
}
