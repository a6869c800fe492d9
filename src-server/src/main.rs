use kanban_server_lib::config::ServerConfig;
use kanban_server_lib::ServerError;

#[tokio::main]
async fn main() {
    if let Err(e) = start().await {
        eprintln!("kanban-server: {e}");
        std::process::exit(1);
    }
}

async fn start() -> Result<(), ServerError> {
    let args: Vec<String> = std::env::args().collect();
    let config = ServerConfig::load(&args)?;
    rolling_logger::init_logger(&config.log_dir, "kanban-server")?;
    tracing::info!(db = %config.db_path.display(), blobs = %config.blob_dir.display(), "starting");
    kanban_server_lib::run(config).await
}
