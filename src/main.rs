use log::{error, info, warn};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use photo_curation::config::Config;
use photo_curation::db_pool::create_db_pool;
use photo_curation::unsplash::{ImageSearch, UnsplashClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting Photo curation server on {}", addr);
    info!("Database: {}", config.db_path);
    info!("Image provider: {}", config.unsplash.base_url);

    if !is_port_available(addr) {
        error!(
            "Port {} is already in use. Stop the other process or set PHOTO_CURATION_PORT.",
            config.port
        );
        return Err(format!("Port {} is already in use", config.port).into());
    }

    let db_pool = create_db_pool(&config.db_path, config.max_connections).await?;
    info!("Database initialized successfully");

    if config.unsplash.client_id.is_none() {
        warn!("UNSPLASH_CLIENT_ID is not set, external image search will fail");
    }
    let image_search: Arc<dyn ImageSearch> = Arc::new(UnsplashClient::new(config.unsplash));

    let routes = photo_curation::build_routes(db_pool, image_search);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}
