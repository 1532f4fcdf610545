use dotenv::dotenv;
use tracing::{error, info, warn};

use quote_builder_backend::app::app::App;
use quote_builder_backend::util::logger::Logger;

#[tokio::main]
async fn main() {
    // Load before the logger so RUST_LOG / LOG_DIR from .env apply.
    let dotenv_result = dotenv();

    let _logger = match Logger::new() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Quote Builder Backend");
    match dotenv_result {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {} (using system env vars)", e),
    }

    let app = match App::new().await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.start().await {
        error!("Server stopped with error: {}", e);
        std::process::exit(1);
    }
}
