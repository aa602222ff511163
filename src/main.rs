use std::sync::Arc;

use gymtron::config::{load_config, print_schema};
use gymtron::startup;
use gymtron::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        print_schema();
        return;
    }

    let config = Arc::new(load_config());

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = startup::run(config).await {
        error!("Server exited with error: {}", e);
        std::process::exit(1);
    }
}
