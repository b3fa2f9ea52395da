use dotenv::dotenv;
use log::{error, info};
use memcookie::http::server::Server;
use memcookie::telemetry;

#[tokio::main]
async fn main() {
    let _ = dotenv(); // load .env if present

    let _guard = match telemetry::init_tracing_subscriber() {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to initialize telemetry: {err}");
            std::process::exit(1);
        }
    };

    info!("Starting up memcookie {}", env!("CARGO_PKG_VERSION"));

    let server = match Server::new_from_env().await {
        Ok(server) => server,
        Err(err) => {
            error!("Failed to start: {err}");
            std::process::exit(1);
        }
    };

    server.run().await;
}
