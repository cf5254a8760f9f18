use qmc5883::{init_tracing, run_compass, RunMode};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    info!("[qmc5883] starting up...");

    // CONFIG_PATH selects the directory holding compass.toml
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());

    let mode = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<RunMode>() {
            Ok(mode) => mode,
            Err(e) => {
                error!("[qmc5883] {}", e);
                std::process::exit(2);
            }
        },
        None => RunMode::default(),
    };

    if let Err(e) = run_compass(&config_path, mode).await {
        error!("[qmc5883] {}", e);
        std::process::exit(1);
    }
}
