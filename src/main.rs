use std::process::ExitCode;

use chatterbox::config::{ServerConfig, VERSION};
use chatterbox::{init_state, serve};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::from_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.verbosity_level())
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("could not install global tracing subscriber");
    }

    tracing::info!(version = VERSION, "chatterbox starting");

    let state = init_state(&config);
    match serve(config, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal server error");
            ExitCode::FAILURE
        }
    }
}
