use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging() {
    // .env first so RUST_LOG and LOG_FORMAT apply
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
    info!(service = "newsdesk", event = "logger_init", "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    init_logging();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "newsdesk",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let config = match configs::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "newsdesk", event = "config_invalid", error = %e, "configuration rejected");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = config.server.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "newsdesk", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "newsdesk",
        event = "start",
        %service_id,
        pid,
        version,
        backend = ?config.storage.backend,
        threads = config.server.worker_threads.unwrap_or_default(),
        "newsdesk starting"
    );

    // Ctrl+C is handled inside server::run through graceful shutdown
    match rt.block_on(server::run(config)) {
        Ok(()) => {
            info!(service = "newsdesk", event = "stop", %service_id, pid, "newsdesk stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "newsdesk", event = "run_failed", %service_id, error = %e, "newsdesk exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
