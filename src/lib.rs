pub mod api_client;
pub mod board;
pub mod commands;
pub mod config;
pub mod logging;
pub mod models;
pub mod reminder;
pub mod server;
pub mod session;
pub mod storage;
pub mod store;
pub mod views;

#[cfg(feature = "app")]
pub use app::{run, AppError};

#[cfg(feature = "app")]
mod app {
    use clap::Parser;

    use crate::config::{load_or_init_settings, Cli};
    use crate::reminder::start_reminder_job;
    use crate::server::{self, ApiState, TaskRepository};
    use crate::storage::{Storage, StorageError};

    #[derive(Debug, thiserror::Error)]
    pub enum AppError {
        #[error("io error: {0}")]
        Io(#[from] std::io::Error),
        #[error("storage error: {0}")]
        Storage(#[from] StorageError),
    }

    /// Entry point of the `taskboard` binary: parses flags, then serves until Ctrl-C.
    pub fn run() -> Result<(), AppError> {
        let cli = Cli::parse();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(serve_app(cli))
    }

    async fn serve_app(cli: Cli) -> Result<(), AppError> {
        let storage = Storage::new(cli.data_dir());
        storage.ensure_dirs()?;

        #[cfg(not(test))]
        let _logger = match crate::logging::init_logging(storage.root()) {
            Ok(handle) => Some(handle),
            Err(err) => {
                eprintln!("failed to initialize logging: {err}");
                None
            }
        };

        let settings = cli.apply(load_or_init_settings(&storage));
        if settings.api_tokens.is_empty() {
            log::warn!("no api_tokens configured; every request will be rejected");
        }

        let repo = TaskRepository::open(storage);
        let reminders = start_reminder_job(
            repo.clone(),
            settings.reminder_hour,
            settings.reminder_window_hours,
        );

        let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
        let state = ApiState::new(repo, settings.api_tokens);
        server::serve(listener, state, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            log::info!("shutdown requested");
        })
        .await?;

        reminders.abort();
        Ok(())
    }
}
