//! The `serve` command.

use std::sync::Arc;

use clap::Args;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api;
use crate::app::App;
use crate::cli::Result;
use crate::ingest::spawn_scheduler;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (defaults to server.host).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (defaults to server.port).
    #[arg(long)]
    pub port: Option<u16>,

    /// Don't run the periodic refresh.
    #[arg(long = "no-scheduler")]
    pub no_scheduler: bool,
}

impl ServeArgs {
    pub async fn run(self, app: App) -> Result<()> {
        let addr = app.config().bind_address(self.host.as_deref(), self.port);
        let run_scheduler = app.config().config().scheduler.enabled && !self.no_scheduler;
        let interval = app.config().refresh_interval();

        let listener = TcpListener::bind(&addr).await?;
        let app = Arc::new(app);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = if run_scheduler {
            Some(spawn_scheduler(app.ingestor().clone(), interval, shutdown_rx))
        } else {
            info!("scheduler disabled");
            None
        };

        api::serve(app, listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await?;

        let _ = shutdown_tx.send(true);
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduler task failed");
            }
        }
        Ok(())
    }
}
