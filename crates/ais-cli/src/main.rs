mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            port,
            token,
            rotate_token,
            database_url,
            installer_image,
            controller_image,
            agent_image,
            mco_image,
            release_image_url,
            service_base_url,
            skip_cert_verification,
            check_cluster_version,
        } => {
            commands::serve(
                bind,
                port,
                token,
                rotate_token,
                database_url,
                installer_image,
                controller_image,
                agent_image,
                mco_image,
                release_image_url,
                service_base_url,
                skip_cert_verification,
                check_cluster_version,
            )
            .await
        }
        Command::Reconcile { manifest, database_url } => commands::reconcile(manifest, database_url).await,
        Command::Status => commands::status(cli.remote, cli.token).await,
        Command::Clusters(command) => commands::clusters(command, cli.remote, cli.token).await,
        Command::Hosts(command) => commands::hosts(command, cli.remote, cli.token).await,
        Command::Events { cluster, limit } => commands::events(cli.remote, cli.token, cluster, limit).await,
    }
}
