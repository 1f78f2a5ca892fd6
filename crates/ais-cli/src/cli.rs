use std::path::PathBuf;

use ais_domain::{ClusterId, HostId};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ais",
    about = "Assisted bare-metal OpenShift installation service",
    version
)]
pub struct Cli {
    /// Talk to a remote ais server instead of running in-process.
    #[arg(long, env = "AIS_URL", global = true, default_value = "http://localhost:8090")]
    pub remote: String,

    /// Bearer token for the remote server.
    #[arg(long, env = "AIS_TOKEN", global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the installation service: HTTP API plus host/cluster monitor loops.
    Serve {
        #[arg(long, env = "BIND", default_value = "0.0.0.0")]
        bind: String,

        #[arg(long, env = "PORT", default_value_t = 8090)]
        port: u16,

        /// Bearer token required of API callers. Generated and persisted to
        /// ~/.ais/token on first run if not given.
        #[arg(long, env = "AIS_TOKEN")]
        token: Option<String>,

        /// Replace any persisted token with a freshly generated one.
        #[arg(long)]
        rotate_token: bool,

        /// Postgres connection string. Falls back to an in-memory store
        /// (data lost on exit) when omitted.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        #[arg(long, env = "INSTALLER_IMAGE", default_value = "quay.io/edge-infrastructure/assisted-installer:latest")]
        installer_image: String,

        #[arg(long, env = "CONTROLLER_IMAGE", default_value = "quay.io/edge-infrastructure/assisted-installer-controller:latest")]
        controller_image: String,

        #[arg(long, env = "AGENT_IMAGE", default_value = "quay.io/edge-infrastructure/assisted-installer-agent:latest")]
        agent_image: String,

        #[arg(long, env = "MCO_IMAGE", default_value = "quay.io/edge-infrastructure/assisted-installer-mco:latest")]
        mco_image: String,

        #[arg(long, env = "RELEASE_IMAGE_URL", default_value = "")]
        release_image_url: String,

        #[arg(long, env = "SERVICE_BASE_URL", default_value = "http://localhost:8090")]
        service_base_url: String,

        #[arg(long, env = "SKIP_CERT_VERIFICATION")]
        skip_cert_verification: bool,

        #[arg(long, env = "CHECK_CLUSTER_VERSION")]
        check_cluster_version: bool,
    },

    /// Run one reconciliation sweep against a declarative manifest file
    /// (a JSON array of desired cluster records) and print what changed.
    Reconcile {
        /// Path to a JSON manifest of desired clusters.
        manifest: PathBuf,

        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Print cluster counts by status.
    Status,

    #[command(subcommand)]
    Clusters(ClustersCommand),

    #[command(subcommand)]
    Hosts(HostsCommand),

    /// List recorded events, optionally filtered to one cluster.
    Events {
        #[arg(long)]
        cluster: Option<ClusterId>,

        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum ClustersCommand {
    /// List all clusters.
    List,

    /// Show one cluster.
    Get { id: ClusterId },

    /// Create a cluster from a JSON body (name/base_dns_domain/openshift_version/ha_mode).
    Create {
        #[arg(long)]
        file: PathBuf,
    },

    /// Start installation once validations pass.
    Install { id: ClusterId },

    /// Cancel an in-flight or completed installation.
    Cancel { id: ClusterId },

    /// Toggle hold-installation.
    Hold {
        id: ClusterId,
        #[arg(long)]
        off: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum HostsCommand {
    /// Bind a host to a cluster.
    Bind { cluster: ClusterId, host: HostId },

    /// Unbind a host from its cluster.
    Unbind { cluster: ClusterId, host: HostId },
}
