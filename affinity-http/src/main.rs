//! Binary entry point: parses flags, bootstraps an admin grant on a fresh in-memory
//! instance, and serves the group service's HTTP façade.

use std::net::SocketAddr;
use std::sync::Arc;

use affinity_core::Principal;
use affinity_service::{SchemeRegistry, SharedSecretScheme};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Serve the affinity group service over HTTP")]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Principal (`scheme:id`) granted the `service` role at startup.
    #[arg(long, default_value = "admin:root")]
    bootstrap_admin: String,

    /// Name the bootstrap shared-secret scheme is registered under.
    #[arg(long, default_value = "Affinity")]
    scheme_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let service = affinity_service::group_service::in_memory();
    let admin = Principal::parse(&cli.bootstrap_admin).context("parsing --bootstrap-admin")?;
    let service_role = affinity_service::group_service::group_roles()
        .get("service")
        .expect("group_roles always defines 'service'")
        .clone();
    service
        .engine()
        .grant(
            &admin,
            &service_role,
            &affinity_core::Resource::new(
                affinity_service::group_service::SERVICE_URI,
                [
                    affinity_core::Permission::new("add-group"),
                    affinity_core::Permission::new("grant-on-service"),
                    affinity_core::Permission::new("revoke-on-service"),
                ],
            ),
        )
        .context("granting bootstrap admin the service role")?;

    let mut schemes = SchemeRegistry::new();
    schemes
        .register_token_scheme(SharedSecretScheme::new(cli.scheme_name, admin.scheme()))
        .context("registering bootstrap scheme")?;

    let state = affinity_http::AppState::new(Arc::new(service), Arc::new(schemes));
    tracing::info!(listen = %cli.listen, "starting affinity-http");
    warp::serve(affinity_http::routes(state)).run(cli.listen).await;

    Ok(())
}
