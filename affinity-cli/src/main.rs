//! Terminal front end for the group service: each invocation bootstraps a fresh
//! in-memory instance (the shipped adapter is non-durable, so state does not persist
//! across invocations), grants the bootstrap principal the `service` role, then runs the
//! requested operation and prints its outcome. The `serve` subcommand instead hands the
//! instance to the HTTP façade for the life of the process.

use std::net::SocketAddr;

use affinity_core::{Engine, Principal, Resource};
use affinity_service::group_service::{self, GroupService};
use affinity_service::{SchemeRegistry, SharedSecretScheme};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Operate a standalone affinity group service instance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Bootstrap {
    /// Principal (`scheme:id`) granted the `service` role when the instance starts.
    #[arg(long, default_value = "admin:root")]
    bootstrap_admin: String,

    /// Principal to act as when running the requested operation. Defaults to the
    /// bootstrap admin.
    #[arg(long)]
    as_user: Option<String>,
}

impl Bootstrap {
    fn build(&self) -> anyhow::Result<(GroupService, Principal)> {
        let service = group_service::in_memory();
        let admin = Principal::parse(&self.bootstrap_admin).context("parsing --bootstrap-admin")?;
        let role = group_service::group_roles()
            .get("service")
            .expect("group_roles always defines 'service'")
            .clone();
        service
            .engine()
            .grant(&admin, &role, &service_resource())
            .context("granting bootstrap admin the service role")?;

        let as_user = match &self.as_user {
            Some(s) => Principal::parse(s).context("parsing --as-user")?,
            None => admin,
        };
        Ok((service, as_user))
    }
}

fn service_resource() -> Resource {
    Resource::new(
        group_service::SERVICE_URI,
        [
            affinity_core::Permission::new("add-group"),
            affinity_core::Permission::new("grant-on-service"),
            affinity_core::Permission::new("revoke-on-service"),
        ],
    )
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a group and grant its owner role to the acting principal.
    AddGroup {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
    },
    /// Remove a group, its membership facts and its grants.
    RemoveGroup {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
    },
    /// Add a principal to a group.
    AddMember {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
        member: String,
    },
    /// Remove a principal from a group.
    RemoveMember {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
        member: String,
    },
    /// Report whether a principal is a (transitive) member of a group.
    CheckMember {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
        member: String,
    },
    /// Print a group's URI and immediate members.
    Describe {
        #[command(flatten)]
        bootstrap: Bootstrap,
        group: String,
    },
    /// Run `has_grant`/`can` against the raw RBAC engine, for ad hoc debugging outside
    /// the group service's own resource model.
    Can {
        #[command(flatten)]
        bootstrap: Bootstrap,
        principal: String,
        permission: String,
        resource: String,
    },
    /// Serve the group service over HTTP for the life of this process.
    Serve {
        #[command(flatten)]
        bootstrap: Bootstrap,

        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        #[arg(long, default_value = "Affinity")]
        scheme_name: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::AddGroup { bootstrap, group } => {
            let (service, as_user) = bootstrap.build()?;
            service.add_group(&as_user, &group)?;
            println!("created {group}, granted owner to {as_user}");
        }
        Command::RemoveGroup { bootstrap, group } => {
            let (service, as_user) = bootstrap.build()?;
            service.remove_group(&as_user, &group)?;
            println!("removed {group}");
        }
        Command::AddMember { bootstrap, group, member } => {
            let (service, as_user) = bootstrap.build()?;
            let member = Principal::parse(&member).context("parsing member")?;
            service.add_member(&as_user, &group, &member)?;
            println!("added {member} to {group}");
        }
        Command::RemoveMember { bootstrap, group, member } => {
            let (service, as_user) = bootstrap.build()?;
            let member = Principal::parse(&member).context("parsing member")?;
            service.remove_member(&as_user, &group, &member)?;
            println!("removed {member} from {group}");
        }
        Command::CheckMember { bootstrap, group, member } => {
            let (service, as_user) = bootstrap.build()?;
            let member = Principal::parse(&member).context("parsing member")?;
            let is_member = service.check_member(&as_user, &group, &member)?;
            println!("{is_member}");
        }
        Command::Describe { bootstrap, group } => {
            let (service, as_user) = bootstrap.build()?;
            let descriptor = service.describe_group(&as_user, &group)?;
            println!("{}: {:?}", descriptor.uri, descriptor.members);
        }
        Command::Can {
            bootstrap,
            principal,
            permission,
            resource,
        } => {
            let (service, _) = bootstrap.build()?;
            let principal = Principal::parse(&principal).context("parsing principal")?;
            let permission = affinity_core::Permission::new(permission);
            // No capability declaration is known for an arbitrary ad hoc resource, so grant
            // the permission itself; `can` requires it be declared to ever return true.
            let resource = Resource::new(resource, [permission.clone()]);
            let engine: &Engine = service.engine();
            println!("{}", engine.can(&principal, &permission, &resource)?);
        }
        Command::Serve {
            bootstrap,
            listen,
            scheme_name,
        } => {
            let (service, admin) = bootstrap.build()?;
            let mut schemes = SchemeRegistry::new();
            schemes
                .register_token_scheme(SharedSecretScheme::new(scheme_name, admin.scheme()))
                .context("registering bootstrap scheme")?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(async move {
                let state = affinity_http::AppState::new(std::sync::Arc::new(service), std::sync::Arc::new(schemes));
                tracing::info!(%listen, "starting affinity-cli serve");
                warp::serve(affinity_http::routes(state)).run(listen).await;
            });
        }
    }

    Ok(())
}
