//! `eventos` server and operator CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use eventos::api::rest::{JwtAuth, Role, create_router};
use eventos::bootstrap;
use eventos::config::Settings;
use eventos::domain::value_objects::{TenantId, UserId};
use eventos::telemetry;
use tracing::info;

#[derive(Parser)]
#[command(name = "eventos")]
#[command(about = "Multi-tenant event management backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Print a bearer token signed with the configured secret
    DevToken {
        /// Tenant id; a new one when omitted
        #[arg(long)]
        tenant: Option<TenantId>,
        /// User id; a new one when omitted
        #[arg(long)]
        user: Option<UserId>,
        /// operator, manager or admin
        #[arg(long, default_value = "admin")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(settings).await,
        Commands::DevToken { tenant, user, role } => {
            let tenant = tenant.unwrap_or_else(TenantId::new_v4);
            let user = user.unwrap_or_else(UserId::new_v4);
            let auth = JwtAuth::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs);
            let token = auth.issue(user, tenant, role)?;
            println!("tenant: {tenant}");
            println!("user:   {user}");
            println!("role:   {role}");
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    telemetry::init(&settings.telemetry).context("installing tracing subscriber")?;

    let runtime = bootstrap::start(&settings)
        .await
        .context("starting backends")?;
    let router = create_router(runtime.state.clone(), &settings.server);

    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "eventos listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    runtime.shutdown();
    info!("eventos stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
