use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use classhall_server::auth::token::create_session_token;
use classhall_server::config::ServerConfig;
use classhall_server::db::pool::{create_pool, run_migrations};
use classhall_server::db::queries::users;
use classhall_server::engine::community_engine::CommunityEngine;
use classhall_server::web::app_state::AppState;
use classhall_server::web::rate_limit::{ApiRateLimiters, spawn_cleanup};
use classhall_server::web::router::build_router;

#[derive(Parser)]
#[command(name = "classhall-server", version, about = "Community servers with join codes and roles")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "classhall.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Record a user profile and print a session token for it.
    IssueToken {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config).map_err(anyhow::Error::msg)?;

    let pool = create_pool(&config.database.url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let auth_config = config.to_auth_config();

    match cli.command.unwrap_or(Command::Serve) {
        Command::IssueToken {
            user_id,
            username,
            email,
        } => {
            users::upsert_user(&pool, &user_id, &username, email.as_deref())
                .await
                .context("failed to store user")?;
            let token = create_session_token(
                &user_id,
                &auth_config.jwt_secret,
                auth_config.session_expiry_hours,
            )
            .context("failed to sign session token")?;
            println!("{token}");
            Ok(())
        }
        Command::Serve => {
            let engine = CommunityEngine::new(pool, config.communities.join_code_length);
            let app_state = Arc::new(AppState {
                engine,
                auth_config,
                max_body_bytes: config.server.max_body_kb * 1024,
                rate_limiters: Arc::new(ApiRateLimiters::default()),
            });
            spawn_cleanup(app_state.rate_limiters.clone());
            let app = build_router(app_state);

            let web_addr = &config.server.web_address;
            info!("Classhall server starting on {}", web_addr);

            let listener = tokio::net::TcpListener::bind(web_addr)
                .await
                .with_context(|| format!("failed to bind {web_addr}"))?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .context("server error")?;
            Ok(())
        }
    }
}
