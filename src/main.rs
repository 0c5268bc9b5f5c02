use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use time::OffsetDateTime;

use rentals_gateway::config::{ConfigError, GatewayConfig};
use rentals_gateway::guard::{Guard, GuardConfig, GuardState, Navigator, Render, RoleSet};
use rentals_gateway::routes;
use rentals_gateway::session::UserProfile;
use rentals_gateway::session::auth::{AuthError, AuthStore};
use rentals_gateway::session::store::FileSessionStore;
use rentals_gateway::session::verify::HttpTokenVerifier;
use rentals_gateway::state::AppState;

const REDIRECT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("http client build failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid user JSON: {0}")]
    InvalidUser(#[from] serde_json::Error),
    #[error("login failed: {0}")]
    Auth(#[from] AuthError),
}

#[derive(Parser, Debug)]
#[command(name = "rentals-gateway", about = "Rentals API relay and session guard")]
struct Cli {
    /// Session file used by the `session` commands.
    #[arg(long, env = "SESSION_FILE", global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP relay (default).
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Inspect or change the persisted client session.
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Login {
        #[arg(long)]
        token: String,
        /// User profile as JSON, e.g. `{"id":1,"email":"a@b.c","role":"tenant"}`.
        #[arg(long)]
        user: String,
    },
    Logout,
    /// Run the guard once against the stored session.
    Status {
        /// Roles allowed on the page; repeat for several.
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

/// Prints redirects instead of performing them.
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, path: &str) {
        println!("navigate: {path}");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = GatewayConfig::from_env()?;
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Command::Session(command) => run_session(&config, command).await,
    }
}

async fn serve(config: GatewayConfig) -> Result<(), CliError> {
    let state = AppState::from_config(&config)?;
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, upstream = %config.upstream_base_url, "rentals gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_session(config: &GatewayConfig, command: SessionCommand) -> Result<(), CliError> {
    let store = Arc::new(FileSessionStore::new(&config.session_file));
    let now = OffsetDateTime::now_utc();

    match command {
        SessionCommand::Login { token, user } => {
            let user: UserProfile = serde_json::from_str(&user)?;
            let mut auth = AuthStore::hydrate(store, now);
            auth.login(token, user, now)?;
            if let Some(user) = auth.session().user() {
                println!("signed in as {} ({})", user.email, user.role);
            }
        }
        SessionCommand::Logout => {
            let mut auth = AuthStore::hydrate(store, now);
            auth.logout();
            println!("signed out");
        }
        SessionCommand::Status { roles } => {
            let verifier = Arc::new(HttpTokenVerifier::new(&config.auth_api_base_url)?);
            let auth = AuthStore::hydrate(store, now);
            let guard_config =
                GuardConfig::protected(config.guard.clone()).with_roles(roles.into_iter().collect::<RoleSet>());
            let mut guard = Guard::new(guard_config, auth, verifier, Arc::new(StdoutNavigator));

            guard.mount();
            guard.settle().await;
            if *guard.state() == GuardState::Unauthenticated {
                let wait = config.guard.redirect_delay + REDIRECT_GRACE;
                if tokio::time::timeout(wait, guard.step()).await.is_err() {
                    tracing::debug!(?wait, "no redirect within the debounce window");
                }
            }

            println!("state: {}", guard.state());
            if let Render::Screen(screen) = guard.render() {
                println!("{}: {}", screen.title, screen.message);
                if let Some(action) = screen.action {
                    println!("action: {}", action.label());
                }
            }
            guard.unmount();
        }
    }
    Ok(())
}
