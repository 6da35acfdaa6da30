use std::process::ExitCode;

use aischool_core::config::{parse_timeout, ClientConfig};
use aischool_core::{ApiClient, Credentials, Navigator, Registration, Screen, Session};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "aischool", about = "Log in to the school API and list child profiles")]
struct Args {
    /// API base URL; overrides AISCHOOL_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Per-request timeout in seconds; overrides AISCHOOL_TIMEOUT_SECS.
    #[arg(long, global = true)]
    timeout: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with an email or username and show the child profiles.
    Login {
        identifier: String,
        #[arg(long, env = "AISCHOOL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a new account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, env = "AISCHOOL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        phone_number: Option<String>,
    },
    /// Check that the API is reachable.
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &args.base_url {
        config = config.with_base_url("--base-url", url)?;
    }
    if let Some(raw) = &args.timeout {
        config.timeout = parse_timeout("--timeout", raw)?;
    }
    info!(base_url = %config.base_url, timeout = ?config.timeout, "client configured");
    let api = ApiClient::from_config(&config).context("failed to build HTTP client")?;

    match args.command {
        Command::Login {
            identifier,
            password,
        } => login(api, Credentials::new(identifier, password)).await,
        Command::Register {
            email,
            full_name,
            password,
            phone_number,
        } => {
            let registered = api
                .register(&Registration {
                    email,
                    password,
                    full_name,
                    phone_number,
                })
                .await
                .context("registration failed")?;
            print!("{}", render::render_user(&registered.user));
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let health = api.health().await.context("health check failed")?;
            print!("{}", render::render_health(&health));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn login(api: ApiClient, credentials: Credentials) -> Result<ExitCode> {
    let session = Session::new(api);
    let mut nav = Navigator::new();

    // Ctrl-C drops the login future, which abandons the in-flight request.
    let outcome = tokio::select! {
        outcome = session.login_with(credentials) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            info!("login cancelled");
            return Ok(ExitCode::from(130));
        }
    };
    nav.apply_outcome(&outcome);

    match nav.current() {
        Screen::Profiles(list) => {
            print!("{}", render::render_profiles(list));
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            let message = nav
                .login_view()
                .error_message
                .clone()
                .unwrap_or_else(|| "Login failed".to_string());
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}
