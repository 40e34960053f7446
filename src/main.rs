use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use booklab::auth::{TokenGenerator, TokenHolder};
use booklab::config::ServerConfig;
use booklab::server::validation::validate_owner_slug;
use booklab::server::{AppState, create_router};
use booklab::store::{SqliteStore, Store};
use booklab::types::User;

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "booklab")]
#[command(about = "A documentation server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to [default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database [default: ./data]
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path anonymous visitors are redirected to [default: /account/sign_in]
        #[arg(long)]
        sign_in_path: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: PathBuf, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(&config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let issued = generator.issue(&store, TokenHolder::Admin, None)?;

    fs::write(&token_file, &issued.raw)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {}", issued.raw);
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_first_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_first_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a first user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let slug = inquire::Text::new("Username:")
        .with_validator(|input: &str| match validate_owner_slug(input) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(message) => Ok(inquire::validator::Validation::Invalid(message.into())),
        })
        .prompt()?;

    let name = inquire::Text::new("Display name:")
        .with_default(&slug)
        .prompt()?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        slug: slug.clone(),
        name: name.trim().to_string(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let issued = generator.issue(store, TokenHolder::User(&user.id), None)?;

    println!();
    println!("========================================");
    println!("Created user '{slug}' with token:");
    println!();
    println!("  {}", issued.raw);
    println!();
    println!("========================================");
    println!();

    Ok(())
}

fn serve_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    sign_in_path: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(sign_in_path) = sign_in_path {
        config.sign_in_path = sign_in_path;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("booklab=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            sign_in_path,
        } => {
            let config = serve_config(config, host, port, data_dir, sign_in_path)?;

            let token_file = config.admin_token_path();
            if !token_file.exists() {
                bail!(
                    "Server not initialized. Run 'booklab admin init' first to create the database and admin token."
                );
            }

            let store = SqliteStore::new(&config.db_path())?;
            if !store.has_admin_token()? {
                bail!(
                    "Server not initialized. Run 'booklab admin init' first to create the database and admin token."
                );
            }

            info!("Admin token available at {}", token_file.display());

            let state = Arc::new(AppState::new(Arc::new(store), config.sign_in_path.clone()));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
