use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use yatube::accounts::{self, CreateUserError, NewUser};
use yatube::config::AppConfig;
use yatube::database::init_db;
use yatube::models::auth::{validate_password, validate_username};
use yatube::seed;
use yatube::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "yatube")]
#[command(about = "Yatube blogging platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a post group
    CreateGroup {
        #[arg(long, value_name = "TITLE")]
        title: String,
        /// URL fragment, e.g. `cats` for /group/cats/
        #[arg(long, value_name = "SLUG")]
        slug: String,
        #[arg(long, value_name = "TEXT", default_value = "")]
        description: String,
    },
    /// Create a user account
    CreateUser {
        #[arg(long, value_name = "USERNAME")]
        username: String,
        #[arg(long, value_name = "PASSWORD", env = "YATUBE_NEW_USER_PASSWORD")]
        password: String,
        #[arg(long, value_name = "EMAIL", default_value = "")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure database indexes")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::CreateGroup {
            title,
            slug,
            description,
        } => {
            let group = seed::create_group(&db, &title, &slug, &description)
                .await
                .context("Failed to create group")?;
            println!("Created group '{}' at /group/{}/", group.title, group.slug);
            Ok(())
        }
        Command::CreateUser {
            username,
            password,
            email,
        } => {
            validate_username(&username).map_err(anyhow::Error::msg)?;
            validate_password(&password).map_err(anyhow::Error::msg)?;

            let new_user = NewUser {
                username: &username,
                password: &password,
                first_name: "",
                last_name: "",
                email: &email,
            };
            match accounts::create_user(&db, new_user).await {
                Ok(user) => {
                    println!("Created user '{}' (id {})", user.username, user.id);
                    Ok(())
                }
                Err(CreateUserError::UsernameTaken) => {
                    anyhow::bail!("Username '{username}' is already taken")
                }
                Err(CreateUserError::Other(e)) => Err(e).context("Failed to create user"),
            }
        }
    }
}

async fn serve(db: sea_orm::DatabaseConnection, config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(db, config)
        .await
        .context("Failed to prepare media storage")?;
    let app = yatube::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
