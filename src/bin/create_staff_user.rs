//! Provisions a staff account. Staff may delete any job posting.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use jobboard::{
    auth::hash_password,
    config::ConfigLoader,
    db,
    models::Role,
    repositories::{UserRepository, user::NewUser},
};

#[derive(Parser, Debug)]
#[command(name = "create_staff_user", about = "Create a staff account", version)]
struct Cli {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// `candidate` or `employer`
    #[arg(long, default_value = "employer")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let role = cli.role.parse::<Role>().map_err(|e| anyhow!("role: {e}"))?;
    if cli.password.is_empty() {
        return Err(anyhow!("password must not be empty"));
    }

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await.context("running migrations")?;

    let repo = UserRepository::new(&db);
    if repo.username_taken(&cli.username).await? {
        return Err(anyhow!("username {} is already taken", cli.username));
    }
    if repo.email_taken(&cli.email).await? {
        return Err(anyhow!("email {} is already registered", cli.email));
    }

    let password_hash = hash_password(cli.password).await?;
    let user = repo
        .create(NewUser {
            username: cli.username,
            email: cli.email,
            role,
            is_staff: true,
            password_hash,
        })
        .await
        .context("creating staff user")?;

    println!("Created staff user {} ({}, {})", user.username, user.id, user.role);
    Ok(())
}
