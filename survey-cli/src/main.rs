use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use survey_server::config::SQLITE_FILE_NAME;
use survey_server::state_machine::{
    PostgresConfig, PostgresRepository, SessionStore, SqliteRepository, Stage,
};
use survey_server::{open_repository, Locale, StorageConfig};

/// Command typed at the prompt to start the survey over.
const RESTART_COMMAND: &str = "/restart";

/// Satisfaction survey in the terminal
#[derive(Parser, Debug)]
#[command(name = "survey")]
#[command(about = "Satisfaction survey chat in the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take the survey interactively
    Chat(ChatArgs),
    /// Create the feedback table and exit
    InitDb(StorageArgs),
}

#[derive(Parser, Debug)]
struct ChatArgs {
    /// Reply language
    #[arg(long, env = "SURVEY_LOCALE", default_value = "en")]
    locale: Locale,

    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Parser, Debug)]
struct StorageArgs {
    /// Where confirmed feedback is written
    #[arg(long, env = "STORAGE_BACKEND", default_value = "sqlite", value_parser = ["memory", "sqlite", "postgres"])]
    backend: String,

    /// Directory holding the SQLite database
    #[arg(long, env = "STATE_DIR", default_value = ".")]
    state_dir: PathBuf,

    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    db_port: u16,

    #[arg(long, env = "DB_NAME", default_value = "satisfaction")]
    db_name: String,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,
}

impl StorageArgs {
    fn to_storage_config(&self) -> Result<StorageConfig> {
        match self.backend.as_str() {
            "memory" => Ok(StorageConfig::Memory),
            "sqlite" => Ok(StorageConfig::Sqlite {
                path: self.state_dir.join(SQLITE_FILE_NAME),
            }),
            "postgres" => Ok(StorageConfig::Postgres(PostgresConfig {
                host: self.db_host.clone(),
                port: self.db_port,
                dbname: self.db_name.clone(),
                user: self.db_user.clone(),
                password: self.db_password.clone(),
            })),
            other => bail!("unknown storage backend '{}'", other),
        }
    }
}

fn print_prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("Failed to flush stdout")
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let storage = args.storage.to_storage_config()?;
    let repository = open_repository(&storage)
        .await
        .context("Failed to open feedback storage")?;

    let store = SessionStore::new(repository, args.locale);
    let session = store.create().await;
    let id = session.id;

    for message in &session.history {
        println!("{}\n", message.content);
    }
    println!("(type {} to start over, Ctrl-D to quit)\n", RESTART_COMMAND);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt()?;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            print_prompt()?;
            continue;
        }

        let outcome = if line.trim() == RESTART_COMMAND {
            store.restart(&id).await?
        } else {
            store.process_input(&id, line).await?
        };

        println!();
        for reply in &outcome.replies {
            println!("{}\n", reply);
        }

        if outcome.stage == Stage::Done {
            break;
        }
        print_prompt()?;
    }

    store.remove(&id).await;
    Ok(())
}

async fn run_init_db(args: StorageArgs) -> Result<()> {
    match args.to_storage_config()? {
        StorageConfig::Memory => bail!("the memory backend has no schema to create"),
        StorageConfig::Sqlite { path } => {
            SqliteRepository::new(&path)
                .with_context(|| format!("Failed to initialise {}", path.display()))?;
            info!("SQLite database ready at {}", path.display());
        }
        StorageConfig::Postgres(pg) => {
            let target = pg.display_target();
            PostgresRepository::new(pg)
                .ensure_schema()
                .await
                .with_context(|| format!("Failed to initialise {}", target))?;
        }
    }
    println!("Feedback table ready.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat(args) => run_chat(args).await,
        Commands::InitDb(args) => run_init_db(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_defaults_to_sqlite_in_current_dir() {
        let cli = Cli::try_parse_from(["survey", "chat", "--backend", "sqlite", "--state-dir", "."])
            .unwrap();
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(
            args.storage.to_storage_config().unwrap(),
            StorageConfig::Sqlite {
                path: PathBuf::from(".").join("survey.db")
            }
        );
    }

    #[test]
    fn test_chat_postgres_flags() {
        let cli = Cli::try_parse_from([
            "survey",
            "chat",
            "--locale",
            "pt-BR",
            "--backend",
            "postgres",
            "--db-host",
            "db",
            "--db-port",
            "6543",
            "--db-name",
            "nps",
            "--db-user",
            "survey",
            "--db-password",
            "secret",
        ])
        .unwrap();
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.locale, Locale::Portuguese);
        let StorageConfig::Postgres(pg) = args.storage.to_storage_config().unwrap() else {
            panic!("expected postgres");
        };
        assert_eq!(pg.display_target(), "survey@db:6543/nps");
        assert_eq!(pg.password, "secret");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["survey", "init-db", "--backend", "mysql"]).is_err());
    }
}
