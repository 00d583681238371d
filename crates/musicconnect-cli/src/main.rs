use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand};
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod repl;
mod ui;

use musicconnect_core::{load_config, share_text, MusicConnectConfig, Session};

#[derive(Parser)]
#[command(
    name = "musicconnect",
    version,
    about = "Community music activity planner for music students"
)]
struct Cli {
    #[arg(
        long,
        default_value = "~/.musicconnect",
        help = "Config root directory (contains config/, data/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Interactive session: discover ideas, draft and refine proposals")]
    Chat,
    #[command(about = "Validate config files")]
    Validate,
    #[command(subcommand, about = "Saved proposal management")]
    Saved(SavedCommands),
}

#[derive(Subcommand)]
enum SavedCommands {
    #[command(about = "List saved proposals, newest first")]
    List,
    #[command(about = "Show a saved proposal")]
    Show {
        #[arg(help = "Saved proposal ID")]
        id: String,
    },
    #[command(about = "Delete a saved proposal")]
    Delete {
        #[arg(help = "Saved proposal ID")]
        id: String,
        #[arg(long, help = "Skip confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Print the share text of a saved proposal")]
    Share {
        #[arg(help = "Saved proposal ID")]
        id: String,
    },
}

fn expand_home(path: PathBuf) -> PathBuf {
    if !path.starts_with("~") {
        return path;
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(path.strip_prefix("~").unwrap_or(&path)),
        None => path,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.config_root = expand_home(cli.config_root);

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "musicconnect.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    tracing::debug!(config_root = %cli.config_root.display(), "starting musicconnect");

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = load_config(&cli.config_root.join("config"))?;
            println!("{}", describe_config(&config, &cli.config_root));
        }
        Commands::Chat => {
            repl::run_repl(&cli.config_root).await?;
        }
        Commands::Saved(cmd) => {
            run_saved(&cli.config_root, cmd)?;
        }
    }

    Ok(())
}

fn describe_config(config: &MusicConnectConfig, root: &Path) -> String {
    let key_state = if config.provider.api_key().is_some() {
        "set"
    } else {
        "missing (generation disabled)"
    };
    let base_url = config.provider.base_url.as_deref().unwrap_or("default");
    format!(
        "Config valid.\n  model: {} (timeout {}s, max output tokens {})\n  api key: {}\n  base url: {}\n  storage: {} (key {})",
        config.provider.model,
        config.provider.timeout_secs,
        config.provider.max_output_tokens,
        key_state,
        base_url,
        config.storage.data_path(root).display(),
        config.storage.key
    )
}

fn run_saved(root: &Path, cmd: SavedCommands) -> Result<()> {
    let config = load_config(&root.join("config"))?;
    let mut session = Session::open(&config, root);
    let term = Term::stdout();

    match cmd {
        SavedCommands::List => {
            ui::print_block(&term, &ui::format_saved_list(session.store().list()));
        }
        SavedCommands::Show { id } => {
            let saved = session
                .store()
                .get(&id)
                .ok_or_else(|| anyhow!("no saved proposal with id {id}"))?;
            ui::print_block(&term, &ui::format_detail(&saved.detail));
        }
        SavedCommands::Share { id } => {
            let saved = session
                .store()
                .get(&id)
                .ok_or_else(|| anyhow!("no saved proposal with id {id}"))?;
            ui::print_block(&term, &share_text(&saved.detail));
        }
        SavedCommands::Delete { id, yes } => {
            let title = session
                .store()
                .get(&id)
                .map(|saved| saved.title().to_string())
                .ok_or_else(|| anyhow!("no saved proposal with id {id}"))?;
            if !yes
                && !Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("Delete \"{title}\"?"))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }
            session.delete_saved(&id)?;
            ui::print_done(&term, &format!("Deleted \"{title}\"."));
        }
    }
    Ok(())
}
