use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use homework_bot::alert::{AlertSink, FailureAlertPolicy, StdoutSink, TelegramSink};
use homework_bot::config::{Config, ConfigOverrides, Credentials};
use homework_bot::homework::PracticumClient;
use homework_bot::logging::init_tracing;
use homework_bot::poller::{CursorPolicy, PollState, Poller};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "homework-bot",
    about = "Forwards homework review status changes to Telegram"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long)]
    retry_time: Option<u64>,
    #[arg(long)]
    cursor: Option<CursorPolicy>,
    #[arg(long)]
    failure_alerts: Option<FailureAlertPolicy>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run {
        #[arg(long)]
        from_date: Option<i64>,
        #[arg(long)]
        iterations: Option<u32>,
        #[arg(long)]
        dry_run: bool,
    },
    Check,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables take precedence.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        log_file: cli.log_file.clone(),
        retry_time_secs: cli.retry_time,
        cursor: cli.cursor,
        failure_alerts: cli.failure_alerts,
    });

    let command = cli.command.unwrap_or(Commands::Run {
        from_date: None,
        iterations: None,
        dry_run: false,
    });
    match command {
        Commands::Config { init, show } => {
            handle_config_command(init, show, &config, &config_path)
        }
        Commands::Check => {
            init_logging_and_credentials(&config)?;
            info!("all required environment variables are set");
            println!("ok");
            Ok(())
        }
        Commands::Run {
            from_date,
            iterations,
            dry_run,
        } => {
            let credentials = init_logging_and_credentials(&config)?;
            run_bot(&config, &credentials, from_date, iterations, dry_run).await
        }
    }
}

fn init_logging_and_credentials(config: &Config) -> Result<Credentials> {
    init_tracing(&config.logging.level, &config.resolved_log_path())?;
    match Credentials::from_env() {
        Ok(credentials) => Ok(credentials),
        Err(err) => {
            error!("cannot start: {err}");
            Err(err.into())
        }
    }
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", serde_json::to_string_pretty(config)?);
    }
    Ok(())
}

async fn run_bot(
    config: &Config,
    credentials: &Credentials,
    from_date: Option<i64>,
    iterations: Option<u32>,
    dry_run: bool,
) -> Result<()> {
    let source = PracticumClient::new(
        config.api.endpoint.clone(),
        credentials.practicum_token.clone(),
        config.api.request_timeout(),
    )?;
    let sink: Box<dyn AlertSink> = if dry_run {
        Box::new(StdoutSink)
    } else {
        Box::new(TelegramSink::new(
            &config.telegram.api_url,
            &credentials.telegram_token,
            credentials.telegram_chat_id.clone(),
            config.telegram.request_timeout(),
        )?)
    };

    let cursor = from_date.unwrap_or_else(|| chrono::Utc::now().timestamp());
    info!(
        cursor,
        retry_secs = config.retry_time().as_secs(),
        cursor_policy = %config.poll.cursor,
        failure_alerts = %config.poll.failure_alerts,
        dry_run,
        "bot started"
    );

    let poller = Poller::new(Box::new(source), sink, &config.poll);
    let mut state = PollState::starting_at(cursor);
    poller.run(&mut state, iterations).await;
    info!(cursor = state.cursor, "bot stopped");
    Ok(())
}
