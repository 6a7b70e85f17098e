use std::{sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    sqlx::sqlite::SqlitePoolOptions,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    ticketry_articles::store_sqlite::SqliteStore as ArticleSqliteStore,
    ticketry_channels::{
        ChannelDriver, ChannelStore, DriverRegistry,
        store_sqlite::SqliteStore as ChannelSqliteStore,
    },
    ticketry_config::TicketryConfig,
    ticketry_dispatch::{Dispatcher, deliver_fn},
    ticketry_scheduler::{
        RetryPolicy, SchedulerService, store_sqlite::SqliteStore as JobSqliteStore,
    },
    ticketry_twitter::{HttpTwitterApi, TwitterDriver},
};

#[derive(Parser)]
#[command(name = "ticketry", about = "Ticketry — helpdesk ticket article dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/ticketry/).
    #[arg(long, global = true, env = "TICKETRY_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,

    /// SQLite database URL (overrides config value).
    #[arg(long, global = true, env = "TICKETRY_DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the delivery scheduler (default when no subcommand is provided).
    Serve,
    /// Delivery job management.
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },
    /// Channel management.
    Channels {
        #[command(subcommand)]
        action: ChannelAction,
    },
}

#[derive(Subcommand)]
enum JobsAction {
    /// Execute every due job and wait for completion.
    RunPending,
    /// List queued jobs.
    List,
}

#[derive(Subcommand)]
enum ChannelAction {
    /// List configured channels with health status.
    List,
}

fn init_tracing(cli: &Cli, config: &TicketryConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cli.log_level == "info" {
            config.log.level.as_str()
        } else {
            cli.log_level.as_str()
        };
        EnvFilter::new(level)
    });

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Everything the subcommands need, wired once.
struct App {
    channels: Arc<ChannelSqliteStore>,
    scheduler: Arc<SchedulerService>,
}

async fn build_app(cli: &Cli, config: &TicketryConfig) -> anyhow::Result<App> {
    let database_url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| config.database.url.clone());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    ticketry_articles::run_migrations(&pool).await?;
    ticketry_channels::run_migrations(&pool).await?;
    ticketry_scheduler::run_migrations(&pool).await?;

    let articles = Arc::new(ArticleSqliteStore::with_pool(pool.clone()));
    let channels = Arc::new(ChannelSqliteStore::with_pool(pool.clone()));
    let jobs = Arc::new(JobSqliteStore::with_pool(pool));

    let twitter_api = HttpTwitterApi::new(
        config.twitter.api_base.clone(),
        Duration::from_secs(config.twitter.timeout_secs),
    )?;
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(TwitterDriver::new(Arc::new(twitter_api))) as Arc<dyn ChannelDriver>);

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&articles) as _,
        Arc::clone(&articles) as _,
        Arc::clone(&channels) as _,
        registry,
    ));

    let scheduler = SchedulerService::with_config(
        jobs,
        deliver_fn(dispatcher),
        RetryPolicy {
            max_attempts: config.scheduler.max_attempts,
            backoff_base_ms: config.scheduler.backoff_base_ms,
        },
        config.scheduler.workers,
    );

    Ok(App {
        channels,
        scheduler,
    })
}

async fn serve(app: &App) -> anyhow::Result<()> {
    app.scheduler.start().await?;
    info!("scheduler running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    app.scheduler.stop().await;
    Ok(())
}

async fn jobs_run_pending(app: &App) -> anyhow::Result<()> {
    app.scheduler.load().await?;
    let before = app.scheduler.status().await.job_count;
    app.scheduler.run_pending().await?;
    let after = app.scheduler.status().await.job_count;
    println!(
        "drained {} job(s), {} remaining",
        before.saturating_sub(after),
        after
    );
    Ok(())
}

async fn jobs_list(app: &App) -> anyhow::Result<()> {
    app.scheduler.load().await?;
    let jobs = app.scheduler.list().await;
    if jobs.is_empty() {
        println!("no delivery jobs queued");
        return Ok(());
    }
    for job in jobs {
        let due = match job.state.next_run_at_ms {
            Some(at) => format!("due at {at}"),
            None => "parked".to_string(),
        };
        println!(
            "{}  {:?}  attempts={}/{}  {}",
            job.id, job.payload, job.state.attempts, job.max_attempts, due
        );
    }
    Ok(())
}

async fn channels_list(app: &App) -> anyhow::Result<()> {
    let channels = app.channels.list().await?;
    if channels.is_empty() {
        println!("no channels configured");
        return Ok(());
    }
    for channel in channels {
        println!(
            "#{}  {}  active={}  in={}  out={}  last_out_log={:?}",
            channel.id,
            channel.provider,
            channel.active,
            channel.status_in.as_deref().unwrap_or("-"),
            channel.status_out.as_deref().unwrap_or("-"),
            channel.last_log_out.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ticketry_config::discover_and_load(cli.config_dir.as_deref());
    init_tracing(&cli, &config);

    let app = build_app(&cli, &config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&app).await,
        Commands::Jobs { action } => match action {
            JobsAction::RunPending => jobs_run_pending(&app).await,
            JobsAction::List => jobs_list(&app).await,
        },
        Commands::Channels { action } => match action {
            ChannelAction::List => channels_list(&app).await,
        },
    }
}
