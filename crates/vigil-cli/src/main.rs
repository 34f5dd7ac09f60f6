use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vigil_core::config::VigilConfig;
use vigil_core::error::NetworkError;
use vigil_core::impls::LogErrorSink;
use vigil_core::ports::{ApiRequest, ApiResponse, ErrorSink, RequestTransport};
use vigil_core::{ApiCallTask, CryptoSettings, DeletePolicy, TaskFunction, TaskGroup, TaskScheduler};

/// Vigil - VPN client core tools
#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Inspect the encrypted settings file and exercise the task scheduler")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or modify the settings file
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Run a scripted set of tasks against a loopback transport
    Demo,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print every setting
    List,
    /// Print one setting as JSON
    Get { key: String },
    /// Set KEY to a JSON value (anything that is not JSON is stored as a string)
    Set { key: String, value: String },
    /// Remove one setting
    Remove { key: String },
    /// Forget everything: settings, file and key
    Reset,
    /// Show the format new writes will use
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VigilConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VigilConfig::default(),
    };
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Settings(command) => run_settings(&config, command),
        Commands::Demo => run_demo(&config).await,
    }
}

/// `RUST_LOG` wins over the config's filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_settings(config: &VigilConfig, command: SettingsCommand) -> Result<()> {
    let open = || {
        config.settings.open().with_context(|| {
            format!(
                "settings at {} are unusable (try `vigil settings reset`)",
                config.settings.path.display()
            )
        })
    };

    match command {
        SettingsCommand::List => {
            for (key, value) in open()?.values() {
                println!("{key} = {value}");
            }
        }
        SettingsCommand::Get { key } => match open()?.get(&key) {
            Some(value) => println!("{value}"),
            None => bail!("no such setting: {key}"),
        },
        SettingsCommand::Set { key, value } => {
            let mut settings = open()?;
            let value = match serde_json::from_str::<Value>(&value) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(value),
            };
            settings.set(key, value);
            settings.save().context("failed to save settings")?;
        }
        SettingsCommand::Remove { key } => {
            let mut settings = open()?;
            if settings.remove(&key).is_none() {
                bail!("no such setting: {key}");
            }
            settings.save().context("failed to save settings")?;
        }
        SettingsCommand::Version => {
            let version = open()?.codec().supported_version();
            println!("{version:?} (0x{:02x})", version.as_byte());
        }
        // 壊れたファイルでも reset はできる
        SettingsCommand::Reset => reset_settings(config)?,
    }
    Ok(())
}

fn reset_settings(config: &VigilConfig) -> Result<()> {
    match config.settings.open() {
        Ok(mut settings) => settings.reset().context("failed to reset settings")?,
        Err(e) => {
            warn!(error = %e, "settings unreadable, removing file");
            match std::fs::remove_file(&config.settings.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).context("failed to remove settings file"),
            }
            CryptoSettings::new(config.settings.key_store())
                .reset_key()
                .context("failed to clear settings key")?;
        }
    }
    info!(path = %config.settings.path.display(), "settings reset");
    Ok(())
}

/// Answers every request locally after a fixed latency.
///
/// Paths under `/missing` answer 404.
struct LoopbackTransport {
    latency: Duration,
    received: Mutex<Vec<String>>,
}

impl LoopbackTransport {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            received: Mutex::new(Vec::new()),
        }
    }

    fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RequestTransport for LoopbackTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NetworkError> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{:?} {}", request.method, request.path));

        sleep(self.latency).await;

        if request.path.starts_with("/missing") {
            return Ok(ApiResponse {
                status: 404,
                body: Value::Null,
            });
        }
        Ok(ApiResponse::ok(json!({ "path": request.path })))
    }
}

async fn run_demo(config: &VigilConfig) -> Result<()> {
    // (A) scheduler と loopback transport を用意
    let scheduler = TaskScheduler::new();
    let transport = Arc::new(LoopbackTransport::new(Duration::from_millis(50)));
    let sink: Arc<dyn ErrorSink> = Arc::new(LogErrorSink);
    let timeout = config.network.request_timeout();

    let api = |name: &str, request: ApiRequest, policy: DeletePolicy| {
        let request = match timeout {
            Some(limit) => request.with_timeout(limit),
            None => request.without_timeout(),
        };
        ApiCallTask::new(name, request, transport.clone(), sink.clone()).with_policy(policy)
    };

    // (B) 通常のキュー投入（FIFO, 1 件ずつ）
    scheduler.schedule_task(api(
        "authenticate",
        ApiRequest::post("/auth", json!({ "code": "demo" })),
        DeletePolicy::NonDeletable,
    ));
    scheduler.schedule_task(api("fetch_account", ApiRequest::get("/account"), DeletePolicy::Deletable));
    scheduler.schedule_task(api("fetch_servers", ApiRequest::get("/servers"), DeletePolicy::Reschedulable));
    scheduler.schedule_task(api("remove_device", ApiRequest::delete("/device/old"), DeletePolicy::NonDeletable));
    scheduler.schedule_task(api("fetch_headlines", ApiRequest::get("/headlines"), DeletePolicy::Deletable));

    // (C) キューを待たずに実行
    scheduler.schedule_task_now(api(
        "submit_ticket",
        ApiRequest::post("/support", json!({ "text": "hello" })),
        DeletePolicy::Deletable,
    ));

    // (D) 未実行の Deletable を捨てる
    scheduler.delete_tasks();
    println!("queue after delete_tasks():");
    for view in scheduler.queued_tasks() {
        println!("  {} ({})", view.name, view.policy);
    }

    // (E) グループと完了通知
    let group = TaskGroup::new("post_login")
        .with_task(api("fetch_subscription", ApiRequest::get("/subscription"), DeletePolicy::Deletable))
        .with_task(api("fetch_features", ApiRequest::get("/missing/features"), DeletePolicy::Deletable));
    scheduler.schedule_task(group);
    let done = scheduler.schedule_task(TaskFunction::new("done", |ctx| {
        info!(task = ctx.name(), "demo script finished");
    }));

    let outcome = done.wait().await;
    scheduler.wait_idle().await;

    println!("requests in the order they were sent:");
    for (i, request) in transport.received().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, request);
    }
    println!("last task: {outcome:?}");
    println!("counts: {:?}", scheduler.counts());
    Ok(())
}
