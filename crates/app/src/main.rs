use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use now_listening_core::{urls, AppConfig};
use now_listening_engine::{HttpNowPlayingSource, Poller, View, DEFAULT_REFRESH_INTERVAL};
use now_listening_lastfm::{LastFmClient, RecentTracksSource};
use now_listening_proxy::{CredentialSource, NowPlayingService, API_KEY_ENV, USER_ENV};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "now-listening",
    about = "Last.fm -> now-playing proxy -> polling client"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve GET /api/now-playing
    Serve,
    /// Resolve once against Last.fm and print the payload
    Status,
    /// Poll a deployed proxy and print what a page would show
    Watch {
        /// Origin serving /api/now-playing, e.g. https://example.com
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        json: bool,
    },
    Doctor,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Serve);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Doctor => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            doctor(&cfg, &cfg_path).await
        }
        Commands::Status => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            status(&cfg).await
        }
        Commands::Watch { endpoint, json } => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            watch(&cfg, endpoint, json).await
        }
        Commands::Serve => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            serve(cfg, cfg_path).await
        }
    }
}

fn upstream_for(cfg: &AppConfig) -> Result<Arc<dyn RecentTracksSource>> {
    let client = LastFmClient::new(&cfg.lastfm).context("failed to build Last.fm client")?;
    Ok(Arc::new(client))
}

fn build_service(cfg: &AppConfig) -> Result<NowPlayingService> {
    Ok(NowPlayingService::new(
        CredentialSource::from_config(&cfg.lastfm),
        upstream_for(cfg)?,
        cfg.cache,
    ))
}

async fn serve(cfg: AppConfig, cfg_path: PathBuf) -> Result<()> {
    let service = Arc::new(build_service(&cfg)?);
    let app = now_listening_proxy::router(Arc::clone(&service));

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind))?;

    info!(
        bind = %cfg.server.bind,
        configured = CredentialSource::from_config(&cfg.lastfm).resolve().is_some(),
        cache = %cfg.cache.header_value(),
        "now-listening proxy started"
    );

    let (reload_tx, mut reload_rx) = mpsc::channel::<()>(4);
    spawn_reload_watchers(cfg_path.clone(), cfg.intervals.file_watch_poll_ms, reload_tx);

    let bind = cfg.server.bind.clone();
    let reload_service = Arc::clone(&service);
    tokio::spawn(async move {
        while reload_rx.recv().await.is_some() {
            let new_cfg = match load_or_default(&cfg_path) {
                Ok(new_cfg) => new_cfg,
                Err(err) => {
                    error!(error=%err, "failed to reload config");
                    continue;
                }
            };
            match upstream_for(&new_cfg) {
                Ok(upstream) => {
                    reload_service.reconfigure(
                        CredentialSource::from_config(&new_cfg.lastfm),
                        upstream,
                        new_cfg.cache,
                    );
                    info!("configuration reloaded");
                }
                Err(err) => error!(error=%err, "failed to apply reloaded config"),
            }
            if new_cfg.server.bind != bind {
                warn!(bind = %new_cfg.server.bind, "bind address changes take effect on restart");
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received ctrl-c; shutting down");
            }
        })
        .await
        .context("server error")?;

    Ok(())
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let service = build_service(cfg)?;
    let payload = service.respond().await;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn watch(cfg: &AppConfig, endpoint: Option<String>, json: bool) -> Result<()> {
    let origin = endpoint.unwrap_or_else(|| cfg.client.endpoint.clone());
    let source = HttpNowPlayingSource::new(&origin)
        .with_context(|| format!("invalid endpoint origin {origin}"))?;
    let interval = match cfg.client.refresh_ms {
        0 => DEFAULT_REFRESH_INTERVAL,
        ms => Duration::from_millis(ms.max(1_000)),
    };

    info!(endpoint = %source.endpoint(), interval_ms = interval.as_millis() as u64, "watching");

    let mut poller = Poller::start(Arc::new(source), interval, move |view| {
        print_view(view, json)
    });
    print_view(&poller.view(), json);

    tokio::signal::ctrl_c().await?;
    info!("received ctrl-c; stopping");
    poller.stop();
    Ok(())
}

fn print_view(view: &View, json: bool) {
    if json {
        match serde_json::to_string(view) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(error=%err, "failed to encode view"),
        }
    } else {
        println!("{view}\n");
    }
}

async fn doctor(cfg: &AppConfig, cfg_path: &Path) -> Result<()> {
    println!("== now-listening doctor ==");
    println!(
        "Config file: {} ({})",
        cfg_path.display(),
        if cfg_path.exists() {
            "found"
        } else {
            "missing, using defaults"
        }
    );

    println!("{API_KEY_ENV}: {}", credential_origin(API_KEY_ENV, &cfg.lastfm.api_key));
    println!("{USER_ENV}: {}", credential_origin(USER_ENV, &cfg.lastfm.user));

    let service = build_service(cfg)?;
    let payload = service.respond().await;
    match (payload.ok, payload.track.as_ref()) {
        (true, Some(track)) => println!(
            "Last.fm: reachable, {} {} - {}",
            if payload.now_playing {
                "now playing"
            } else {
                "last played"
            },
            track.artist,
            track.name
        ),
        (true, None) => println!("Last.fm: reachable, no recent tracks"),
        (false, _) => println!(
            "Last.fm: {}",
            payload.message.as_deref().unwrap_or("unavailable")
        ),
    }

    println!("Listening address: {}", cfg.server.bind);
    match urls::proxy_endpoint_url(&cfg.client.endpoint) {
        Ok(url) => println!("Client endpoint: {url}"),
        Err(err) => println!("Client endpoint: invalid ({err})"),
    }
    println!("Cache-Control: {}", cfg.cache.header_value());

    Ok(())
}

fn credential_origin(env_key: &str, file_value: &Option<String>) -> &'static str {
    let set = |v: &str| !v.trim().is_empty();
    if std::env::var(env_key).map(|v| set(&v)).unwrap_or(false) {
        "set (environment)"
    } else if file_value.as_deref().map(set).unwrap_or(false) {
        "set (config file)"
    } else {
        "not set"
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("now-listening").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = read_config(path)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

fn spawn_reload_watchers(path: PathBuf, poll_ms: u64, tx: mpsc::Sender<()>) {
    let tx_poll = tx.clone();
    tokio::spawn(async move {
        let mut known_mtime = file_mtime(&path);
        let sleep = Duration::from_millis(poll_ms.max(2_000));
        loop {
            tokio::time::sleep(sleep).await;
            let current = file_mtime(&path);
            if current.is_some() && current != known_mtime {
                known_mtime = current;
                let _ = tx_poll.send(()).await;
            }
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let tx_hup = tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::hangup()) {
                while sig.recv().await.is_some() {
                    let _ = tx_hup.send(()).await;
                }
            }
        });
    }
}

fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("NOW_LISTENING_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.log_level = v;
        }
    }
    if let Ok(v) = std::env::var("NOW_LISTENING_BIND") {
        if !v.trim().is_empty() {
            cfg.server.bind = v;
        }
    }
    if let Ok(v) = std::env::var("NOW_LISTENING_ENDPOINT") {
        if !v.trim().is_empty() {
            cfg.client.endpoint = v;
        }
    }
}
