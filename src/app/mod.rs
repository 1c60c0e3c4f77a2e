use std::{cell::RefCell, path::Path, rc::Rc, str::FromStr};

use log::info;
use tokio::{net::TcpListener, task};

use crate::{
    cli::RunOptions,
    config::{Config, LocalKind},
    display::{layout::draw_boot_splash, RecordingDisplay, SharedDisplay},
    http,
    remote::RemoteClient,
    state::SharedState,
    Error, Result,
};

pub mod autoscroll;
pub mod input;
pub mod lifecycle;
mod logger;
pub mod polling;
pub mod render_loop;

pub use logger::{LogLevel, Logger};
pub use render_loop::{Fingerprint, RenderScheduler};

/// Effective settings for one daemon run: the config file with CLI overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub config: Config,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_sources(mut config: Config, opts: RunOptions) -> Self {
        if let Some(port) = opts.server_port {
            config.server_port = port;
        }
        if opts.demo {
            config.local.kind = LocalKind::Demo;
        }
        Self {
            config,
            log_level: opts
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s).ok())
                .unwrap_or_default(),
            log_file: opts.log_file,
        }
    }
}

pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = match opts.config_path.as_deref() {
            Some(path) => Config::load_from_path(Path::new(path))?,
            None => Config::load_or_default()?,
        };
        Ok(Self::new(AppConfig::from_sources(cfg_file, opts)))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon: one thread, every activity a local task.
    pub fn run(self) -> Result<()> {
        Logger::new(self.config.log_level, self.config.log_file.clone()).install()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let local = task::LocalSet::new();
        local.block_on(&runtime, run_activities(self.config.config))
    }
}

async fn run_activities(config: Config) -> Result<()> {
    let state = SharedState::new(config.descriptors(), config.display.items_per_page);
    let display: SharedDisplay = Rc::new(RefCell::new(RecordingDisplay::new()));
    draw_boot_splash(&mut *display.borrow_mut())?;

    let listener = TcpListener::bind(("0.0.0.0", config.server_port))
        .await
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to bind port {}: {e}", config.server_port),
            ))
        })?;

    let stats = state.statistics();
    info!(
        "daemon start (port={}, local={}, remote={}, per_page={})",
        config.server_port,
        stats.local_sensor_count,
        stats.ha_sensor_count,
        config.display.items_per_page
    );

    task::spawn_local(http::serve(listener, state.clone()));

    if !config.remote_sensors.is_empty() {
        task::spawn_local(polling::run_remote_poller(
            state.clone(),
            RemoteClient::from_config(&config.remote),
            config.remote.poll_interval,
            config.remote.staleness,
        ));
    }
    if !config.local_sensors.is_empty() {
        task::spawn_local(polling::run_local_poller(
            state.clone(),
            polling::build_local_sensor(&config),
            config.local.poll_interval,
        ));
    }

    task::spawn_local(
        RenderScheduler::new(
            state.clone(),
            display.clone(),
            config.display.settle_interval,
            config.display.poll_interval,
        )
        .run(),
    );
    task::spawn_local(input::run_input_loop(
        state.clone(),
        input::build_buttons(&config.buttons),
    ));
    task::spawn_local(autoscroll::run_autoscroll(
        state.clone(),
        config.display.autoscroll_interval,
    ));
    task::spawn_local(lifecycle::run_heartbeat(state, display.clone()));

    lifecycle::wait_for_shutdown(display).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_port_and_forces_demo() {
        let mut file = Config::default();
        file.local.kind = LocalKind::Iio;
        let opts = RunOptions {
            server_port: Some(9000),
            log_level: Some("debug".into()),
            demo: true,
            ..RunOptions::default()
        };
        let merged = AppConfig::from_sources(file, opts);
        assert_eq!(merged.config.server_port, 9000);
        assert_eq!(merged.config.local.kind, LocalKind::Demo);
        assert_eq!(merged.log_level, LogLevel::Debug);
    }

    #[test]
    fn file_values_kept_when_cli_silent() {
        let mut file = Config::default();
        file.server_port = 8181;
        file.local.kind = LocalKind::Iio;
        let merged = AppConfig::from_sources(file.clone(), RunOptions::default());
        assert_eq!(merged.config, file);
        assert_eq!(merged.log_level, LogLevel::Info);
        assert!(merged.log_file.is_none());
    }

    #[test]
    fn from_options_reads_explicit_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("badger.toml");
        std::fs::write(&path, "server_port = 8099\n").unwrap();
        let app = App::from_options(RunOptions {
            config_path: Some(path.to_string_lossy().into_owned()),
            ..RunOptions::default()
        })
        .unwrap();
        assert_eq!(app.config().config.server_port, 8099);
    }
}
