use homebadger::{
    app::App,
    cli::{Command, RunOptions},
    config::{Config, LocalKind},
};
use std::{
    env, fs,
    path::Path,
    sync::{Mutex, OnceLock},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_temp_home<F: FnOnce(&Path)>(f: F) {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let original_home = env::var_os("HOME");
    let home = tempfile::tempdir().expect("failed to create temp HOME");
    env::set_var("HOME", home.path());
    f(home.path());
    match original_home {
        Some(val) => env::set_var("HOME", val),
        None => env::remove_var("HOME"),
    }
}

fn write_config(home: &Path, contents: &str) {
    let cfg_dir = home.join(".homebadger");
    fs::create_dir_all(&cfg_dir).expect("failed to create config dir");
    fs::write(cfg_dir.join("config.toml"), contents).expect("failed to write config");
}

#[test]
fn first_run_writes_default_config() {
    with_temp_home(|home| {
        let app = App::from_options(RunOptions::default()).expect("defaults should load");
        assert_eq!(app.config().config, Config::default());
        let written = fs::read_to_string(home.join(".homebadger/config.toml")).unwrap();
        assert!(written.contains("server_port = 8080"));
        assert!(written.contains("bme688_temperature"));
    });
}

#[test]
fn home_config_and_cli_flags_merge() {
    with_temp_home(|home| {
        write_config(
            home,
            concat!(
                "server_port = 8181\n",
                "[local]\n",
                "kind = \"iio\"\n",
                "[remote]\n",
                "token = \"abc\"\n",
                "request_timeout = \"3s\"\n",
                "[[remote_sensors]]\n",
                "title = \"Indoors\\nCO2\\n(ppm)\"\n",
                "entity_id = \"sensor.mh_z14a_carbon_dioxide\"\n",
            ),
        );
        let args: Vec<String> = ["run", "--port", "9090", "--demo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let Command::Run(opts) = Command::parse(&args).unwrap() else {
            panic!("expected run command");
        };
        let app = App::from_options(opts).unwrap();
        let cfg = &app.config().config;
        assert_eq!(cfg.server_port, 9090);
        assert_eq!(cfg.local.kind, LocalKind::Demo);
        assert_eq!(cfg.remote.token, "abc");
        assert_eq!(cfg.remote.request_timeout.as_secs(), 3);
        assert_eq!(cfg.descriptors().len(), 5);
    });
}

#[test]
fn invalid_home_config_is_reported() {
    with_temp_home(|home| {
        write_config(home, "[display]\nitems_per_page = 7\n");
        let err = App::from_options(RunOptions::default())
            .err()
            .expect("page size outside the cycle must be rejected");
        assert!(format!("{err}").contains("items_per_page"));
    });
}

#[test]
fn help_mentions_every_flag() {
    let help = Command::help();
    for flag in ["--config", "--port", "--log-level", "--log-file", "--demo"] {
        assert!(help.contains(flag), "help is missing {flag}");
    }
}
