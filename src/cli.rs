use crate::{Error, Result};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub config_path: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub demo: bool,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunOptions),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        if args.is_empty() {
            return Ok(Command::Run(RunOptions::default()));
        }

        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            Some("run") => parse_run_options(&mut iter),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` is implied when the first argument is already a flag.
                let mut iter = args.iter();
                parse_run_options(&mut iter)
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
            None => Ok(Command::Run(RunOptions::default())),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "homebadger - sensor status badge daemon\n",
            "\n",
            "USAGE:\n",
            "  homebadger run [--config <path>] [--port <number>] [--log-level <level>] [--log-file <path>] [--demo]\n",
            "  homebadger --help\n",
            "  homebadger --version\n",
            "\n",
            "OPTIONS:\n",
            "  --config <path>      Config file (default: ~/.homebadger/config.toml)\n",
            "  --port <number>      HTTP status port (default: 8080)\n",
            "  --log-level <level>  error|warn|info|debug|trace (default: info)\n",
            "  --log-file <path>    Append log lines to this file as well as stderr\n",
            "  --demo               Use the simulated local sensor instead of hardware\n",
            "  -h, --help           Show this help\n",
            "  -V, --version        Show version\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

/// Flags after `run`. `-h`/`--help` anywhere wins over the rest.
fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<Command> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--help" | "-h" => return Ok(Command::ShowHelp),
            "--config" => {
                opts.config_path = Some(take_value(flag, iter)?);
            }
            "--port" => {
                let raw = take_value(flag, iter)?;
                opts.server_port = Some(raw.parse().map_err(|_| {
                    Error::InvalidArgs("port must be an integer between 0 and 65535".to_string())
                })?);
            }
            "--log-level" => {
                opts.log_level = Some(take_value(flag, iter)?);
            }
            "--log-file" => {
                opts.log_file = Some(take_value(flag, iter)?);
            }
            "--demo" => {
                opts.demo = true;
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(Command::Run(opts))
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("expected a value after {flag}")))
}
