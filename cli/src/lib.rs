use clap::{Parser, Subcommand};
use std::io::Write;

pub mod config;
mod demo;
mod serve;
pub mod ui;

/// Runs the CLI with provided args, writing to the given writers.
/// Returns the intended process exit code.
pub fn run<I, S>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let argv: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
    let parsed = TqCli::try_parse_from(&argv);
    match parsed {
        Err(_) => {
            let _ = writeln!(out, "TuneQuiz CLI\n");
            let _ = writeln!(out, "Usage: tq <command> [options]\n");
            let _ = writeln!(out, "Commands:");
            for c in ["serve", "demo", "cfg"] {
                let _ = writeln!(out, "  {}", c);
            }
            let _ = writeln!(out, "\nOptions:\n  -h, --help     Show this help");
            0
        }
        Ok(cli) => match cli.cmd {
            Commands::Cfg => match config::load() {
                Ok(cfg) => {
                    let rendered = serde_json::to_string_pretty(&cfg)
                        .unwrap_or_else(|_| "{}".to_string());
                    let _ = writeln!(out, "{}", rendered);
                    0
                }
                Err(e) => {
                    let _ = ui::write_error(err, &e.to_string());
                    1
                }
            },
            Commands::Demo { seed } => demo::run_demo(seed.unwrap_or(42), out, err),
            Commands::Serve { db, host, port } => match config::load() {
                Ok(mut cfg) => {
                    if let Some(db) = db {
                        cfg.db_path = db;
                    }
                    if let Some(host) = host {
                        cfg.admin_host = host;
                    }
                    if let Some(port) = port {
                        cfg.admin_port = port;
                    }
                    serve::run_serve(cfg, err)
                }
                Err(e) => {
                    let _ = ui::write_error(err, &e.to_string());
                    1
                }
            },
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "tq",
    author = "TuneQuiz",
    version,
    about = "TuneQuiz trivia bot service",
    disable_help_flag = true
)]
struct TqCli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the service: question store, sweeper, dispatch loop, admin API.
    Serve {
        #[arg(long)]
        db: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Play one scripted local game end to end.
    Demo {
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the effective configuration.
    Cfg,
}
