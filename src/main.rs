mod bus;
mod cli;
mod controller;
mod datemath;
mod db;
mod error;
mod keymap;
mod notify;
mod screens;
mod server;
mod term_input;
mod tui;
mod ui;

use std::time::Duration;

use clap::Parser;
use time::OffsetDateTime;

use error::AppError;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), AppError> {
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Ui(args) => {
            let keymap = keymap::load(args.keys.as_deref())?;
            tui::run(&cli.db, keymap)
        }
        cli::Commands::Serve(args) => {
            init_tracing();
            let keymap = keymap::load(args.keys.as_deref())?;
            server::run(
                &cli.db,
                &args.listen,
                keymap,
                Duration::from_secs(args.grace_secs),
            )
        }
        cli::Commands::Notify(args) => {
            init_tracing();
            let conn = db::open_connection(&cli.db)?;
            let reminders = notify::scan_due(&conn, OffsetDateTime::now_utc())?;
            if args.json {
                print_json(&reminders);
            } else {
                for reminder in &reminders {
                    println!("{}", notify::format_reminder(reminder));
                }
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
