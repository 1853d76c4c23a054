use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "bday")]
#[command(bin_name = "bday")]
#[command(version)]
#[command(about = "Birthday reminders in your terminal")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "BDAY_DB_PATH",
        default_value = "db.sqlite",
        help = "Path to the SQLite database."
    )]
    pub db: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run the interactive session in this terminal.")]
    Ui(UiArgs),
    #[command(about = "Serve interactive sessions to remote terminals.")]
    Serve(ServeArgs),
    #[command(about = "Scan for due birthdays and emit reminder lines.")]
    Notify(NotifyArgs),
}

#[derive(Debug, Args)]
pub struct UiArgs {
    #[arg(long, help = "TOML file overriding the default key bindings.")]
    pub keys: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(
        short,
        long,
        env = "BDAY_LISTEN_ADDR",
        default_value = "0.0.0.0:23234",
        help = "Address to listen on."
    )]
    pub listen: String,

    #[arg(long, help = "TOML file overriding the default key bindings.")]
    pub keys: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 10,
        help = "Seconds to let in-flight sessions drain on shutdown."
    )]
    pub grace_secs: u64,
}

#[derive(Debug, Args)]
pub struct NotifyArgs {
    #[arg(long, help = "Print the due reminders as JSON.")]
    pub json: bool,
}
