use clap::Parser;
use tracing::Level;

use xp3_cli::{Commands, commands};

#[derive(Parser)]
#[command(
    name = "xp3",
    about = "Tool for working with XP3 archives of the KiriKiri engine",
    version,
    long_about = "A command-line tool for listing, extracting and creating XP3 archives, \
                  including the XOR-protected archives shipped by KiriKiriZ games."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    // Handle commands
    match cli.command {
        Commands::List { archive, verbose } => commands::list::handle(&archive, verbose)?,
        Commands::Extract {
            archive,
            output,
            keys,
        } => commands::extract::handle(&archive, &output, &keys)?,
        Commands::Create {
            archive,
            inputs,
            no_compress,
            keys,
        } => commands::create::handle(&archive, &inputs, no_compress, &keys)?,
    }

    Ok(())
}
