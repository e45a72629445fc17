use anyhow::Context;
use clap::Parser;
use mccmd::Shell;
use mccmd::config::{DEFAULT_PATH, ShellConfig};
use mccmd::console::ConsoleSender;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Debug, Parser)]
#[command(version, about = "Interactive shell for mccmd commands")]
struct Args {
    /// Configuration file, created with defaults if missing.
    #[arg(short, long, default_value = DEFAULT_PATH)]
    config: PathBuf,

    /// Log filter directives, overriding `MCCMD_LOG`.
    #[arg(long)]
    log_filter: Option<String>,
}

enum Message {
    Line(String),
    Shutdown,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ShellConfig::load(&args.config)?;

    // Setup logging
    let logfile = tracing_appender::rolling::daily(&config.log_directory, "mccmd.log");
    let env_filter = match &args.log_filter {
        Some(directives) => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(directives),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .with_env_var("MCCMD_LOG")
            .from_env_lossy(),
    };
    tracing_subscriber::fmt()
        .with_writer(logfile.and(std::io::stdout))
        .with_env_filter(env_filter)
        .init();

    let shell = Shell::new(&config, ConsoleSender::stdout())?;
    info!(
        commands = shell.dispatcher.root().commands().len(),
        splitter = config.splitter.as_str(),
        "Shell ready, type help for a list of commands"
    );

    let (tx, rx) = mpsc::channel();
    let ctrl_handler_sender = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrl_handler_sender.send(Message::Shutdown);
    })
    .context("There was an error setting the ctrlc handler")?;

    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Message::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read from stdin: {}", err);
                        break;
                    }
                }
            }
            let _ = tx.send(Message::Shutdown);
        })
        .context("Failed to spawn the stdin reader")?;

    while let Ok(message) = rx.recv() {
        match message {
            Message::Line(line) => {
                shell.handle_line(&line);
            }
            Message::Shutdown => break,
        }
    }

    info!("Shutting down");
    shell.shutdown();
    Ok(())
}
