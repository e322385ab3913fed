use clap::Parser;
use log_tailer::{LineParser, TailEvent, Tailer, TailerConfig};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Follow a log file and print every entry appended to it.
///
/// Press Enter to pause or resume reading.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to follow
    path: PathBuf,

    /// Entry separator
    #[arg(long, default_value = "\n")]
    separator: String,

    /// Delay between read passes, in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Start paused; nothing is read until Enter is pressed
    #[arg(long)]
    start_paused: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long)]
    debug: bool,
}

/// Priority: RUST_LOG env var > --debug flag > "info".
fn init_logging(debug: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let config = TailerConfig::default()
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_start_paused(args.start_paused);

    let separator = args.separator;
    let tailer = match Tailer::with_config(config, move || LineParser::new(separator.clone())) {
        Ok(tailer) => tailer,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let mut events = tailer.subscribe();
    if let Err(e) = tailer.set_path(&args.path) {
        eprintln!("Error starting tailer: {}", e);
        process::exit(1);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut exit_code = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    let paused = tailer.toggle_paused();
                    eprintln!("{}", if paused { "Paused" } else { "Resumed" });
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            event = events.next() => match event {
                Some(TailEvent::NewEntry(line)) => println!("{}", line),
                Some(TailEvent::Error { message, fatal, .. }) => {
                    eprintln!("{}", message);
                    if fatal {
                        exit_code = 1;
                        break;
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    if let Err(e) = tailer.close() {
        eprintln!("Error stopping tailer: {}", e);
        exit_code = 1;
    }
    process::exit(exit_code);
}
