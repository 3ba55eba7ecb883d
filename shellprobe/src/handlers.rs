use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use shellprobe_core::notify::{TelegramClient, TelegramConfig, TelegramNotifier, test_connection};
use shellprobe_core::report::{ConsoleObserver, ReportFormat, generate_scan_report, write_report};
use shellprobe_core::wordlist::{load_or_default, resolve_path};
use shellprobe_scanner::candidate::{DEFAULT_DIRECTORIES, DEFAULT_SHELL_FILENAMES};
use shellprobe_scanner::classify::DEFAULT_SIGNATURES;
use shellprobe_scanner::{ScanConfig, Scanner};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use url::Url;

/// Everything `scan` needs besides the target, as read from the command line.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub timeout_secs: u64,
    pub workers: usize,
    pub filenames: Option<String>,
    pub directories: Option<String>,
    pub signatures: Option<String>,
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_target(url: &Url) -> Result<Url, String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "Unsupported scheme '{}'. Please use format: https://example.com",
            url.scheme()
        ));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url.clone()),
        _ => Err("Invalid URL format. Please use format: https://example.com".to_string()),
    }
}

/// The consent gate accepts the full word only.
pub fn is_consent(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Map the `-v` count to the subscriber's max level.
pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Telegram is only configured when both credentials are present.
pub fn telegram_config(token: Option<&str>, chat_id: Option<&str>) -> Option<TelegramConfig> {
    match (token, chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            Some(TelegramConfig::new(token, chat_id))
        }
        _ => None,
    }
}

/// Build the scanner configuration, loading any dictionary files given.
pub fn build_scan_config(target: Url, options: &ScanOptions) -> Result<ScanConfig, String> {
    if options.workers == 0 {
        return Err("Worker count must be at least 1".to_string());
    }

    let filenames = options.filenames.as_deref().map(resolve_path);
    let directories = options.directories.as_deref().map(resolve_path);
    let signatures = options.signatures.as_deref().map(resolve_path);

    let mut config = ScanConfig::new(target);
    config.workers = options.workers;
    config.fetch.timeout = Duration::from_secs(options.timeout_secs);
    config.filenames = load_or_default(filenames.as_deref(), DEFAULT_SHELL_FILENAMES)?;
    config.directories = load_or_default(directories.as_deref(), DEFAULT_DIRECTORIES)?;
    config.classifier.signatures = load_or_default(signatures.as_deref(), DEFAULT_SIGNATURES)?;

    Ok(config)
}

pub fn print_banner() {
    println!();
    println!("{}", "  ┌─┐┬ ┬┌─┐┬  ┬  ┌─┐┬─┐┌─┐┌┐ ┌─┐".bright_red().bold());
    println!("{}", "  └─┐├─┤├┤ │  │  ├─┘├┬┘│ │├┴┐├┤ ".bright_red().bold());
    println!("{}", "  └─┘┴ ┴└─┘┴─┘┴─┘┴  ┴└─└─┘└─┘└─┘".bright_red().bold());
    println!(
        "  {} v{}",
        "web shell reconnaissance".bright_white(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(70).bright_blue().bold());
}

fn print_disclaimer() {
    println!();
    print_divider();
    println!("{}", "WARNING - LEGAL DISCLAIMER".yellow().bold());
    print_divider();
    println!("This tool should ONLY be used on websites you own or have");
    println!("explicit written permission to test. Unauthorized scanning");
    println!("may be ILLEGAL and could result in criminal prosecution.");
    print_divider();
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

/// Upper bound on waiting for queued Telegram messages once the scan is over.
pub const NOTIFY_FLUSH_DEADLINE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Stop dispatching and let in-flight probes finish.
    Cancel,
    /// Leave immediately.
    Exit,
}

/// First Ctrl+C cancels gracefully, any further one exits.
pub fn interrupt_action(received: usize) -> InterruptAction {
    if received <= 1 {
        InterruptAction::Cancel
    } else {
        InterruptAction::Exit
    }
}

async fn watch_interrupts(token: CancellationToken) {
    let mut received = 0;
    while tokio::signal::ctrl_c().await.is_ok() {
        received += 1;
        match interrupt_action(received) {
            InterruptAction::Cancel => {
                warn!("Interrupt received, stopping dispatch");
                eprintln!(
                    "\n{} Scan interrupted by user, waiting for in-flight requests \
                     (Ctrl+C again to quit now)...",
                    "[!]".yellow().bold()
                );
                token.cancel();
            }
            InterruptAction::Exit => {
                eprintln!("\n{} Aborted.", "[!]".red().bold());
                std::process::exit(130);
            }
        }
    }
}

pub async fn handle_scan(args: &ArgMatches, quiet: bool, verbosity: u8) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(log_level(verbosity))
        .init();

    if let Err(e) = run_scan(args, quiet).await {
        eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_scan(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let telegram = telegram_config(
        args.get_one::<String>("telegram-bot-token").map(String::as_str),
        args.get_one::<String>("telegram-chat-id").map(String::as_str),
    );

    if args.get_flag("test-telegram") {
        let Some(config) = telegram else {
            bail!(
                "Bot token and chat ID are required for the test \
                 (--telegram-bot-token <TOKEN> --telegram-chat-id <CHAT_ID>)"
            );
        };
        let client = TelegramClient::new(config).context("Failed to build Telegram client")?;
        match test_connection(&client).await {
            Ok(()) => println!("{} Telegram connection test: SUCCESS", "✓".green().bold()),
            Err(e) => {
                println!("{} Telegram connection test: FAILED", "✗".red().bold());
                println!("    Error: {}", e);
            }
        }
        return Ok(());
    }

    let url = args
        .get_one::<Url>("url")
        .context("--url is required")?;
    let target = validate_target(url).map_err(anyhow::Error::msg)?;

    let options = ScanOptions {
        timeout_secs: args.get_one::<u64>("timeout").copied().unwrap_or(10),
        workers: args.get_one::<usize>("workers").copied().unwrap_or(10),
        filenames: args.get_one::<String>("filenames").cloned(),
        directories: args.get_one::<String>("directories").cloned(),
        signatures: args.get_one::<String>("signatures").cloned(),
    };
    let config = build_scan_config(target.clone(), &options).map_err(anyhow::Error::msg)?;

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<String>("output").map(|p| resolve_path(p));

    let notifier = if args.get_flag("no-telegram") {
        None
    } else {
        match telegram {
            Some(config) => {
                let client = TelegramClient::new(config).context("Failed to build Telegram client")?;
                println!("{} Telegram notifications: ENABLED", "[*]".blue());
                Some(TelegramNotifier::spawn(client))
            }
            None => {
                println!("{} Telegram credentials not provided. Notifications: DISABLED", "[!]".yellow());
                println!("    Use --telegram-bot-token and --telegram-chat-id to enable them");
                None
            }
        }
    };

    if !args.get_flag("yes") {
        print_disclaimer();
        let response = print_prompt("\nDo you have permission to scan this website? (yes/no):");
        if !is_consent(&response) {
            println!(
                "\n{} Scan cancelled. Obtain proper authorization before scanning.",
                "[!]".yellow().bold()
            );
            return Ok(());
        }
    }

    let token = CancellationToken::new();
    let mut scanner = Scanner::new(config)
        .context("Failed to initialise scanner")?
        .with_cancellation(token.clone())
        .with_observer(Arc::new(ConsoleObserver::new(!quiet)));
    if let Some(ref notifier) = notifier {
        scanner = scanner.with_observer(Arc::new(notifier.clone()));
    }

    tokio::spawn(watch_interrupts(token));

    println!();
    println!("{} Starting scan on: {}", "[*]".blue(), target.as_str().bright_white());
    println!("{} Workers: {}  Timeout: {}s", "[*]".blue(), options.workers, options.timeout_secs);
    println!();

    let run = scanner.run().await;
    info!(
        checked = run.checked_count(),
        suspicious = run.suspicious.len(),
        "Scan finished"
    );

    print!("{}", generate_scan_report(&run));

    if let Some(path) = output {
        save_report(&run, format, path);
    }

    if let Some(notifier) = notifier {
        notifier.flush_within(NOTIFY_FLUSH_DEADLINE).await;
    }

    Ok(())
}

fn save_report(run: &shellprobe_scanner::ScanRun, format: ReportFormat, path: PathBuf) {
    match write_report(run, format, &path) {
        Ok(()) => println!(
            "{} Report saved to: {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        ),
        Err(e) => eprintln!(
            "{} Failed to write report {}: {}",
            "✗".red().bold(),
            path.display(),
            e
        ),
    }
}
