pub mod notify;
pub mod report;
pub mod wordlist;

pub use notify::{NotifyError, TelegramClient, TelegramConfig, TelegramNotifier};
pub use report::{ConsoleObserver, ReportFormat, generate_scan_report, write_report};
pub use wordlist::{load_or_default, load_wordlist, resolve_path};
