// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    InterruptAction, ScanOptions, build_scan_config, interrupt_action, is_consent, log_level,
    telegram_config, validate_target,
};
