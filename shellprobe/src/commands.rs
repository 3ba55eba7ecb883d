use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("shellprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("shellprobe")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress bar").required(false))
        .arg(
            arg!(-v --"verbose" ...)
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Probe a site you control for web shells left in common upload, theme and \
                plugin locations.",
                )
                .after_help(
                    "Example: shellprobe scan -u https://example.com \
                --telegram-bot-token <TOKEN> --telegram-chat-id <CHAT_ID>",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Target website URL (e.g. https://example.com)")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-t --"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("10"),
                )
                .arg(
                    arg!(-w --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers probing concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"filenames" <PATH>)
                        .required(false)
                        .help("Newline-delimited shell filename dictionary (default: built-in list)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--"directories" <PATH>)
                        .required(false)
                        .help("Newline-delimited directory dictionary (default: built-in list)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--"signatures" <PATH>)
                        .required(false)
                        .help("Newline-delimited regex signatures (default: built-in list)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--"telegram-bot-token" <TOKEN>)
                        .required(false)
                        .help("Telegram bot token (from @BotFather)"),
                )
                .arg(
                    arg!(--"telegram-chat-id" <CHAT_ID>)
                        .required(false)
                        .help("Telegram chat ID (user or group)"),
                )
                .arg(
                    arg!(--"test-telegram")
                        .required(false)
                        .help("Send a Telegram test message and exit")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("no-telegram"),
                )
                .arg(
                    arg!(--"no-telegram")
                        .required(false)
                        .help("Disable Telegram notifications")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen only)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report file format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-y --"yes")
                        .required(false)
                        .help("Confirm you are authorized to scan the target and skip the prompt")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
