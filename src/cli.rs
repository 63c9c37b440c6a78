//! Command-line surface: port, app-id override, help.

use clap::Parser;

pub const DEFAULT_TCP_PORT: u16 = 34400;

#[derive(Debug, Parser)]
#[command(name = "waltham-receiver", about = "Protocol-termination core for remote-display surfaces")]
pub struct Args {
    /// TCP port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_TCP_PORT)]
    pub port: u16,

    /// Overrides the app-id carried by any `ivi_app_id.surface_create` request.
    #[arg(short = 'i', long = "app_id")]
    pub app_id: Option<String>,
}

impl Args {
    /// Parses `std::env::args`, exiting the process on failure: 0 on
    /// `--help` (clap's own behavior), -1 (255 as a `u8` process exit
    /// code) on malformed arguments, rather than clap's default
    /// usage-error code.
    pub fn parse_or_exit() -> Self {
        match Args::try_parse() {
            Ok(args) => args,
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp || e.kind() == clap::error::ErrorKind::DisplayVersion => {
                e.exit()
            }
            Err(e) => {
                let _ = e.print();
                // Process exit codes are a `u8` on Unix; -1i32 as u8 == 255,
                // the idiomatic representation of a bad-arguments "-1".
                std::process::exit(255);
            }
        }
    }
}
