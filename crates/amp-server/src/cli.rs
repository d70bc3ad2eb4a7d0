//! Command-line argument parsing (spec §6), grounded in the teacher's
//! `apps/server/src/main.rs` `Args` derive struct.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "amp-server", about = "IAX2/radio bridge node")]
pub struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, env = "AMP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port for the HTTP status/config UI.
    #[arg(long, env = "AMP_NODE0_MGR_PORT", default_value_t = 8080)]
    pub httpport: u16,

    /// Enable verbose trace logging.
    #[arg(long, env = "AMP_TRACE", default_value_t = false)]
    pub trace: bool,
}

impl Args {
    /// Resolves the effective config path: `--config`, else `$HOME/amp-server.json`.
    #[must_use]
    pub fn resolved_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join("amp-server.json"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_with_no_args() {
        let args = Args::parse_from(["amp-server"]);
        assert_eq!(args.httpport, 8080);
        assert!(!args.trace);
    }
}
