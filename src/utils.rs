//! Utils

use std::path::PathBuf;

use clap::Parser;

use crate::payments::test_cards;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    #[default]
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Arguments for the checkout demo
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Fixture set for the catalog, carts and users
    #[arg(short, long, default_value = "bookstore")]
    pub fixture: String,

    /// Named cart from the fixture set
    #[arg(short, long, default_value = "mixed")]
    pub cart: String,

    /// Id of the user placing the order
    #[arg(short, long, default_value_t = 1)]
    pub user: u64,

    /// Card number; the gateway test cards decline or succeed
    #[arg(long, default_value = test_cards::SUCCESS)]
    pub card: String,

    /// Card expiry (MM/YY)
    #[arg(long, default_value = "12/34")]
    pub expiry: String,

    /// Card CVC
    #[arg(long, default_value = "123")]
    pub cvc: String,

    /// YAML ledger config; defaults apply if missing
    #[arg(long, env = "BOOKLEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Persist state as JSON documents under the configured data directory
    #[arg(long)]
    pub persist: bool,

    /// Print the author and admin dashboards after the order
    #[arg(long)]
    pub dashboards: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn demo_args_default_to_a_successful_order() -> TestResult {
        let args = DemoArgs::try_parse_from(["checkout"])?;

        assert_eq!(args.fixture, "bookstore");
        assert_eq!(args.cart, "mixed");
        assert_eq!(args.card, test_cards::SUCCESS);
        assert!(!args.persist);

        Ok(())
    }

    #[test]
    fn demo_args_accept_json_logs() -> TestResult {
        let args = DemoArgs::try_parse_from([
            "checkout",
            "--log-format",
            "json",
            "--card",
            test_cards::DECLINE,
        ])?;

        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.card, test_cards::DECLINE);

        Ok(())
    }
}
