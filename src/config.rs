use std::time::Duration;

use clap::Parser;

/// Simulated stock market: value traders and market makers trading one stock
#[derive(Parser, Debug, Clone)]
#[command(name = "market-sim")]
#[command(version, about = "A simulated single-stock market of autonomous traders")]
pub struct SimConfig {
    /// Number of value traders
    #[arg(long, default_value_t = 10)]
    pub value_traders: u32,

    /// Number of market makers
    #[arg(long, default_value_t = 1)]
    pub market_makers: u32,

    /// Fair-value belief shared by every trader
    #[arg(long, default_value_t = 100.0)]
    pub mean: f64,

    /// Stop after this many seconds (runs until ctrl-c when omitted)
    #[arg(long)]
    pub run_secs: Option<u64>,

    /// Poisson arrival rate of background orders, per second
    #[arg(long, default_value_t = 5.0)]
    pub flow_rate_hz: f64,

    /// Std-dev of the drift applied to the background mid price per order
    #[arg(long, default_value_t = 2.0)]
    pub noise_sigma: f64,

    /// Average background order size
    #[arg(long, default_value_t = 5.0)]
    pub mean_qty: f64,

    /// Market makers quote after this many quiet milliseconds (0 = never)
    #[arg(long, default_value_t = 3000)]
    pub quote_interval_ms: u64,

    /// Seed for endowments and background flow
    #[arg(long)]
    pub seed: Option<u64>,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

impl SimConfig {
    pub fn quote_interval(&self) -> Option<Duration> {
        (self.quote_interval_ms > 0).then(|| Duration::from_millis(self.quote_interval_ms))
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            value_traders: 10,
            market_makers: 1,
            mean: 100.0,
            run_secs: None,
            flow_rate_hz: 5.0,
            noise_sigma: 2.0,
            mean_qty: 5.0,
            quote_interval_ms: 3000,
            seed: None,
            log_level: tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser() {
        let parsed = SimConfig::parse_from(["market-sim"]);
        let default = SimConfig::default();
        assert_eq!(parsed.value_traders, default.value_traders);
        assert_eq!(parsed.market_makers, default.market_makers);
        assert_eq!(parsed.mean, default.mean);
        assert_eq!(parsed.quote_interval_ms, default.quote_interval_ms);
        assert_eq!(parsed.log_level, default.log_level);
    }

    #[test]
    fn test_zero_quote_interval_disables_quoting() {
        let cfg = SimConfig::parse_from(["market-sim", "--quote-interval-ms", "0"]);
        assert_eq!(cfg.quote_interval(), None);
    }

    #[test]
    fn test_parses_overrides() {
        let cfg = SimConfig::parse_from([
            "market-sim",
            "--value-traders",
            "3",
            "--run-secs",
            "2",
            "--seed",
            "42",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cfg.value_traders, 3);
        assert_eq!(cfg.run_secs, Some(2));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.log_level, tracing::Level::DEBUG);
    }
}
