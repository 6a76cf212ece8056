//! Static instrument catalog: which market quantities are tracked and how
//! each one maps onto the external providers.

use serde::{Deserialize, Serialize};

/// Provider-selection category for an instrument. Drives the fallback chain
/// built by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    /// Equity index; chart API is the last resort.
    Index,
    /// Crypto pair; falls back to the spot-price API, then the chart API.
    Crypto,
    /// Fiat currency pair; falls back to the exchange-rate API.
    Fx,
    /// Not fetched; synthesized as a ratio of two other instruments.
    Derived,
}

/// One tracked market quantity. Immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub key: String,
    pub label: String,
    pub kind: InstrumentKind,
    /// Chart-API symbol. Absent for derived instruments.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Candidate tickers for the time-series API, tried in order.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Keys of the numerator/denominator instruments for derived ratios.
    #[serde(default)]
    pub numerator: Option<String>,
    #[serde(default)]
    pub denominator: Option<String>,
}

impl InstrumentSpec {
    /// Quote currency parsed from a `BASE/QUOTE` key, lowercased for the
    /// spot-price API.
    pub fn quote_currency(&self) -> Option<String> {
        self.key.split_once('/').map(|(_, q)| q.to_lowercase())
    }
}

fn spec(
    key: &str,
    label: &str,
    kind: InstrumentKind,
    symbol: Option<&str>,
    aliases: &[&str],
) -> InstrumentSpec {
    InstrumentSpec {
        key: key.to_string(),
        label: label.to_string(),
        kind,
        symbol: symbol.map(str::to_string),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        numerator: None,
        denominator: None,
    }
}

/// The built-in dashboard basket.
pub fn default_instruments() -> Vec<InstrumentSpec> {
    use InstrumentKind::*;
    let mut instruments = vec![
        spec("NASDAQ", "NASDAQ", Index, Some("^IXIC"), &["IXIC", "NASDAQ", "NDX"]),
        spec("S&P500", "S&P 500", Index, Some("^GSPC"), &["GSPC", "SPX", "SPX500"]),
        spec("KOSPI", "KOSPI", Index, Some("^KS11"), &["KOSPI", "KS11"]),
        spec("KOSPI100", "KOSPI 100", Index, Some("^KS100"), &["KOSPI100"]),
        spec("KOSDAQ", "KOSDAQ", Index, Some("^KQ11"), &["KOSDAQ", "KQ11"]),
        spec("SET Index", "SET Index", Index, Some("^SET.BK"), &["SET", "SET.BK"]),
        spec("SET50", "SET50", Index, Some("^SET50.BK"), &["SET50"]),
        spec("BTC/USD", "BTC/USD", Crypto, Some("BTC-USD"), &["BTC/USD", "BTCUSD"]),
        spec("BTC/KRW", "BTC/KRW", Crypto, Some("BTC-KRW"), &["BTC/KRW", "BTCKRW"]),
        spec("DXY", "Dollar Index", Index, Some("DX-Y.NYB"), &["DXY", "DX"]),
        spec("USD/JPY", "USD/JPY", Fx, Some("JPY=X"), &["USD/JPY", "USDJPY"]),
        spec("USD/KRW", "USD/KRW", Fx, Some("KRW=X"), &["USD/KRW", "USDKRW"]),
        spec("USD/THB", "USD/THB", Fx, Some("THB=X"), &["USD/THB", "USDTHB"]),
    ];
    instruments.push(InstrumentSpec {
        key: "THB/KRW".to_string(),
        label: "THB/KRW".to_string(),
        kind: Derived,
        symbol: None,
        aliases: Vec::new(),
        numerator: Some("USD/KRW".to_string()),
        denominator: Some("USD/THB".to_string()),
    });
    instruments
}
