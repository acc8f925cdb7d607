use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Company financials for a single fiscal period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
    pub symbol: String,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    pub eps: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
    pub cash_flow_operating: Option<f64>,
    pub cash_flow_investing: Option<f64>,
}

/// Accepts any JSON value for a numeric field. Anything that is not a finite
/// number (null, "N/A", booleans, NaN) is read as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

/// A ticker that is null or not a string reads as empty, the same as a
/// missing key, so evaluation rejects it as invalid input.
fn lenient_ticker<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string).unwrap_or_default())
}

/// Point-in-time bundle of a ticker's financial metrics.
///
/// Every numeric field is optional. `None` covers both "not reported" and
/// "reported but not a real number"; a present `0.0` is a real value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    #[serde(default, deserialize_with = "lenient_ticker")]
    pub ticker: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pe_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pb_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub de_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub free_cash_flow: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub beta: Option<f64>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl FinancialSnapshot {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn with_pe_ratio(mut self, value: Option<f64>) -> Self {
        self.pe_ratio = finite(value);
        self
    }

    pub fn with_pb_ratio(mut self, value: Option<f64>) -> Self {
        self.pb_ratio = finite(value);
        self
    }

    pub fn with_de_ratio(mut self, value: Option<f64>) -> Self {
        self.de_ratio = finite(value);
        self
    }

    pub fn with_free_cash_flow(mut self, value: Option<f64>) -> Self {
        self.free_cash_flow = finite(value);
        self
    }

    pub fn with_market_cap(mut self, value: Option<f64>) -> Self {
        self.market_cap = finite(value);
        self
    }

    pub fn with_fifty_two_week_range(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.fifty_two_week_low = finite(low);
        self.fifty_two_week_high = finite(high);
        self
    }

    pub fn with_current_price(mut self, value: Option<f64>) -> Self {
        self.current_price = finite(value);
        self
    }

    pub fn with_beta(mut self, value: Option<f64>) -> Self {
        self.beta = finite(value);
        self
    }
}

/// Peer-industry reference values shown beside each metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryBenchmark {
    pub pe_benchmark: f64,
    pub pb_benchmark: f64,
    pub de_benchmark: f64,
    /// Free cash flow is compared qualitatively, so this is a label.
    pub fcf_qualitative_benchmark: String,
}

impl Default for IndustryBenchmark {
    fn default() -> Self {
        Self {
            pe_benchmark: 20.0,
            pb_benchmark: 3.0,
            de_benchmark: 1.0,
            fcf_qualitative_benchmark: "Positive".to_string(),
        }
    }
}

/// Discrete per-metric recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

/// The four metrics a recommendation report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "P/E Ratio")]
    PeRatio,
    #[serde(rename = "P/B Ratio")]
    PbRatio,
    #[serde(rename = "D/E Ratio")]
    DeRatio,
    #[serde(rename = "Free Cash Flow")]
    FreeCashFlow,
}

impl MetricKind {
    /// Report row order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::PeRatio,
        MetricKind::PbRatio,
        MetricKind::DeRatio,
        MetricKind::FreeCashFlow,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::PeRatio => "P/E Ratio",
            MetricKind::PbRatio => "P/B Ratio",
            MetricKind::DeRatio => "D/E Ratio",
            MetricKind::FreeCashFlow => "Free Cash Flow",
        }
    }

    /// The snapshot field this metric reads.
    pub fn value_in(&self, snapshot: &FinancialSnapshot) -> Option<f64> {
        let raw = match self {
            MetricKind::PeRatio => snapshot.pe_ratio,
            MetricKind::PbRatio => snapshot.pb_ratio,
            MetricKind::DeRatio => snapshot.de_ratio,
            MetricKind::FreeCashFlow => snapshot.free_cash_flow,
        };
        finite(raw)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One row of the recommendation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAssessment {
    #[serde(rename = "metricName")]
    pub metric: MetricKind,
    pub current_value_display: String,
    pub industry_value_display: String,
    pub explanation: String,
    pub pros: String,
    pub cons: String,
    pub recommendation: Recommendation,
}

/// Recommendation table for one ticker, rows always in `MetricKind::ALL` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub ticker: String,
    pub rows: [MetricAssessment; 4],
}

impl RecommendationReport {
    pub fn row(&self, metric: MetricKind) -> &MetricAssessment {
        // rows are built from MetricKind::ALL, so the position is fixed
        let idx = MetricKind::ALL
            .iter()
            .position(|m| *m == metric)
            .unwrap_or_default();
        &self.rows[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricAssessment> {
        self.rows.iter()
    }
}

/// Label/value row of the key-statistics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistic {
    pub label: String,
    pub value: String,
}

/// Everything the fundamental view renders for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalAnalysis {
    pub ticker: String,
    pub key_statistics: Vec<KeyStatistic>,
    pub report: RecommendationReport,
}

/// Analysis mode chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Technical,
    #[default]
    Fundamental,
}

impl FromStr for AnalysisMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical" | "technical analysis" => Ok(AnalysisMode::Technical),
            "fundamental" | "fundamental analysis" => Ok(AnalysisMode::Fundamental),
            other => Err(AnalysisError::InvalidInput(format!(
                "Unknown analysis mode: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_non_numeric_fields_are_absent() {
        let snapshot: FinancialSnapshot = serde_json::from_str(
            r#"{
                "ticker": "AAPL",
                "peRatio": "N/A",
                "pbRatio": null,
                "deRatio": true,
                "freeCashFlow": 1500000.0,
                "beta": "Infinity"
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.ticker, "AAPL");
        assert_eq!(snapshot.pe_ratio, None);
        assert_eq!(snapshot.pb_ratio, None);
        assert_eq!(snapshot.de_ratio, None);
        assert_eq!(snapshot.free_cash_flow, Some(1_500_000.0));
        assert_eq!(snapshot.beta, None);
        // missing keys
        assert_eq!(snapshot.market_cap, None);
        assert_eq!(snapshot.current_price, None);
    }

    #[test]
    fn test_snapshot_zero_is_not_absent() {
        let snapshot: FinancialSnapshot =
            serde_json::from_str(r#"{"ticker": "X", "freeCashFlow": 0}"#).unwrap();
        assert_eq!(snapshot.free_cash_flow, Some(0.0));
    }

    #[test]
    fn test_snapshot_missing_ticker_defaults_to_empty() {
        let snapshot: FinancialSnapshot = serde_json::from_str(r#"{"peRatio": 12.0}"#).unwrap();
        assert!(snapshot.ticker.is_empty());
        assert_eq!(snapshot.pe_ratio, Some(12.0));
    }

    #[test]
    fn test_snapshot_null_or_numeric_ticker_reads_as_empty() {
        for body in [r#"{"ticker": null, "peRatio": 10}"#, r#"{"ticker": 42}"#] {
            let snapshot: FinancialSnapshot = serde_json::from_str(body).unwrap();
            assert!(snapshot.ticker.is_empty(), "{}", body);
        }
    }

    #[test]
    fn test_builder_drops_non_finite_values() {
        let snapshot = FinancialSnapshot::new("MSFT")
            .with_pe_ratio(Some(f64::NAN))
            .with_pb_ratio(Some(2.0))
            .with_beta(Some(f64::INFINITY));
        assert_eq!(snapshot.pe_ratio, None);
        assert_eq!(snapshot.pb_ratio, Some(2.0));
        assert_eq!(snapshot.beta, None);
    }

    #[test]
    fn test_metric_value_ignores_nan_set_directly() {
        let mut snapshot = FinancialSnapshot::new("T");
        snapshot.de_ratio = Some(f64::NAN);
        assert_eq!(MetricKind::DeRatio.value_in(&snapshot), None);
    }

    #[test]
    fn test_metric_kind_serializes_as_display_name() {
        let json = serde_json::to_string(&MetricKind::FreeCashFlow).unwrap();
        assert_eq!(json, "\"Free Cash Flow\"");
        for kind in MetricKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str(), Some(kind.display_name()));
        }
    }

    #[test]
    fn test_analysis_mode_parsing() {
        assert_eq!("technical".parse::<AnalysisMode>().unwrap(), AnalysisMode::Technical);
        assert_eq!(
            "Fundamental Analysis".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::Fundamental
        );
        assert_eq!(" FUNDAMENTAL ".parse::<AnalysisMode>().unwrap(), AnalysisMode::Fundamental);
        assert!(matches!(
            "astrology".parse::<AnalysisMode>(),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_default_benchmark() {
        let benchmark = IndustryBenchmark::default();
        assert_eq!(benchmark.pe_benchmark, 20.0);
        assert_eq!(benchmark.fcf_qualitative_benchmark, "Positive");
    }
}
