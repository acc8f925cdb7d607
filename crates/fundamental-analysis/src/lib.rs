use analysis_core::{
    AnalysisError, FinancialSnapshot, FundamentalAnalyzer, IndustryBenchmark, KeyStatistic,
    MetricAssessment, MetricKind, RecommendationReport,
};

pub mod catalog;
pub mod format;
pub mod rules;

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the four-row recommendation table for a snapshot.
    ///
    /// Missing or malformed metrics never abort evaluation; they show as
    /// `N/A` and classify as Sell. The only error is an empty ticker.
    pub fn evaluate(
        &self,
        snapshot: &FinancialSnapshot,
        benchmark: &IndustryBenchmark,
    ) -> Result<RecommendationReport, AnalysisError> {
        let ticker = snapshot.ticker.trim();
        if ticker.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Ticker symbol must not be empty".to_string(),
            ));
        }

        let rows = MetricKind::ALL.map(|metric| self.assess(ticker, metric, snapshot, benchmark));

        Ok(RecommendationReport {
            ticker: ticker.to_string(),
            rows,
        })
    }

    fn assess(
        &self,
        ticker: &str,
        metric: MetricKind,
        snapshot: &FinancialSnapshot,
        benchmark: &IndustryBenchmark,
    ) -> MetricAssessment {
        let value = metric.value_in(snapshot);
        let recommendation = rules::classify(metric, value);
        let description = catalog::describe(metric);

        let (current_value_display, industry_value_display) = match metric {
            MetricKind::PeRatio => (format::ratio(value), format::ratio(Some(benchmark.pe_benchmark))),
            MetricKind::PbRatio => (format::ratio(value), format::ratio(Some(benchmark.pb_benchmark))),
            MetricKind::DeRatio => (format::ratio(value), format::ratio(Some(benchmark.de_benchmark))),
            MetricKind::FreeCashFlow => (
                format::millions_usd(value),
                qualitative(&benchmark.fcf_qualitative_benchmark),
            ),
        };

        tracing::debug!(
            ticker = %ticker,
            metric = %metric,
            value = ?value,
            recommendation = %recommendation,
            "classified metric"
        );

        MetricAssessment {
            metric,
            current_value_display,
            industry_value_display,
            explanation: description.explanation.to_string(),
            pros: description.pros.to_string(),
            cons: description.cons.to_string(),
            recommendation,
        }
    }
}

fn qualitative(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        format::NOT_AVAILABLE.to_string()
    } else {
        label.to_string()
    }
}

/// Key-statistics table rows, in display order.
pub fn key_statistics(snapshot: &FinancialSnapshot) -> Vec<KeyStatistic> {
    let row = |label: &str, value: String| KeyStatistic {
        label: label.to_string(),
        value,
    };

    vec![
        row("Current Price", format::currency(snapshot.current_price)),
        row("Market Cap", format::billions(snapshot.market_cap)),
        row(
            "52-Week Range",
            format::price_range(snapshot.fifty_two_week_low, snapshot.fifty_two_week_high),
        ),
        row("Beta", format::ratio(snapshot.beta)),
        row("P/E Ratio", format::ratio(snapshot.pe_ratio)),
        row("P/B Ratio", format::ratio(snapshot.pb_ratio)),
        row("D/E Ratio", format::ratio(snapshot.de_ratio)),
        row("Free Cash Flow", format::millions_usd(snapshot.free_cash_flow)),
    ]
}

impl FundamentalAnalyzer for FundamentalAnalysisEngine {
    fn evaluate(
        &self,
        snapshot: &FinancialSnapshot,
        benchmark: &IndustryBenchmark,
    ) -> Result<RecommendationReport, AnalysisError> {
        FundamentalAnalysisEngine::evaluate(self, snapshot, benchmark)
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Recommendation;

    fn full_snapshot() -> FinancialSnapshot {
        FinancialSnapshot::new("AAPL")
            .with_pe_ratio(Some(28.4))
            .with_pb_ratio(Some(0.8))
            .with_de_ratio(Some(0.75))
            .with_free_cash_flow(Some(99_584_000_000.0))
            .with_market_cap(Some(2_950_000_000_000.0))
            .with_fifty_two_week_range(Some(164.08), Some(199.62))
            .with_current_price(Some(189.5))
            .with_beta(Some(1.29))
    }

    #[test]
    fn test_full_snapshot_report() {
        let engine = FundamentalAnalysisEngine::new();
        let report = engine
            .evaluate(&full_snapshot(), &IndustryBenchmark::default())
            .unwrap();

        assert_eq!(report.ticker, "AAPL");

        let pe = report.row(MetricKind::PeRatio);
        assert_eq!(pe.current_value_display, "28.40");
        assert_eq!(pe.industry_value_display, "20.00");
        assert_eq!(pe.recommendation, Recommendation::Sell);

        let pb = report.row(MetricKind::PbRatio);
        assert_eq!(pb.current_value_display, "0.80");
        assert_eq!(pb.industry_value_display, "3.00");
        assert_eq!(pb.recommendation, Recommendation::Buy);

        let de = report.row(MetricKind::DeRatio);
        assert_eq!(de.current_value_display, "0.75");
        assert_eq!(de.recommendation, Recommendation::Hold);

        let fcf = report.row(MetricKind::FreeCashFlow);
        assert_eq!(fcf.current_value_display, "99584.00M USD");
        assert_eq!(fcf.industry_value_display, "Positive");
        assert_eq!(fcf.recommendation, Recommendation::Buy);
    }

    #[test]
    fn test_row_order_is_fixed() {
        let engine = FundamentalAnalysisEngine::new();
        // fields filled in reverse order; JSON key order reversed too
        let snapshot: FinancialSnapshot = serde_json::from_str(
            r#"{"freeCashFlow": 5.0, "deRatio": 0.2, "pbRatio": 2.0, "peRatio": 10.0, "ticker": "IBM"}"#,
        )
        .unwrap();
        let report = engine.evaluate(&snapshot, &IndustryBenchmark::default()).unwrap();

        let order: Vec<MetricKind> = report.iter().map(|r| r.metric).collect();
        assert_eq!(order, MetricKind::ALL.to_vec());
    }

    #[test]
    fn test_empty_snapshot_is_all_sell_and_na() {
        let engine = FundamentalAnalysisEngine::new();
        let report = engine
            .evaluate(&FinancialSnapshot::new("ZZZZ"), &IndustryBenchmark::default())
            .unwrap();

        for row in report.iter() {
            assert_eq!(row.current_value_display, "N/A", "{}", row.metric);
            assert_eq!(row.recommendation, Recommendation::Sell, "{}", row.metric);
        }
    }

    #[test]
    fn test_fcf_display_and_classification() {
        let engine = FundamentalAnalysisEngine::new();
        let benchmark = IndustryBenchmark::default();
        let cases = [
            (1_000_000.0, "1.00M USD", Recommendation::Buy),
            (0.0, "0.00M USD", Recommendation::Sell),
            (-500_000.0, "-0.50M USD", Recommendation::Sell),
        ];
        for (value, display, expected) in cases {
            let snapshot = FinancialSnapshot::new("F").with_free_cash_flow(Some(value));
            let report = engine.evaluate(&snapshot, &benchmark).unwrap();
            let row = report.row(MetricKind::FreeCashFlow);
            assert_eq!(row.current_value_display, display);
            assert_eq!(row.recommendation, expected);
        }
    }

    #[test]
    fn test_empty_ticker_is_invalid_input() {
        let engine = FundamentalAnalysisEngine::new();
        let benchmark = IndustryBenchmark::default();

        let result = engine.evaluate(&FinancialSnapshot::new(""), &benchmark);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));

        let result = engine.evaluate(&FinancialSnapshot::new("   "), &benchmark);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_field_treated_as_absent() {
        let engine = FundamentalAnalysisEngine::new();
        let snapshot: FinancialSnapshot = serde_json::from_str(
            r#"{"ticker": "GE", "peRatio": "not available", "pbRatio": 0.5}"#,
        )
        .unwrap();
        let report = engine.evaluate(&snapshot, &IndustryBenchmark::default()).unwrap();

        let pe = report.row(MetricKind::PeRatio);
        assert_eq!(pe.current_value_display, "N/A");
        assert_eq!(pe.recommendation, Recommendation::Sell);
        // other metrics unaffected
        assert_eq!(report.row(MetricKind::PbRatio).recommendation, Recommendation::Buy);
    }

    #[test]
    fn test_nan_assigned_directly_is_absent() {
        let engine = FundamentalAnalysisEngine::new();
        let mut snapshot = FinancialSnapshot::new("NAN");
        snapshot.pe_ratio = Some(f64::NAN);
        let report = engine.evaluate(&snapshot, &IndustryBenchmark::default()).unwrap();
        let pe = report.row(MetricKind::PeRatio);
        assert_eq!(pe.current_value_display, "N/A");
        assert_eq!(pe.recommendation, Recommendation::Sell);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let engine = FundamentalAnalysisEngine::new();
        let snapshot = full_snapshot();
        let benchmark = IndustryBenchmark::default();
        let first = engine.evaluate(&snapshot, &benchmark).unwrap();
        let second = engine.evaluate(&snapshot, &benchmark).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_injected_benchmark_is_displayed() {
        let engine = FundamentalAnalysisEngine::new();
        let benchmark = IndustryBenchmark {
            pe_benchmark: 31.456,
            pb_benchmark: 7.0,
            de_benchmark: 0.35,
            fcf_qualitative_benchmark: "Negative".to_string(),
        };
        let report = engine.evaluate(&full_snapshot(), &benchmark).unwrap();

        assert_eq!(report.row(MetricKind::PeRatio).industry_value_display, "31.46");
        assert_eq!(report.row(MetricKind::PbRatio).industry_value_display, "7.00");
        assert_eq!(report.row(MetricKind::DeRatio).industry_value_display, "0.35");
        assert_eq!(report.row(MetricKind::FreeCashFlow).industry_value_display, "Negative");
        // thresholds do not move with the benchmark
        assert_eq!(report.row(MetricKind::PeRatio).recommendation, Recommendation::Sell);
    }

    #[test]
    fn test_catalog_text_is_populated() {
        let engine = FundamentalAnalysisEngine::new();
        let report = engine
            .evaluate(&full_snapshot(), &IndustryBenchmark::default())
            .unwrap();
        for row in report.iter() {
            assert!(!row.explanation.is_empty());
            assert!(!row.pros.is_empty());
            assert!(!row.cons.is_empty());
        }
    }

    #[test]
    fn test_report_serializes_table_columns() {
        let engine = FundamentalAnalysisEngine::new();
        let report = engine
            .evaluate(&full_snapshot(), &IndustryBenchmark::default())
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let first = &json["rows"][0];
        assert_eq!(first["metricName"], "P/E Ratio");
        assert_eq!(first["currentValueDisplay"], "28.40");
        assert_eq!(first["industryValueDisplay"], "20.00");
        assert_eq!(first["recommendation"], "Sell");
    }

    #[test]
    fn test_key_statistics() {
        let stats = key_statistics(&full_snapshot());
        let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Current Price",
                "Market Cap",
                "52-Week Range",
                "Beta",
                "P/E Ratio",
                "P/B Ratio",
                "D/E Ratio",
                "Free Cash Flow",
            ]
        );
        assert_eq!(stats[0].value, "$189.50");
        assert_eq!(stats[1].value, "2950.00B");
        assert_eq!(stats[2].value, "$164.08 - $199.62");
        assert_eq!(stats[3].value, "1.29");
        assert_eq!(stats[7].value, "99584.00M USD");
    }

    #[test]
    fn test_key_statistics_partial_range() {
        let snapshot = FinancialSnapshot::new("X").with_fifty_two_week_range(Some(10.0), None);
        let stats = key_statistics(&snapshot);
        assert_eq!(stats[2].value, "N/A");
        assert!(stats.iter().all(|s| s.value == "N/A"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_padded_ticker_is_trimmed_in_report_and_logs() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let snapshot = FinancialSnapshot::new("  AAPL ").with_pe_ratio(Some(10.0));
        let report = tracing::subscriber::with_default(subscriber, || {
            FundamentalAnalysisEngine::new()
                .evaluate(&snapshot, &IndustryBenchmark::default())
                .unwrap()
        });
        assert_eq!(report.ticker, "AAPL");

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("ticker=AAPL ").count(), 4);
        assert!(!output.contains("ticker=  AAPL"));
    }
}
