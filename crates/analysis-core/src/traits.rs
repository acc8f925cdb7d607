use async_trait::async_trait;
use crate::{AnalysisError, FinancialSnapshot, IndustryBenchmark, RecommendationReport};

/// Trait for fundamental recommendation engines.
///
/// Evaluation is pure: identical inputs must always produce identical reports.
pub trait FundamentalAnalyzer: Send + Sync {
    fn evaluate(
        &self,
        snapshot: &FinancialSnapshot,
        benchmark: &IndustryBenchmark,
    ) -> Result<RecommendationReport, AnalysisError>;
}

/// Source of point-in-time financial snapshots (market-data provider).
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self, symbol: &str) -> Result<FinancialSnapshot, AnalysisError>;
}

/// Source of peer-industry reference values for a ticker.
pub trait BenchmarkProvider: Send + Sync {
    fn benchmark_for(&self, symbol: &str) -> IndustryBenchmark;
}

/// Every ticker gets the same benchmark.
#[derive(Debug, Clone, Default)]
pub struct StaticBenchmark(pub IndustryBenchmark);

impl BenchmarkProvider for StaticBenchmark {
    fn benchmark_for(&self, _symbol: &str) -> IndustryBenchmark {
        self.0.clone()
    }
}
