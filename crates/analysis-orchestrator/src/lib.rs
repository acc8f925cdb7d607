use analysis_core::{
    AnalysisError, AnalysisMode, BenchmarkProvider, FinancialSnapshot, FundamentalAnalysis,
    FundamentalAnalyzer, IndustryBenchmark, RecommendationReport, SnapshotProvider, StaticBenchmark,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fundamental_analysis::{key_statistics, FundamentalAnalysisEngine};
use polygon_client::PolygonClient;
use std::sync::Arc;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300; // 5 minutes

pub struct AnalysisOrchestrator {
    provider: Arc<dyn SnapshotProvider>,
    benchmarks: Arc<dyn BenchmarkProvider>,
    fundamental_analyzer: Arc<dyn FundamentalAnalyzer>,
    /// Cache snapshots per upper-case symbol
    snapshot_cache: DashMap<String, CacheEntry<FinancialSnapshot>>,
    cache_ttl_secs: i64,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn SnapshotProvider>) -> Self {
        Self {
            provider,
            benchmarks: Arc::new(StaticBenchmark::default()),
            fundamental_analyzer: Arc::new(FundamentalAnalysisEngine::new()),
            snapshot_cache: DashMap::new(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }

    pub fn from_polygon(client: PolygonClient) -> Self {
        Self::new(Arc::new(client))
    }

    pub fn with_benchmarks(mut self, benchmarks: Arc<dyn BenchmarkProvider>) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn FundamentalAnalyzer>) -> Self {
        self.fundamental_analyzer = analyzer;
        self
    }

    /// A TTL of zero disables caching.
    pub fn with_cache_ttl(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = secs.max(0);
        self
    }

    /// Run the analysis the user picked for a ticker.
    pub async fn analyze(
        &self,
        symbol: &str,
        mode: AnalysisMode,
    ) -> Result<FundamentalAnalysis, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;

        match mode {
            AnalysisMode::Technical => Err(AnalysisError::NotImplemented(format!(
                "Technical analysis for {} is not available yet",
                symbol
            ))),
            AnalysisMode::Fundamental => {
                tracing::info!("Running fundamental analysis for {}", symbol);
                let snapshot = self.get_snapshot(&symbol).await?;
                let benchmark = self.benchmarks.benchmark_for(&symbol);
                let report = self.fundamental_analyzer.evaluate(&snapshot, &benchmark)?;

                Ok(FundamentalAnalysis {
                    ticker: symbol,
                    key_statistics: key_statistics(&snapshot),
                    report,
                })
            }
        }
    }

    /// Evaluate a caller-supplied snapshot without touching the provider.
    pub fn evaluate(
        &self,
        snapshot: &FinancialSnapshot,
        benchmark: Option<&IndustryBenchmark>,
    ) -> Result<RecommendationReport, AnalysisError> {
        match benchmark {
            Some(b) => self.fundamental_analyzer.evaluate(snapshot, b),
            None => {
                let b = self.benchmarks.benchmark_for(snapshot.ticker.trim());
                self.fundamental_analyzer.evaluate(snapshot, &b)
            }
        }
    }

    /// Get a financial snapshot (cached). Failed lookups are not cached.
    pub async fn get_snapshot(&self, symbol: &str) -> Result<FinancialSnapshot, AnalysisError> {
        let cache_key = normalize_symbol(symbol)?;
        if let Some(entry) = self.snapshot_cache.get(&cache_key) {
            let age = (Utc::now() - entry.cached_at).num_seconds();
            if age < self.cache_ttl_secs {
                tracing::debug!("Snapshot cache hit for {} (age {}s)", cache_key, age);
                return Ok(entry.data.clone());
            }
        }

        let snapshot = self.provider.snapshot(&cache_key).await?;

        if self.cache_ttl_secs > 0 {
            self.snapshot_cache.insert(
                cache_key,
                CacheEntry {
                    data: snapshot.clone(),
                    cached_at: Utc::now(),
                },
            );
        }

        Ok(snapshot)
    }
}

/// Trim and upper-case a ticker; blank input is rejected.
pub fn normalize_symbol(symbol: &str) -> Result<String, AnalysisError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Please enter a stock ticker".to_string(),
        ));
    }
    Ok(symbol.to_uppercase())
}
