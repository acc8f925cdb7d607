use analysis_core::{AnalysisError, Bar, FinancialSnapshot, Financials, SnapshotProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod snapshot;

pub use snapshot::{build_snapshot, ProviderData};

const BASE_URL: &str = "https://api.polygon.io";

/// Pause before retrying a request Polygon answered with 429.
const RATE_LIMIT_RETRY_WAIT: Duration = Duration::from_secs(15);

/// Index the beta estimate is measured against.
pub const MARKET_INDEX_SYMBOL: &str = "SPY";

/// Default request budget for the Starter plan. Free tier users should use 5.
pub const DEFAULT_RATE_LIMIT: usize = 500;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front().copied() {
                Some(oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).saturating_duration_since(now)
                + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Polygon API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    retry_wait: Duration,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        Self::with_rate_limit(api_key, DEFAULT_RATE_LIMIT)
    }

    /// `requests_per_minute` is clamped to at least one.
    pub fn with_rate_limit(api_key: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
            retry_wait: RATE_LIMIT_RETRY_WAIT,
        }
    }

    /// Point the client at another host, e.g. a proxy or a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            tracing::warn!(
                "Polygon 429 rate limited, waiting {:.1}s before retry {}/3",
                self.retry_wait.as_secs_f64(),
                attempt + 1
            );
            tokio::time::sleep(self.retry_wait).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Polygon after 3 retries".to_string()))
    }

    async fn http_error(context: &str, response: reqwest::Response) -> AnalysisError {
        AnalysisError::ApiError(format!(
            "{}HTTP {}: {}",
            context,
            response.status(),
            response.text().await.unwrap_or_default()
        ))
    }

    /// Get aggregates (bars) for a symbol
    pub async fn get_aggregates(
        &self,
        symbol: &str,
        multiplier: u32,
        timespan: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("limit", "50000"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error("Aggregates ", response).await);
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(agg_response
            .results
            .into_iter()
            .filter_map(|r| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp_millis(r.t)?,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect())
    }

    /// Get quarterly company financials, newest first.
    ///
    /// Returns an empty list when the plan does not include financials (401/403).
    pub async fn get_financials(&self, symbol: &str) -> Result<Vec<Financials>, AnalysisError> {
        let url = format!("{}/vX/reference/financials", self.base_url);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("ticker", symbol),
                ("timeframe", "quarterly"),
                ("order", "desc"),
                ("sort", "filing_date"),
                ("apiKey", self.api_key.as_str()),
                ("limit", "8"),
            ]))
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
                tracing::warn!("Financials not available for {} on this plan ({})", symbol, status);
                return Ok(Vec::new());
            }
            return Err(Self::http_error("Financials ", response).await);
        }

        let fin_response: FinancialsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(fin_response
            .results
            .into_iter()
            .map(|r| {
                let income = &r.financials.income_statement;
                let balance = &r.financials.balance_sheet;
                let cash_flow = &r.financials.cash_flow_statement;

                Financials {
                    symbol: symbol.to_string(),
                    fiscal_period: r.fiscal_period,
                    fiscal_year: r.fiscal_year.parse().unwrap_or(0),
                    eps: statement_value(income, "basic_earnings_per_share"),
                    total_liabilities: statement_value(balance, "liabilities"),
                    shareholders_equity: statement_value(balance, "equity"),
                    cash_flow_operating: statement_value(cash_flow, "net_cash_flow_from_operating_activities"),
                    cash_flow_investing: statement_value(cash_flow, "net_cash_flow_from_investing_activities"),
                }
            })
            .collect())
    }

    /// Get ticker details
    pub async fn get_ticker_details(&self, symbol: &str) -> Result<TickerDetails, AnalysisError> {
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, symbol);

        let response = self
            .send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error("Ticker details ", response).await);
        }

        let details_response: TickerDetailsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(details_response.results)
    }

    /// Get snapshot for a ticker (near-real-time last trade, today's OHLCV, prev day)
    pub async fn get_snapshot(&self, symbol: &str) -> Result<SnapshotTicker, AnalysisError> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            self.base_url, symbol
        );

        let response = self
            .send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnalysisError::InvalidInput(format!("Unknown ticker: {}", symbol)));
        }
        if !response.status().is_success() {
            return Err(Self::http_error("Snapshot ", response).await);
        }

        let snap_response: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(snap_response.ticker)
    }

    /// Gather quote, details, financials and a year of daily bars, then derive
    /// the snapshot. Only a failed quote lookup is fatal; every other source
    /// degrades to absent fields.
    pub async fn fetch_financial_snapshot(&self, symbol: &str) -> Result<FinancialSnapshot, AnalysisError> {
        let to = Utc::now();
        let from = to - ChronoDuration::days(365);

        let (quote, details, financials, bars, market_bars) = tokio::join!(
            self.get_snapshot(symbol),
            self.get_ticker_details(symbol),
            self.get_financials(symbol),
            self.get_aggregates(symbol, 1, "day", from, to),
            self.get_aggregates(MARKET_INDEX_SYMBOL, 1, "day", from, to),
        );

        let data = ProviderData {
            quote: Some(quote?),
            details: degrade(symbol, "ticker details", details),
            financials: degrade(symbol, "financials", financials).unwrap_or_default(),
            bars: degrade(symbol, "daily bars", bars).unwrap_or_default(),
            market_bars: degrade(MARKET_INDEX_SYMBOL, "daily bars", market_bars).unwrap_or_default(),
        };

        tracing::debug!(
            symbol,
            quarters = data.financials.len(),
            bars = data.bars.len(),
            "building financial snapshot"
        );

        Ok(build_snapshot(symbol, &data))
    }
}

fn degrade<T>(symbol: &str, what: &str, result: Result<T, AnalysisError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to fetch {} for {}: {}", what, symbol, e);
            None
        }
    }
}

/// Read `statement[key].value`, treating anything non-numeric as absent.
fn statement_value(statement: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
    statement
        .get(key)
        .and_then(|v| v.get("value"))
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
}

#[async_trait]
impl SnapshotProvider for PolygonClient {
    async fn snapshot(&self, symbol: &str) -> Result<FinancialSnapshot, AnalysisError> {
        self.fetch_financial_snapshot(symbol).await
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

#[derive(Debug, Deserialize)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialResult>,
}

#[derive(Debug, Deserialize)]
struct FinancialResult {
    #[serde(default)]
    fiscal_period: String,
    #[serde(default)]
    fiscal_year: String,
    financials: FinancialStatements,
}

#[derive(Debug, Deserialize)]
struct FinancialStatements {
    #[serde(default)]
    income_statement: HashMap<String, serde_json::Value>,
    #[serde(default)]
    balance_sheet: HashMap<String, serde_json::Value>,
    #[serde(default)]
    cash_flow_statement: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub share_class_shares_outstanding: Option<f64>,
    #[serde(default)]
    pub weighted_shares_outstanding: Option<f64>,
}

// Snapshot types
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: SnapshotTicker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTicker {
    pub day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    pub last_trade: Option<SnapshotLastTrade>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<SnapshotDay>,
    #[serde(rename = "todaysChange")]
    pub todays_change: Option<f64>,
    #[serde(rename = "todaysChangePerc")]
    pub todays_change_perc: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastTrade {
    pub p: Option<f64>,
    pub s: Option<i64>,
    pub t: Option<i64>,
}
