//! Derives a `FinancialSnapshot` from raw Polygon payloads.
//!
//! Everything here is synchronous and side-effect free; the client only
//! gathers the inputs.

use analysis_core::{Bar, FinancialSnapshot, Financials};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::{SnapshotTicker, TickerDetails};

/// Aligned daily returns needed before a beta estimate is reported.
pub const MIN_BETA_OBSERVATIONS: usize = 20;

/// Raw provider payloads for one ticker. Any piece may be missing.
#[derive(Debug, Clone, Default)]
pub struct ProviderData {
    pub quote: Option<SnapshotTicker>,
    pub details: Option<TickerDetails>,
    /// Quarterly statements, newest first.
    pub financials: Vec<Financials>,
    /// Daily bars for the ticker over the trailing year.
    pub bars: Vec<Bar>,
    /// Daily bars for the market index over the same window.
    pub market_bars: Vec<Bar>,
}

pub fn build_snapshot(symbol: &str, data: &ProviderData) -> FinancialSnapshot {
    let price = data.quote.as_ref().and_then(current_price);

    // Flow metrics: trailing twelve months. Balance sheet: latest quarter.
    let ttm_slice = &data.financials[..data.financials.len().min(4)];
    let ttm_eps = sum_ttm(ttm_slice, |f| f.eps);
    let ttm_ocf = sum_ttm(ttm_slice, |f| f.cash_flow_operating);
    let ttm_cfi = sum_ttm(ttm_slice, |f| f.cash_flow_investing);

    let latest = data.financials.first();
    let equity = latest.and_then(|f| f.shareholders_equity);
    let liabilities = latest.and_then(|f| f.total_liabilities);

    let market_cap = data.details.as_ref().and_then(|d| {
        d.market_cap.or_else(|| {
            let shares = d
                .share_class_shares_outstanding
                .or(d.weighted_shares_outstanding)?;
            Some(price? * shares)
        })
    });

    let (low, high) = fifty_two_week_range(&data.bars);

    FinancialSnapshot::new(symbol)
        .with_current_price(price)
        .with_pe_ratio(pe_ratio(price, ttm_eps))
        .with_pb_ratio(pb_ratio(market_cap, equity))
        .with_de_ratio(de_ratio(liabilities, equity))
        .with_free_cash_flow(free_cash_flow(ttm_ocf, ttm_cfi))
        .with_market_cap(market_cap)
        .with_fifty_two_week_range(low, high)
        .with_beta(beta(&data.bars, &data.market_bars))
}

/// Today's close, else the last trade, else yesterday's close.
pub fn current_price(quote: &SnapshotTicker) -> Option<f64> {
    let positive = |v: Option<f64>| v.filter(|p| *p > 0.0);
    positive(quote.day.as_ref().and_then(|d| d.c))
        .or_else(|| positive(quote.last_trade.as_ref().and_then(|t| t.p)))
        .or_else(|| positive(quote.prev_day.as_ref().and_then(|d| d.c)))
}

/// Sum an optional field across quarters, `None` if no quarter reports it.
pub fn sum_ttm(quarters: &[Financials], accessor: fn(&Financials) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = quarters.iter().filter_map(accessor).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

/// Undefined for zero or negative earnings.
pub fn pe_ratio(price: Option<f64>, ttm_eps: Option<f64>) -> Option<f64> {
    match (price, ttm_eps) {
        (Some(p), Some(eps)) if eps > 0.0 => Some(p / eps),
        _ => None,
    }
}

pub fn pb_ratio(market_cap: Option<f64>, equity: Option<f64>) -> Option<f64> {
    match (market_cap, equity) {
        (Some(cap), Some(eq)) if eq > 0.0 => Some(cap / eq),
        _ => None,
    }
}

/// Total liabilities stand in for debt; Polygon does not split out borrowings.
pub fn de_ratio(liabilities: Option<f64>, equity: Option<f64>) -> Option<f64> {
    match (liabilities, equity) {
        (Some(l), Some(eq)) if eq > 0.0 => Some(l / eq),
        _ => None,
    }
}

/// Operating cash flow plus investing cash flow (capex proxy, includes acquisitions).
pub fn free_cash_flow(ttm_ocf: Option<f64>, ttm_cfi: Option<f64>) -> Option<f64> {
    Some(ttm_ocf? + ttm_cfi?)
}

pub fn fifty_two_week_range(bars: &[Bar]) -> (Option<f64>, Option<f64>) {
    let low = bars
        .iter()
        .map(|b| b.low)
        .filter(|v| v.is_finite() && *v > 0.0)
        .reduce(f64::min);
    let high = bars
        .iter()
        .map(|b| b.high)
        .filter(|v| v.is_finite() && *v > 0.0)
        .reduce(f64::max);
    (low, high)
}

/// Beta of the ticker against the market index from date-aligned daily closes.
pub fn beta(bars: &[Bar], market_bars: &[Bar]) -> Option<f64> {
    let market: BTreeMap<NaiveDate, f64> = market_bars
        .iter()
        .map(|b| (b.timestamp.date_naive(), b.close))
        .collect();

    let aligned: BTreeMap<NaiveDate, (f64, f64)> = bars
        .iter()
        .filter_map(|b| {
            let date = b.timestamp.date_naive();
            market.get(&date).map(|m| (date, (b.close, *m)))
        })
        .collect();

    let closes: Vec<(f64, f64)> = aligned.into_values().collect();
    let (stock_returns, market_returns): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .filter(|w| w[0].0 > 0.0 && w[0].1 > 0.0)
        .map(|w| ((w[1].0 - w[0].0) / w[0].0, (w[1].1 - w[0].1) / w[0].1))
        .unzip();

    if stock_returns.len() < MIN_BETA_OBSERVATIONS {
        return None;
    }

    let n = stock_returns.len() as f64;
    let stock_mean = stock_returns.iter().sum::<f64>() / n;
    let market_mean = market_returns.iter().sum::<f64>() / n;

    let covariance = stock_returns
        .iter()
        .zip(&market_returns)
        .map(|(s, m)| (s - stock_mean) * (m - market_mean))
        .sum::<f64>()
        / (n - 1.0);
    let variance = market_returns
        .iter()
        .map(|m| (m - market_mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);

    if variance < f64::EPSILON {
        return None;
    }
    Some(covariance / variance)
}
