//! Static content pages (home, glossary, news, about).

use axum::{extract::Path, routing::get, Json, Router};
use serde::Serialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub slug: &'static str,
    pub title: &'static str,
    pub body: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub slug: &'static str,
    pub title: &'static str,
}

pub const PAGES: &[Page] = &[
    Page {
        slug: "home",
        title: "Stock Analysis Application",
        body: "\
Analyze stocks using **technical analysis** and **fundamental analysis**.

### What is Technical Analysis?
- Examines historical price charts, trends, and patterns.
- Uses tools like moving averages, RSI, and MACD to identify trading opportunities.

### What is Fundamental Analysis?
- Evaluates financial health, earnings, and company metrics.
- Focuses on valuation, growth prospects, and business fundamentals.

Enter a stock ticker and select the type of analysis to proceed.",
    },
    Page {
        slug: "glossary",
        title: "Glossary of Terms",
        body: "\
### Key Terms for Stock Analysis
- **EPS (Earnings Per Share)**: net income divided by shares outstanding; a measure of profitability.
- **P/E Ratio (Price-to-Earnings)**: stock price divided by per-share earnings.
- **P/B Ratio (Price-to-Book)**: stock price divided by per-share book value.
- **D/E Ratio (Debt-to-Equity)**: total debt divided by shareholder equity.
- **FCF (Free Cash Flow)**: operating cash flow minus capital expenditures.
- **Beta**: sensitivity of a stock's returns to moves in the overall market.
- **RSI (Relative Strength Index)**: a momentum indicator used in technical analysis.
- **MACD (Moving Average Convergence Divergence)**: used to identify trends and reversals.",
    },
    Page {
        slug: "news",
        title: "Market News",
        body: "\
### Latest Stock Market News
News integration is not available yet.",
    },
    Page {
        slug: "about",
        title: "About",
        body: "\
### About This Application
This Stock Analysis Application was developed to simplify stock research and help you make informed investment decisions. \
Recommendations are rule-based heuristics, not investment advice.",
    },
];

pub fn find_page(slug: &str) -> Option<&'static Page> {
    let slug = slug.trim().to_lowercase();
    PAGES.iter().find(|p| p.slug == slug)
}

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pages", get(list_pages))
        .route("/api/pages/:slug", get(get_page))
}

async fn list_pages() -> Json<ApiResponse<Vec<PageSummary>>> {
    let pages = PAGES
        .iter()
        .map(|p| PageSummary {
            slug: p.slug,
            title: p.title,
        })
        .collect();
    Json(ApiResponse::success(pages))
}

async fn get_page(Path(slug): Path<String>) -> Result<Json<ApiResponse<Page>>, AppError> {
    find_page(&slug)
        .cloned()
        .map(|page| Json(ApiResponse::success(page)))
        .ok_or(AppError::NotFound(format!("page '{}'", slug)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get;
    use axum::http::StatusCode;

    #[test]
    fn test_find_page_is_case_insensitive() {
        assert_eq!(find_page("Glossary").map(|p| p.slug), Some("glossary"));
        assert!(find_page("settings").is_none());
    }

    #[tokio::test]
    async fn test_list_pages() {
        let (status, body) = get("/api/pages").await;
        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["home", "glossary", "news", "about"]);
    }

    #[tokio::test]
    async fn test_get_page() {
        let (status, body) = get("/api/pages/glossary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Glossary of Terms");
        assert!(body["data"]["body"].as_str().unwrap().contains("P/E Ratio"));
    }

    #[tokio::test]
    async fn test_unknown_page_is_404() {
        let (status, body) = get("/api/pages/settings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
