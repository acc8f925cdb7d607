//! Fixed descriptive text shown beside each metric.

use analysis_core::MetricKind;

pub struct MetricDescription {
    pub explanation: &'static str,
    pub pros: &'static str,
    pub cons: &'static str,
}

pub fn describe(metric: MetricKind) -> MetricDescription {
    match metric {
        MetricKind::PeRatio => MetricDescription {
            explanation: "Price-to-Earnings ratio: share price divided by trailing earnings per share.",
            pros: "A low P/E can indicate the stock is cheap relative to its earnings.",
            cons: "Ignores growth; a low P/E may reflect falling or one-off earnings.",
        },
        MetricKind::PbRatio => MetricDescription {
            explanation: "Price-to-Book ratio: share price divided by book value per share.",
            pros: "A low P/B suggests the market values the company near its net assets.",
            cons: "Book value understates asset-light and intangible-heavy businesses.",
        },
        MetricKind::DeRatio => MetricDescription {
            explanation: "Debt-to-Equity ratio: total debt divided by shareholders' equity.",
            pros: "A low D/E means lower leverage and less financial risk.",
            cons: "Some debt can boost returns; norms vary widely across industries.",
        },
        MetricKind::FreeCashFlow => MetricDescription {
            explanation: "Free Cash Flow: operating cash flow minus capital expenditures.",
            pros: "Positive FCF shows the business can fund itself, pay dividends, or cut debt.",
            cons: "Can swing with the timing of large investments; one period says little.",
        },
    }
}
