//! Display formatting for metric values.
//!
//! Every formatter renders `N/A` for an absent or non-finite value and two
//! decimal places otherwise.

pub const NOT_AVAILABLE: &str = "N/A";

fn render(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => f(v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Two decimal places. Anything that rounds to zero prints unsigned.
fn two_places(v: f64) -> String {
    let text = format!("{:.2}", v);
    if text == "-0.00" {
        "0.00".to_string()
    } else {
        text
    }
}

/// `12.34`
pub fn ratio(value: Option<f64>) -> String {
    render(value, two_places)
}

/// `$189.50`
pub fn currency(value: Option<f64>) -> String {
    render(value, |v| format!("${}", two_places(v)))
}

/// Market cap in billions: `2950.12B`
pub fn billions(value: Option<f64>) -> String {
    render(value, |v| format!("{}B", two_places(v / 1e9)))
}

/// Free cash flow in millions: `1.00M USD`
pub fn millions_usd(value: Option<f64>) -> String {
    render(value, |v| format!("{}M USD", two_places(v / 1e6)))
}

/// `$124.17 - $199.62`, or `N/A` unless both ends are known.
pub fn price_range(low: Option<f64>, high: Option<f64>) -> String {
    let low = low.filter(|v| v.is_finite());
    let high = high.filter(|v| v.is_finite());
    match (low, high) {
        (Some(_), Some(_)) => format!("{} - {}", currency(low), currency(high)),
        _ => NOT_AVAILABLE.to_string(),
    }
}
