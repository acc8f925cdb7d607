//! Threshold table mapping raw metric values to recommendations.
//!
//! Bands are inclusive on the Hold side: a value equal to either edge is
//! Hold, never Buy or Sell. An absent value is always Sell.

use analysis_core::{MetricKind, Recommendation};

/// How a single metric is classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Lower is better. `< buy_below` is Buy, `> sell_above` is Sell,
    /// anything in between (edges included) is Hold.
    Banded { buy_below: f64, sell_above: f64 },
    /// Strictly positive is Buy, everything else is Sell. No Hold tier.
    PositiveOnly,
}

impl Rule {
    pub fn classify(&self, value: Option<f64>) -> Recommendation {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return Recommendation::Sell;
        };
        match *self {
            Rule::Banded { buy_below, sell_above } => {
                if v < buy_below {
                    Recommendation::Buy
                } else if v <= sell_above {
                    Recommendation::Hold
                } else {
                    Recommendation::Sell
                }
            }
            Rule::PositiveOnly => {
                if v > 0.0 {
                    Recommendation::Buy
                } else {
                    Recommendation::Sell
                }
            }
        }
    }
}

pub const RULES: [(MetricKind, Rule); 4] = [
    (MetricKind::PeRatio, rule_for(MetricKind::PeRatio)),
    (MetricKind::PbRatio, rule_for(MetricKind::PbRatio)),
    (MetricKind::DeRatio, rule_for(MetricKind::DeRatio)),
    (MetricKind::FreeCashFlow, rule_for(MetricKind::FreeCashFlow)),
];

pub const fn rule_for(metric: MetricKind) -> Rule {
    match metric {
        MetricKind::PeRatio => Rule::Banded { buy_below: 15.0, sell_above: 25.0 },
        MetricKind::PbRatio => Rule::Banded { buy_below: 1.0, sell_above: 3.0 },
        MetricKind::DeRatio => Rule::Banded { buy_below: 0.5, sell_above: 1.0 },
        MetricKind::FreeCashFlow => Rule::PositiveOnly,
    }
}

pub fn classify(metric: MetricKind, value: Option<f64>) -> Recommendation {
    rule_for(metric).classify(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Recommendation::*;

    fn check(metric: MetricKind, cases: &[(f64, Recommendation)]) {
        for (value, expected) in cases {
            assert_eq!(
                classify(metric, Some(*value)),
                *expected,
                "{} at {}",
                metric,
                value
            );
        }
    }

    #[test]
    fn test_pe_boundaries() {
        check(
            MetricKind::PeRatio,
            &[(14.99, Buy), (15.0, Hold), (25.0, Hold), (25.01, Sell)],
        );
    }

    #[test]
    fn test_pb_boundaries() {
        check(
            MetricKind::PbRatio,
            &[(0.99, Buy), (1.0, Hold), (3.0, Hold), (3.01, Sell)],
        );
    }

    #[test]
    fn test_de_boundaries() {
        check(
            MetricKind::DeRatio,
            &[(0.49, Buy), (0.5, Hold), (1.0, Hold), (1.01, Sell)],
        );
    }

    #[test]
    fn test_fcf_has_no_hold_tier() {
        check(
            MetricKind::FreeCashFlow,
            &[(1_000_000.0, Buy), (0.01, Buy), (0.0, Sell), (-500_000.0, Sell)],
        );
    }

    #[test]
    fn test_absent_is_sell_for_every_metric() {
        for metric in MetricKind::ALL {
            assert_eq!(classify(metric, None), Sell);
            assert_eq!(classify(metric, Some(f64::NAN)), Sell);
        }
    }

    #[test]
    fn test_negative_ratio_is_buy() {
        // the table has no floor; a negative D/E still sits below the Buy edge
        assert_eq!(classify(MetricKind::DeRatio, Some(-0.2)), Buy);
    }

    #[test]
    fn test_table_covers_every_metric_once() {
        for metric in MetricKind::ALL {
            assert_eq!(RULES.iter().filter(|(m, _)| *m == metric).count(), 1);
        }
        let kinds: Vec<MetricKind> = RULES.iter().map(|(m, _)| *m).collect();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
        for (metric, rule) in RULES {
            assert_eq!(rule_for(metric), rule);
        }
        assert_eq!(rule_for(MetricKind::FreeCashFlow), Rule::PositiveOnly);
        assert_eq!(
            rule_for(MetricKind::DeRatio),
            Rule::Banded { buy_below: 0.5, sell_above: 1.0 }
        );
    }
}
