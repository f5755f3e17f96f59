//! Trend scoring: three signals combined into a 0-100 score.
//!
//! The score is a pure function of the value series; identical input yields
//! identical output. Weights: growth 50%, slope 30%, recent peak 20%.

use crate::models::{SeriesPoint, Signals};

/// Scored outcome for one series: the combined score, the raw signals
/// (rounded for presentation), and four explanation lines.
#[derive(Debug, Clone)]
pub struct Scoring {
    pub trend_score: f64,
    pub signals: Signals,
    pub explain: Vec<String>,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn last_n(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// `avg(last 7) / avg(last 30)`. Neutral 1.0 when a window is empty or the
/// 30-window average is zero.
fn growth_7_vs_30(values: &[f64]) -> f64 {
    let last_7 = last_n(values, 7);
    let last_30 = last_n(values, 30);

    if last_7.is_empty() || last_30.is_empty() {
        return 1.0;
    }

    let avg_30 = average(last_30);
    if avg_30 > 0.0 {
        average(last_7) / avg_30
    } else {
        1.0
    }
}

/// Least-squares slope of the last 14 values against indices 0..n-1,
/// divided by the window mean so the result is scale-free. Zero with fewer
/// than two points, a zero mean, or a zero denominator.
fn slope_14d(values: &[f64]) -> f64 {
    let last_14 = last_n(values, 14);
    if last_14.len() < 2 {
        return 0.0;
    }

    let n = last_14.len();
    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = average(last_14);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in last_14.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    if denominator == 0.0 || mean_y == 0.0 {
        return 0.0;
    }

    (numerator / denominator) / mean_y
}

/// `max(last 30) / 100`. Zero when empty.
fn recent_peak_30d(values: &[f64]) -> f64 {
    let last_30 = last_n(values, 30);
    last_30.iter().copied().fold(0.0, f64::max) / 100.0
}

/// Combines raw signals into the 0-100 score with fixed anchors:
/// growth 0.7..1.7 maps to 0..1, slope -0.5..0.5 maps to 0..1, peak is
/// already 0..1.
fn combine(growth: f64, slope: f64, peak: f64) -> f64 {
    let g = clamp01((growth - 0.7) / (1.7 - 0.7));
    let s = clamp01((slope + 0.5) / 1.0);
    let p = peak;

    100.0 * clamp01(0.5 * g + 0.3 * s + 0.2 * p)
}

/// Humanizes a day count ("7 days", "2 months", "1 year").
fn format_period(days: i32) -> String {
    if days >= 365 {
        let years = round_to(f64::from(days) / 365.0, 1);
        if (years - 1.0).abs() < f64::EPSILON {
            "1 year".to_string()
        } else {
            format!("{years} years")
        }
    } else if days >= 30 {
        let months = round_to(f64::from(days) / 30.0, 1);
        if (months - 1.0).abs() < f64::EPSILON {
            "1 month".to_string()
        } else {
            format!("{months} months")
        }
    } else if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

fn explanations(
    growth: f64,
    slope: f64,
    peak: f64,
    country: &str,
    window_days: i32,
    baseline_days: i32,
) -> Vec<String> {
    let window_text = format_period(window_days);
    let baseline_text = format_period(baseline_days);

    let growth_percent = round_to((growth - 1.0).abs() * 100.0, 1);
    let growth_line = if growth > 1.1 {
        format!(
            "Interest over the last {window_text} grew {growth_percent}% vs the last {baseline_text}."
        )
    } else if growth < 0.9 {
        format!(
            "Interest over the last {window_text} fell {growth_percent}% vs the last {baseline_text}."
        )
    } else {
        format!("Interest over the last {window_text} is stable vs the last {baseline_text}.")
    };

    let slope_text = format_period(14.min(window_days * 2));
    let slope_line = if slope > 0.01 {
        format!("The trend over the last {slope_text} is positive (rising).")
    } else if slope < -0.01 {
        format!("The trend over the last {slope_text} is negative (falling).")
    } else {
        format!("The trend over the last {slope_text} is flat (no significant change).")
    };

    let peak_text = format_period(30.max(window_days));
    let peak_percent = (peak * 100.0).round();
    let peak_line = if peak > 0.8 {
        format!("Interest reached a high of {peak_percent}% of the possible maximum in the last {peak_text}.")
    } else if peak >= 0.5 {
        format!("Interest is at moderate levels ({peak_percent}% of the maximum in the last {peak_text}).")
    } else {
        format!("Interest is at low levels ({peak_percent}% of the maximum in the last {peak_text}).")
    };

    vec![
        growth_line,
        slope_line,
        peak_line,
        format!("Data corresponds to country {country}."),
    ]
}

/// Scores a value series. The keyword plays no part in the numbers; country
/// and the window/baseline periods only shape the explanation text.
#[must_use]
pub fn score(
    series: &[SeriesPoint],
    country: &str,
    window_days: i32,
    baseline_days: i32,
) -> Scoring {
    let values: Vec<f64> = series.iter().map(|p| f64::from(p.value)).collect();

    let growth = growth_7_vs_30(&values);
    let slope = slope_14d(&values);
    let peak = recent_peak_30d(&values);

    let trend_score = combine(growth, slope, peak);
    let explain = explanations(growth, slope, peak, country, window_days, baseline_days);

    Scoring {
        trend_score: round_to(trend_score, 2),
        signals: Signals {
            growth_7_vs_30: round_to(growth, 2),
            slope_14d: round_to(slope, 4),
            recent_peak_30d: round_to(peak, 2),
        },
        explain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series_from(values: &[i32]) -> Vec<SeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| SeriesPoint {
                date: start + chrono::Duration::days(i as i64),
                value,
            })
            .collect()
    }

    #[test]
    fn test_flat_series_scores_forty() {
        let series = series_from(&[50; 30]);
        let scoring = score(&series, "ES", 7, 30);

        assert_eq!(scoring.signals.growth_7_vs_30, 1.0);
        assert_eq!(scoring.signals.slope_14d, 0.0);
        assert_eq!(scoring.signals.recent_peak_30d, 0.5);
        assert!((scoring.trend_score - 40.0).abs() < 0.01);

        assert_eq!(scoring.explain.len(), 4);
        assert!(scoring.explain[0].contains("stable"));
        assert!(scoring.explain[1].contains("flat"));
        assert!(scoring.explain[2].contains("moderate"));
        assert!(scoring.explain[3].contains("ES"));
    }

    #[test]
    fn test_linear_ramp_scores_high() {
        // 20 -> 90 over 15 days
        let values: Vec<i32> = (0..15).map(|i| 20 + i * 5).collect();
        let scoring = score(&series_from(&values), "MX", 7, 30);

        assert!(scoring.signals.growth_7_vs_30 > 1.0);
        assert!(scoring.signals.slope_14d > 0.0);
        assert_eq!(scoring.signals.recent_peak_30d, 0.9);
        assert!(scoring.trend_score > 60.0);
        assert!(scoring.explain[0].contains("grew"));
        assert!(scoring.explain[1].contains("positive"));
    }

    #[test]
    fn test_all_zero_series_is_the_no_signal_baseline() {
        // Neutral growth (1.0 -> G = 0.3) and zero slope (-> S = 0.5) with
        // no peak give 100 * (0.5*0.3 + 0.3*0.5) = 30.
        let scoring = score(&series_from(&[0; 30]), "CR", 7, 30);

        assert_eq!(scoring.signals.growth_7_vs_30, 1.0);
        assert_eq!(scoring.signals.slope_14d, 0.0);
        assert_eq!(scoring.signals.recent_peak_30d, 0.0);
        assert!((scoring.trend_score - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_declining_series_explains_fall() {
        let values: Vec<i32> = (0..30).map(|i| 90 - i * 3).collect();
        let scoring = score(&series_from(&values), "ES", 7, 30);

        assert!(scoring.signals.growth_7_vs_30 < 0.9);
        assert!(scoring.signals.slope_14d < 0.0);
        assert!(scoring.explain[0].contains("fell"));
        assert!(scoring.explain[1].contains("negative"));
    }

    #[test]
    fn test_short_series_degrades_gracefully() {
        let scoring = score(&series_from(&[40, 60]), "MX", 7, 30);
        assert!(scoring.trend_score >= 0.0 && scoring.trend_score <= 100.0);

        let single = score(&series_from(&[100]), "MX", 7, 30);
        assert_eq!(single.signals.slope_14d, 0.0);
        assert_eq!(single.signals.recent_peak_30d, 1.0);
        assert!(single.trend_score >= 0.0 && single.trend_score <= 100.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let series = series_from(&[3, 14, 15, 92, 65, 35, 89, 79, 32, 38, 46, 26, 43, 38]);
        let a = score(&series, "MX", 30, 365);
        let b = score(&series, "MX", 30, 365);

        assert_eq!(a.trend_score, b.trend_score);
        assert_eq!(a.signals, b.signals);
        assert_eq!(a.explain, b.explain);
    }

    #[test]
    fn test_rounding_precision() {
        let values: Vec<i32> = vec![10, 20, 10, 30, 17, 23, 11, 47, 31, 9, 22, 34, 18, 27];
        let scoring = score(&series_from(&values), "ES", 7, 30);

        let two_dp = |x: f64| (x * 100.0).round() / 100.0;
        let four_dp = |x: f64| (x * 10000.0).round() / 10000.0;

        assert_eq!(scoring.trend_score, two_dp(scoring.trend_score));
        assert_eq!(
            scoring.signals.growth_7_vs_30,
            two_dp(scoring.signals.growth_7_vs_30)
        );
        assert_eq!(scoring.signals.slope_14d, four_dp(scoring.signals.slope_14d));
        assert_eq!(
            scoring.signals.recent_peak_30d,
            two_dp(scoring.signals.recent_peak_30d)
        );
    }

    #[test]
    fn test_format_period() {
        assert_eq!(format_period(1), "1 day");
        assert_eq!(format_period(7), "7 days");
        assert_eq!(format_period(30), "1 month");
        assert_eq!(format_period(90), "3 months");
        assert_eq!(format_period(365), "1 year");
        assert_eq!(format_period(1825), "5 years");
    }
}
