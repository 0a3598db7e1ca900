// src/analytics.rs
use crate::models::{Analytics, Series, Stacked};
use crate::market::round2;
use rand::Rng;

const HISTOGRAM_LABELS: [&str; 5] = ["$0-100", "$100-500", "$500-1k", "$1k-5k", "$5k+"];
const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];
const PORTFOLIO_LABELS: [&str; 4] = ["BTC", "ETH", "SOL", "USDT"];
const PORTFOLIO_WEIGHTS: [u32; 4] = [40, 30, 20, 10];

pub const CHART_POINTS: usize = 24;
const CHART_BASE: f64 = 45000.0;
const CHART_SPREAD: f64 = 1000.0;

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn draws<R: Rng>(rng: &mut R, n: usize, low: u32, high: u32) -> Vec<u32> {
    (0..n).map(|_| rng.random_range(low..=high)).collect()
}

pub fn analytics<R: Rng>(rng: &mut R) -> Analytics {
    Analytics {
        histogram: Series {
            labels: labels(&HISTOGRAM_LABELS),
            data: draws(rng, HISTOGRAM_LABELS.len(), 5, 50),
        },
        stacked: Stacked {
            labels: labels(&MONTHS),
            buy: draws(rng, MONTHS.len(), 20, 100),
            sell: draws(rng, MONTHS.len(), 20, 100),
        },
        portfolio: Series {
            labels: labels(&PORTFOLIO_LABELS),
            data: PORTFOLIO_WEIGHTS.to_vec(),
        },
    }
}

/// Synthetic 24-point history around 45000 for the landing chart.
pub fn chart_series<R: Rng>(rng: &mut R) -> Vec<f64> {
    (0..CHART_POINTS)
        .map(|_| round2(CHART_BASE + (rng.random::<f64>() - 0.5) * CHART_SPREAD))
        .collect()
}
