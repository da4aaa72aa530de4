//! Ichimoku cloud — five derived series over the price window.
//!
//! All five lines are recomputed from the full window every round. At a
//! window of 80 quotes and rounds a minute apart there is nothing to gain
//! from incremental updates.
//!
//! The two senkou spans are plotted forward in time: a span value computed
//! from past prices is stored against a coordinate `DISPLACEMENT` rounds
//! ahead, so the decision logic compares "now" against a cloud boundary that
//! was projected earlier. Reading a span back is therefore a value lookup in
//! its own coordinate track, never positional indexing.

use thiserror::Error;

use super::midpoint::rolling_midpoint;
use crate::window::{PriceWindow, DISPLACEMENT};

/// Fast baseline period (tenkan-sen).
pub const TENKAN_PERIOD: usize = 9;
/// Slow baseline period (kijun-sen).
pub const KIJUN_PERIOD: usize = 26;
/// Far cloud boundary period (senkou span B).
pub const SENKOU_B_PERIOD: usize = 52;

/// A span lookup missed its coordinate track. The track is sized so this
/// cannot happen for a warm window; hitting it means the window geometry
/// was broken, not that data was bad.
#[derive(Debug, Clone, Error)]
#[error("{span} has no value at coordinate {coord}")]
pub struct CloudError {
    pub span: &'static str,
    pub coord: i64,
}

/// The five Ichimoku series for one window, with coordinate tracks for the
/// displaced lines.
#[derive(Debug, Clone)]
pub struct IchimokuCloud {
    /// Fast baseline, one value per 9-quote sub-window.
    pub tenkan: Vec<f64>,
    /// Slow baseline, one value per 26-quote sub-window.
    pub kijun: Vec<f64>,
    /// Near cloud boundary (senkou span A), displaced forward.
    pub senkou_a: Vec<f64>,
    pub senkou_a_x: Vec<i64>,
    /// Far cloud boundary (senkou span B), displaced forward.
    pub senkou_b: Vec<f64>,
    pub senkou_b_x: Vec<i64>,
    /// Lagging close line, displaced backward.
    pub chikou: Vec<f64>,
    pub chikou_x: Vec<i64>,
}

/// The cloud read at a single coordinate, as the decision logic sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudSnapshot {
    pub coord: i64,
    pub price: f64,
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
}

impl IchimokuCloud {
    /// Recompute all five series from a warm window.
    pub fn compute(window: &PriceWindow) -> Self {
        assert!(window.is_warm(), "cloud computed from a cold window");
        let prices = window.prices();
        let coords = window.coords();
        let w = window.capacity();

        let tenkan = rolling_midpoint(prices, TENKAN_PERIOD);
        let kijun = rolling_midpoint(prices, KIJUN_PERIOD);

        // Span A pairs each kijun value with the tenkan value whose
        // sub-window ends on the same quote.
        let stagger = KIJUN_PERIOD - TENKAN_PERIOD;
        let senkou_a: Vec<f64> = kijun
            .iter()
            .enumerate()
            .map(|(i, &k)| (tenkan[i + stagger] + k) / 2.0)
            .collect();
        let senkou_b = rolling_midpoint(prices, SENKOU_B_PERIOD);

        let a_start = 3 * DISPLACEMENT;
        let b_start = 4 * DISPLACEMENT;
        let senkou_a_x = coords[a_start..a_start + senkou_a.len()].to_vec();
        let senkou_b_x = coords[b_start..b_start + senkou_b.len()].to_vec();

        let chikou = prices.to_vec();
        let chikou_x = coords[..w].to_vec();

        Self {
            tenkan,
            kijun,
            senkou_a,
            senkou_a_x,
            senkou_b,
            senkou_b_x,
            chikou,
            chikou_x,
        }
    }

    pub fn latest_tenkan(&self) -> f64 {
        self.tenkan[self.tenkan.len() - 1]
    }

    pub fn latest_kijun(&self) -> f64 {
        self.kijun[self.kijun.len() - 1]
    }

    pub fn span_a_at(&self, coord: i64) -> Option<f64> {
        value_at(&self.senkou_a, &self.senkou_a_x, coord)
    }

    pub fn span_b_at(&self, coord: i64) -> Option<f64> {
        value_at(&self.senkou_b, &self.senkou_b_x, coord)
    }

    /// Read the cloud at `coord` for a quote at `price`.
    pub fn snapshot(&self, coord: i64, price: f64) -> Result<CloudSnapshot, CloudError> {
        let senkou_a = self.span_a_at(coord).ok_or(CloudError {
            span: "senkou span A",
            coord,
        })?;
        let senkou_b = self.span_b_at(coord).ok_or(CloudError {
            span: "senkou span B",
            coord,
        })?;
        Ok(CloudSnapshot {
            coord,
            price,
            tenkan: self.latest_tenkan(),
            kijun: self.latest_kijun(),
            senkou_a,
            senkou_b,
        })
    }
}

/// Find the element of `series` whose parallel `coords` entry equals
/// `coord`. Linear scan; the tracks are a few dozen entries long.
pub fn value_at(series: &[f64], coords: &[i64], coord: i64) -> Option<f64> {
    debug_assert_eq!(series.len(), coords.len());
    coords.iter().position(|&c| c == coord).map(|i| series[i])
}
