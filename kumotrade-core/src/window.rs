//! Sliding price window with its displaced coordinate track.
//!
//! Each trader keeps the `W` most recent quotes together with a track of
//! integer time coordinates that extends `DISPLACEMENT` periods behind the
//! oldest quote and `DISPLACEMENT` ahead of the newest. The extra room is
//! what lets the cloud spans be plotted forward in time and read back by
//! coordinate when "now" catches up with them.

/// Forward displacement of the cloud spans, in rounds. Also the lead/lag
/// padding of the coordinate track on each side of the price window.
pub const DISPLACEMENT: usize = 26;

/// Smallest window for which the displaced span lookup is total: the far
/// span's coordinate track must already cover the current coordinate on the
/// first warm round.
pub const MIN_WINDOW: usize = 80;

/// Fixed-capacity, insertion-ordered buffer of recent prices.
///
/// Until warm, `push` only accumulates. Once `W` quotes are held, every
/// push evicts the oldest price and the oldest coordinate and appends the
/// next coordinate, so both tracks slide in lockstep and their lengths
/// never change again.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    capacity: usize,
    prices: Vec<f64>,
    coords: Vec<i64>,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= MIN_WINDOW,
            "window capacity must be at least {MIN_WINDOW}"
        );
        let lead = DISPLACEMENT as i64 - 1;
        let trail = DISPLACEMENT as i64 + 1;
        Self {
            capacity,
            prices: Vec::with_capacity(capacity),
            // -25 .. capacity + 27 for the reference capacity of 80.
            coords: (-lead..capacity as i64 + trail).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// True once `capacity` quotes have been observed.
    pub fn is_warm(&self) -> bool {
        self.prices.len() == self.capacity
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn coords(&self) -> &[i64] {
        &self.coords
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    /// The coordinate of the newest quote. Meaningful once warm.
    pub fn current_coord(&self) -> i64 {
        self.coords[DISPLACEMENT + self.capacity - 1]
    }

    /// Append a quote. Warm windows evict their oldest price and oldest
    /// coordinate and extend the coordinate track by one.
    pub fn push(&mut self, price: f64) {
        if self.is_warm() {
            self.prices.remove(0);
            self.coords.remove(0);
            let next = self.coords[self.coords.len() - 1] + 1;
            self.coords.push(next);
        }
        self.prices.push(price);
    }
}
