/// Relative Strength Index with Wilder smoothing.
///
/// The first `period` changes seed the average gain/loss with a simple
/// mean; later changes use `avg = (avg·(n−1) + x) / n`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    seeded: usize,
    value: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seeded: 0,
            value: None,
        }
    }

    /// Feed one close. Returns `None` until `period` changes are seen.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 || !close.is_finite() {
            return self.value;
        }
        let Some(prev) = self.prev_close.replace(close) else {
            return None;
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;

        if self.seeded < self.period {
            self.avg_gain += gain / n;
            self.avg_loss += loss / n;
            self.seeded += 1;
            if self.seeded < self.period {
                return None;
            }
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }

        let value = if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        };
        self.value = Some(value);
        self.value
    }
}

/// RSI of the last close in `closes`; needs `period + 1` closes.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    let mut ind = Rsi::new(period);
    closes.iter().fold(None, |_, &c| ind.update(c))
}
