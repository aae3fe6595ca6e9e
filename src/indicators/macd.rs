use super::ema::Ema;

/// MACD line, signal line and histogram at the last close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving-average convergence/divergence over a close series.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    pub fn update(&mut self, close: f64) -> MacdOutput {
        let line = self.fast.update(close) - self.slow.update(close);
        let signal = self.signal.update(line);
        MacdOutput {
            line,
            signal,
            histogram: line - signal,
        }
    }
}

/// MACD at the last close; needs `slow + signal` closes to be warm.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdOutput> {
    if closes.len() < slow + signal {
        return None;
    }
    let mut ind = Macd::new(fast, slow, signal);
    closes.iter().map(|&c| ind.update(c)).last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_short_series() {
        let closes = vec![100.0; 34];
        assert!(macd(&closes, 12, 26, 9).is_none());
    }

    #[test]
    fn test_macd_flat_is_zero() {
        let closes = vec![100.0; 60];
        let out = macd(&closes, 12, 26, 9).unwrap();
        assert!(out.line.abs() < 1e-10);
        assert!(out.histogram.abs() < 1e-10);
    }

    #[test]
    fn test_macd_uptrend_positive_line() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let out = macd(&closes, 12, 26, 9).unwrap();
        assert!(out.line > 0.0);
        assert!((out.histogram - (out.line - out.signal)).abs() < 1e-10);
    }

    #[test]
    fn test_macd_turn_up_after_decline_crosses_signal() {
        let mut closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        closes.extend((0..8).map(|i| 141.0 + 6.0 * i as f64));
        let out = macd(&closes, 12, 26, 9).unwrap();
        assert!(out.line > out.signal);
        assert!(out.histogram > 0.0);
    }
}
