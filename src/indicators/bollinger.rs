/// Bollinger bands at the last close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// SMA(window) ± `num_std` population standard deviations.
pub fn bollinger(closes: &[f64], window: usize, num_std: f64) -> Option<Bands> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    let middle = tail.iter().sum::<f64>() / window as f64;
    let var = tail.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / window as f64;
    let width = num_std * var.sqrt();
    Some(Bands {
        upper: middle + width,
        middle,
        lower: middle - width,
    })
}
