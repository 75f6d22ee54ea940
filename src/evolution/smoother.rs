/// Exponential moving average over the raw score history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSmoother {
    multiplier: f64,
}

impl ScoreSmoother {
    /// `span` must be at least 1; the multiplier is `2 / (span + 1)`.
    pub fn new(span: u32) -> Self {
        Self {
            multiplier: 2.0 / (f64::from(span.max(1)) + 1.0),
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Recomputes the EMA over the whole history and returns its last value.
    /// The first element is taken as-is.
    pub fn smooth(&self, history: &[f64]) -> Option<f64> {
        let (first, rest) = history.split_first()?;
        let m = self.multiplier;
        Some(rest.iter().fold(*first, |ema, x| x * m + ema * (1.0 - m)))
    }
}
