/// Wilder smoothing: exponential smoothing with factor `1 / length`.
///
/// The first `length` samples are averaged with a simple mean to form the
/// seed. After that:
///
/// ```text
/// avg = (prev_avg × (length − 1) + sample) / length
/// ```
#[derive(Clone, Debug)]
pub(crate) struct Wilder {
    length: usize,
    length_reciprocal: f64,
    length_minus_one: f64,
    seed_sum: f64,
    seen: usize,
    average: Option<f64>,
}

impl Wilder {
    pub(crate) fn new(length: usize) -> Self {
        Self {
            length,
            #[allow(clippy::cast_precision_loss)]
            length_reciprocal: 1.0 / length as f64,
            #[allow(clippy::cast_precision_loss)]
            length_minus_one: (length - 1) as f64,
            seed_sum: 0.0,
            seen: 0,
            average: None,
        }
    }

    /// Feeds one sample, returning the smoothed value once seeded.
    #[inline]
    pub(crate) fn push(&mut self, sample: f64) -> Option<f64> {
        self.average = match self.average {
            Some(prev) => Some(prev.mul_add(self.length_minus_one, sample) * self.length_reciprocal),
            None => {
                self.seed_sum += sample;
                self.seen += 1;
                (self.seen == self.length).then(|| self.seed_sum * self.length_reciprocal)
            }
        };

        self.average
    }
}
