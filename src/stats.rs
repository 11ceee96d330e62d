//! Small numeric helpers shared by the pipeline stages

/// Arithmetic mean, or `None` for an empty sequence
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

/// Round half toward positive infinity (`2.5 -> 3`, `-2.5 -> -2`)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean([20.0, 22.0, 24.0]), Some(22.0));
        assert_eq!(mean(vec![1.5]), Some(1.5));
    }

    #[test]
    fn test_mean_of_nothing_is_undefined() {
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_mean_propagates_non_finite() {
        assert!(mean([1.0, f64::NAN]).unwrap().is_nan());
        assert_eq!(mean([1.0, f64::INFINITY]), Some(f64::INFINITY));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(2.4999), 2.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(65.0), 65.0);
    }
}
