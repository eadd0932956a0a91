use rand::Rng;
use std::time::Duration;

/// Random pre-run delay, uniform in whole minutes over `[0, max_minutes)`.
///
/// `None` means no sleep at all: the feature is off or the range is empty.
/// A drawn zero is still a (zero-length) delay.
pub fn preflight_duration<R: Rng>(
    enabled: bool,
    max_minutes: u64,
    rng: &mut R,
) -> Option<Duration> {
    if !enabled || max_minutes == 0 {
        return None;
    }

    let minutes = rng.gen_range(0..max_minutes);
    Some(Duration::from_secs(minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_disabled_means_no_delay() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(preflight_duration(false, 60, &mut rng), None);
    }

    #[test]
    fn test_zero_max_means_no_delay() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(preflight_duration(true, 0, &mut rng), None);
    }

    #[test]
    fn test_delay_is_whole_minutes_below_max() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let delay = preflight_duration(true, 60, &mut rng).unwrap();
            assert_eq!(delay.as_secs() % 60, 0);
            assert!(delay < Duration::from_secs(60 * 60));
        }
    }

    #[test]
    fn test_max_one_always_draws_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            preflight_duration(true, 1, &mut rng),
            Some(Duration::ZERO)
        );
    }
}
