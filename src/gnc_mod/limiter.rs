// ---------------------------------------------------------------------------
// Pitch-rate limiter (single axis)
// ---------------------------------------------------------------------------

/// Clamps commanded pitch changes to `max_rate × Δt`.
///
/// Holds the last realized pitch and its timestamp. The first request after
/// construction or [`reset`](Self::reset) passes through unclamped.
#[derive(Debug, Clone)]
pub struct PitchRateLimiter {
    pub max_rate: f64, // deg/s
    last: Option<(f64, f64)>,
}

impl PitchRateLimiter {
    pub fn new(max_rate_deg_s: f64) -> Self {
        Self { max_rate: max_rate_deg_s, last: None }
    }

    pub fn limit(&mut self, requested_deg: f64, time: f64) -> f64 {
        let realized = match self.last {
            None => requested_deg,
            Some((last_pitch, last_time)) => {
                let dt = (time - last_time).max(0.0);
                let max_step = self.max_rate * dt;
                last_pitch + (requested_deg - last_pitch).clamp(-max_step, max_step)
            }
        };
        self.last = Some((realized, time));
        realized
    }

    pub fn last_pitch(&self) -> Option<f64> {
        self.last.map(|(pitch, _)| pitch)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn first_request_is_unclamped() {
        let mut lim = PitchRateLimiter::new(0.7);
        assert_eq!(lim.limit(42.0, 100.0), 42.0);
    }

    #[test]
    fn step_is_clamped_to_rate() {
        let mut lim = PitchRateLimiter::new(0.7);
        lim.limit(90.0, 0.0);
        let p = lim.limit(10.0, 2.0);
        assert!((p - 88.6).abs() < 1e-12, "got {}", p);
        // Upward requests are clamped the same way
        let p = lim.limit(120.0, 3.0);
        assert!((p - 89.3).abs() < 1e-12, "got {}", p);
    }

    #[test]
    fn repeated_timestamp_holds_pitch() {
        let mut lim = PitchRateLimiter::new(0.7);
        lim.limit(80.0, 5.0);
        assert_eq!(lim.limit(10.0, 5.0), 80.0);
        assert_eq!(lim.limit(10.0, 4.0), 80.0, "time going backwards must not move pitch");
    }

    #[test]
    fn rate_never_exceeded_for_random_requests() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut lim = PitchRateLimiter::new(0.7);
        let mut t = 0.0;
        let mut prev = lim.limit(90.0, t);
        for _ in 0..5_000 {
            let dt = rng.gen_range(0.0..0.5);
            t += dt;
            let p = lim.limit(rng.gen_range(-10.0..100.0), t);
            assert!((p - prev).abs() <= 0.7 * dt + 1e-9, "jump {} over {} s", p - prev, dt);
            prev = p;
        }
    }

    #[test]
    fn reset_forgets_history() {
        let mut lim = PitchRateLimiter::new(0.7);
        lim.limit(90.0, 0.0);
        lim.limit(89.0, 1.0);
        lim.reset();
        assert!(lim.last_pitch().is_none());
        assert_eq!(lim.limit(15.0, 1.1), 15.0);
    }
}
