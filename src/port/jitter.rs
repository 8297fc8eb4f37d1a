// Jitter Source Port (for deterministic testing)

/// Upper bound (exclusive) of the uniform jitter draw, in milliseconds
pub const JITTER_RANGE_MS: i64 = 1000;

/// Jitter source interface (allows deterministic retry delays in tests)
///
/// Jitter spreads synchronized retries apart so a burst of failures against
/// a rate-limited downstream does not come back as a retry storm.
pub trait JitterSource: Send + Sync {
    /// Draw a jitter value uniformly from `[0, JITTER_RANGE_MS)`
    fn jitter_ms(&self) -> i64;
}

/// Thread-local RNG source (production)
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn jitter_ms(&self) -> i64 {
        use rand::Rng;
        rand::thread_rng().gen_range(0..JITTER_RANGE_MS)
    }
}

pub mod mocks {
    use super::*;

    /// Fixed jitter value for deterministic tests
    pub struct FixedJitter(pub i64);

    impl JitterSource for FixedJitter {
        fn jitter_ms(&self) -> i64 {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_within_range() {
        let source = ThreadRngJitter;
        for _ in 0..100 {
            let j = source.jitter_ms();
            assert!((0..JITTER_RANGE_MS).contains(&j));
        }
    }
}
