use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shape of the delay between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffShape {
    /// Same delay before every retry
    Fixed {
        #[serde(rename = "delay_ms", with = "duration_ms")]
        delay: Duration,
    },
    /// `base * multiplier^(attempt-1)`, capped at `max`, optionally jittered upwards
    Exponential {
        #[serde(rename = "base_delay_ms", with = "duration_ms")]
        base: Duration,
        multiplier: f64,
        #[serde(rename = "max_delay_ms", with = "duration_ms")]
        max: Duration,
        /// Fraction (0.0 - 1.0) of the delay added at random
        jitter: f64,
    },
}

impl BackoffShape {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    /// Exponential backoff. A multiplier below 1.0 (or NaN) behaves as 1.0 when
    /// delays are computed; `LifecycleConfig::validate` rejects it outright.
    pub fn exponential(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self::Exponential {
            base,
            multiplier,
            max,
            jitter: 0.0,
        }
    }

    /// Jitter is clamped to 0.0..=1.0 when delays are computed
    pub fn with_jitter(self, jitter: f64) -> Self {
        match self {
            Self::Exponential {
                base,
                multiplier,
                max,
                ..
            } => Self::Exponential {
                base,
                multiplier,
                max,
                jitter,
            },
            fixed => fixed,
        }
    }

    /// Delay to sleep after the given failed attempt (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                multiplier,
                max,
                jitter,
            } => {
                let multiplier = if multiplier >= 1.0 { multiplier } else { 1.0 };
                let jitter = if jitter > 0.0 { jitter.min(1.0) } else { 0.0 };
                let exponent = attempt.saturating_sub(1).min(32) as i32;
                let factor = multiplier.powi(exponent);
                let delay = if factor.is_finite() && base.as_secs_f64() * factor < max.as_secs_f64()
                {
                    base.mul_f64(factor)
                } else {
                    max
                };

                let jittered = if jitter > 0.0 {
                    delay.mul_f64(1.0 + fastrand::f64() * jitter)
                } else {
                    delay
                };
                jittered.min(max)
            }
        }
    }
}

impl Default for BackoffShape {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            multiplier: 2.0,
            max: Duration::from_secs(10),
            jitter: 0.1,
        }
    }
}

/// Serde helpers storing a `Duration` as integer milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let backoff = BackoffShape::fixed(Duration::from_millis(10));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(backoff.delay_for_attempt(7), Duration::from_millis(10));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = BackoffShape::exponential(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1000),
        );

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let backoff = BackoffShape::exponential(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(150),
        )
        .with_jitter(0.5);

        for _ in 0..100 {
            let delay = backoff.delay_for_attempt(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_out_of_range_parameters_do_not_panic() {
        let max = Duration::from_millis(800);
        for (multiplier, jitter) in [(-3.0, -5.0), (f64::NAN, f64::NAN), (0.0, 7.5)] {
            let backoff = BackoffShape::exponential(Duration::from_millis(100), multiplier, max)
                .with_jitter(jitter);
            for attempt in [1, 2, 10] {
                let delay = backoff.delay_for_attempt(attempt);
                assert!(delay >= Duration::from_millis(100), "{multiplier} {jitter}");
                assert!(delay <= max);
            }
        }
    }

    #[test]
    fn test_backoff_deserializes_from_millis() {
        let shape: BackoffShape = serde_json::from_value(serde_json::json!({
            "kind": "exponential",
            "base_delay_ms": 50,
            "multiplier": 3.0,
            "max_delay_ms": 2000,
            "jitter": 0.0
        }))
        .unwrap();
        assert_eq!(
            shape,
            BackoffShape::exponential(Duration::from_millis(50), 3.0, Duration::from_secs(2))
        );

        let fixed: BackoffShape =
            serde_json::from_value(serde_json::json!({"kind": "fixed", "delay_ms": 10})).unwrap();
        assert_eq!(fixed, BackoffShape::fixed(Duration::from_millis(10)));
    }
}
