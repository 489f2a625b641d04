//! Backoff parameters and the named per-kind retry policies.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exponential backoff parameters.
///
/// A `Backoff` value is consumed by one poll sequence: callers copy a named
/// policy, then [`next_delay`](Self::next_delay) advances the copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Initial delay between attempts.
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    /// Multiplier applied after every delay. `0.0` and `1.0` keep it constant.
    pub factor: f64,
    /// Fraction of the delay added at random: `d + rand(0, jitter * d)`.
    pub jitter: f64,
    /// Maximum number of attempts.
    pub steps: u32,
}

impl Backoff {
    /// Subnet and subnet-port realization.
    pub const SUBNET: Backoff = Backoff {
        duration: Duration::from_secs(1),
        factor: 2.0,
        jitter: 0.0,
        steps: 6,
    };

    /// Any NSX operation without a dedicated policy.
    pub const DEFAULT: Backoff = Backoff {
        duration: Duration::from_millis(500),
        factor: 1.0,
        jitter: 0.1,
        steps: 10,
    };

    /// Load-balancer virtual servers. Provisioning an LB is slow, so this
    /// allows far more attempts than the generic policies.
    pub const LB_VIRTUAL_SERVER: Backoff = Backoff {
        duration: Duration::from_millis(500),
        factor: 1.0,
        jitter: 0.1,
        steps: 60,
    };

    pub fn new(duration: Duration, factor: f64, jitter: f64, steps: u32) -> Self {
        Self {
            duration,
            factor,
            jitter,
            steps,
        }
    }

    /// Returns the next delay and grows the base duration by `factor`.
    ///
    /// Saturates at `Duration::MAX` instead of overflowing. Non-finite or
    /// negative `factor` and `jitter` values are ignored.
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.jitter.is_finite() && self.jitter > 0.0 {
            let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
            scale(self.duration, 1.0 + extra)
        } else {
            self.duration
        };
        if self.factor > 0.0 && self.factor != 1.0 {
            self.duration = scale(self.duration, self.factor);
        }
        delay
    }

    /// Upper bound on the total time a sequence can spend sleeping.
    pub fn max_total_delay(&self) -> Duration {
        let mut backoff = *self;
        backoff.jitter = 0.0;
        let sleeps = self.steps.saturating_sub(1);
        let total = (0..sleeps).fold(Duration::ZERO, |total, _| {
            total.saturating_add(backoff.next_delay())
        });
        if self.jitter.is_finite() && self.jitter > 0.0 {
            scale(total, 1.0 + self.jitter)
        } else {
            total
        }
    }
}

/// `d * factor`, saturating at `Duration::MAX`.
fn scale(d: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(d.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

impl Default for Backoff {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resource kinds with their own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Subnet,
    SubnetPort,
    Default,
    LbVirtualServer,
}

/// The set of retry policies in effect, one per [`ResourceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicies {
    pub subnet: Backoff,
    pub default: Backoff,
    pub lb_virtual_server: Backoff,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            subnet: Backoff::SUBNET,
            default: Backoff::DEFAULT,
            lb_virtual_server: Backoff::LB_VIRTUAL_SERVER,
        }
    }
}

impl RetryPolicies {
    pub fn for_kind(&self, kind: ResourceKind) -> Backoff {
        match kind {
            ResourceKind::Subnet | ResourceKind::SubnetPort => self.subnet,
            ResourceKind::Default => self.default,
            ResourceKind::LbVirtualServer => self.lb_virtual_server,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
