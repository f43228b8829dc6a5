//! Interaction timing configuration
//!
//! Every primitive receives its timings from an [`InteractionConfig`]
//! instead of reading constants. Durations are stored as milliseconds so
//! the struct round-trips through YAML and env overlays unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use twizz_core_types::{ActuationMethod, TargetState};

use crate::actuator::RetryPolicy;
use crate::errors::ActionError;
use crate::polling::PollingAssertion;
use crate::waiting::WaitSpec;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub escalate_after: u32,
    pub attempt_timeout_ms: u64,
    pub ladder: Vec<ActuationMethod>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 200,
            escalate_after: 2,
            attempt_timeout_ms: 5_000,
            ladder: ActuationMethod::ladder(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            interval_ms: 100,
        }
    }
}

/// Bounds for "remove until empty" loops.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DrainConfig {
    pub max_iterations: u32,
    pub max_stalls: u32,
    pub settle_timeout_ms: u64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_stalls: 3,
            settle_timeout_ms: 5_000,
        }
    }
}

/// Wait timing for one named call-site profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitProfile {
    pub timeout_ms: u64,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl WaitProfile {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms: None,
        }
    }
}

/// Built-in call-site profiles: quick 5 s, standard 10 s, slow 30 s, upload 90 s.
pub fn default_profiles() -> BTreeMap<String, WaitProfile> {
    [
        ("quick", 5_000),
        ("standard", 10_000),
        ("slow", 30_000),
        ("upload", 90_000),
    ]
    .into_iter()
    .map(|(name, timeout_ms)| (name.to_string(), WaitProfile::new(timeout_ms)))
    .collect()
}

/// Timing configuration injected into every primitive.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InteractionConfig {
    pub wait: WaitConfig,
    pub retry: RetryConfig,
    pub poll: PollConfig,
    pub drain: DrainConfig,
    pub profiles: BTreeMap<String, WaitProfile>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
            drain: DrainConfig::default(),
            profiles: default_profiles(),
        }
    }
}

impl InteractionConfig {
    /// Reject values the primitives would otherwise have to clamp.
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut problems = Vec::new();
        if self.wait.timeout_ms == 0 {
            problems.push("wait.timeout_ms must be > 0".to_string());
        }
        if self.wait.poll_interval_ms == 0 {
            problems.push("wait.poll_interval_ms must be > 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            problems.push("retry.max_attempts must be >= 1".to_string());
        }
        if self.retry.escalate_after == 0 {
            problems.push("retry.escalate_after must be >= 1".to_string());
        }
        if self.retry.attempt_timeout_ms == 0 {
            problems.push("retry.attempt_timeout_ms must be > 0".to_string());
        }
        if self.retry.ladder.is_empty() {
            problems.push("retry.ladder must not be empty".to_string());
        }
        if self.poll.timeout_ms == 0 || self.poll.interval_ms == 0 {
            problems.push("poll timings must be > 0".to_string());
        }
        if self.drain.max_iterations == 0 {
            problems.push("drain.max_iterations must be >= 1".to_string());
        }
        for (name, profile) in &self.profiles {
            if profile.timeout_ms == 0 {
                problems.push(format!("profiles.{}.timeout_ms must be > 0", name));
            }
            if profile.poll_interval_ms == Some(0) {
                problems.push(format!("profiles.{}.poll_interval_ms must be > 0", name));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ActionError::InvalidConfig(problems.join("; ")))
        }
    }

    /// Wait spec for `state` using the default wait timings.
    pub fn wait_spec(&self, state: TargetState) -> WaitSpec {
        WaitSpec::new(state, self.wait.timeout()).with_poll_interval(self.wait.poll_interval())
    }

    /// Wait spec for `state` using a named profile, if it exists.
    pub fn profile_spec(&self, profile: &str, state: TargetState) -> Option<WaitSpec> {
        self.profiles.get(profile).map(|p| {
            let poll = p
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| self.wait.poll_interval());
            WaitSpec::new(state, Duration::from_millis(p.timeout_ms)).with_poll_interval(poll)
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts)
            .with_delay(self.retry.delay())
            .with_ladder(self.retry.ladder.clone())
            .with_escalate_after(self.retry.escalate_after)
            .with_attempt_timeout(self.retry.attempt_timeout())
    }

    pub fn polling(&self) -> PollingAssertion {
        PollingAssertion::new(
            Duration::from_millis(self.poll.timeout_ms),
            Duration::from_millis(self.poll.interval_ms),
        )
    }
}
