//! Escalation policy for consecutive connectivity failures.
//!
//! The ladder is fixed: the first failure of a streak restarts the
//! name-resolution and network services, and once the streak reaches the
//! threshold every further failure asks for a reboot. Two knobs exist because
//! deployments disagree on the exact boundary:
//!
//! - [`ThresholdComparison`]: reboot at `n >= threshold` or only at
//!   `n > threshold`.
//! - [`FirstFailure`]: whether the tick that runs the service restarts may
//!   also reboot.

use serde::Deserialize;

/// How the failure count is compared against the reboot threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
    /// Reboot once `failures >= threshold`.
    #[default]
    Inclusive,
    /// Reboot once `failures > threshold`.
    Strict,
}

/// What happens to the reboot check on the first failing tick of a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstFailure {
    /// Restart services and end the tick; the threshold is not evaluated.
    #[default]
    SkipThresholdCheck,
    /// Restart services, then evaluate the threshold as on any other tick.
    FallThrough,
}

/// Action chosen for a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Bookkeeping only.
    None,
    /// Restart the name-resolution and network-management services.
    Remediate,
    /// Reboot the host.
    Reboot,
    /// Restart services and reboot on the same tick (`FallThrough` with a
    /// threshold that the first failure already meets).
    RemediateAndReboot,
}

impl Escalation {
    pub fn remediates(self) -> bool {
        matches!(self, Self::Remediate | Self::RemediateAndReboot)
    }

    pub fn reboots(self) -> bool {
        matches!(self, Self::Reboot | Self::RemediateAndReboot)
    }
}

/// Escalation policy evaluated once per failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EscalationPolicy {
    /// Failed attempts allowed before a reboot.
    pub threshold: u32,
    #[serde(default)]
    pub comparison: ThresholdComparison,
    #[serde(default)]
    pub first_failure: FirstFailure,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            comparison: ThresholdComparison::default(),
            first_failure: FirstFailure::default(),
        }
    }
}

impl EscalationPolicy {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn with_comparison(mut self, comparison: ThresholdComparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_first_failure(mut self, first_failure: FirstFailure) -> Self {
        self.first_failure = first_failure;
        self
    }

    /// Whether `failures` satisfies the reboot comparison.
    pub fn threshold_reached(&self, failures: u32) -> bool {
        match self.comparison {
            ThresholdComparison::Inclusive => failures >= self.threshold,
            ThresholdComparison::Strict => failures > self.threshold,
        }
    }

    /// Decide the action for a failed tick, given the post-increment
    /// consecutive failure count.
    pub fn decide(&self, failures: u32) -> Escalation {
        if failures == 0 {
            return Escalation::None;
        }

        if failures == 1 {
            return match self.first_failure {
                FirstFailure::SkipThresholdCheck => Escalation::Remediate,
                FirstFailure::FallThrough if self.threshold_reached(failures) => {
                    Escalation::RemediateAndReboot
                }
                FirstFailure::FallThrough => Escalation::Remediate,
            };
        }

        if self.threshold_reached(failures) {
            Escalation::Reboot
        } else {
            Escalation::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_ladder() {
        let policy = EscalationPolicy::new(5);

        assert_eq!(policy.decide(1), Escalation::Remediate);
        for n in 2..5 {
            assert_eq!(policy.decide(n), Escalation::None, "n = {n}");
        }
        assert_eq!(policy.decide(5), Escalation::Reboot);
        assert_eq!(policy.decide(6), Escalation::Reboot);
        assert_eq!(policy.decide(50), Escalation::Reboot);
    }

    #[test]
    fn strict_comparison_waits_one_more_failure() {
        let policy = EscalationPolicy::new(3).with_comparison(ThresholdComparison::Strict);

        assert_eq!(policy.decide(3), Escalation::None);
        assert_eq!(policy.decide(4), Escalation::Reboot);
    }

    #[test]
    fn skip_threshold_check_never_reboots_on_first_failure() {
        let policy = EscalationPolicy::new(1);

        assert_eq!(policy.decide(1), Escalation::Remediate);
        assert_eq!(policy.decide(2), Escalation::Reboot);
    }

    #[test]
    fn fall_through_reboots_on_first_failure_when_threshold_met() {
        let policy = EscalationPolicy::new(1).with_first_failure(FirstFailure::FallThrough);

        let action = policy.decide(1);
        assert_eq!(action, Escalation::RemediateAndReboot);
        assert!(action.remediates());
        assert!(action.reboots());
    }

    #[test]
    fn fall_through_below_threshold_only_remediates() {
        let policy = EscalationPolicy::new(3).with_first_failure(FirstFailure::FallThrough);
        assert_eq!(policy.decide(1), Escalation::Remediate);
    }

    #[test]
    fn zero_failures_is_a_no_op() {
        assert_eq!(EscalationPolicy::new(0).decide(0), Escalation::None);
    }

    #[test]
    fn policy_deserializes_from_toml() {
        let policy: EscalationPolicy = toml::from_str(
            r#"
            threshold = 4
            comparison = "strict"
            first_failure = "fall_through"
            "#,
        )
        .unwrap();

        assert_eq!(policy.threshold, 4);
        assert_eq!(policy.comparison, ThresholdComparison::Strict);
        assert_eq!(policy.first_failure, FirstFailure::FallThrough);
    }
}
