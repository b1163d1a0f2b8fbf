//! Consecutive-failure accounting and the give-up policy.

use std::collections::BTreeMap;

use psadwatch_config::ProcessName;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RetryCounter {
    consecutive_failures: u32,
}

/// Failure counters for every supervised daemon.
///
/// Counters are independent: one daemon recovering does not reset another.
/// Reaching the limit for any daemon is nevertheless fatal to the watchdog.
#[derive(Debug, Clone)]
pub struct RetryLedger {
    counters: BTreeMap<ProcessName, RetryCounter>,
    max_retries: u32,
}

impl RetryLedger {
    /// Builds a ledger with every counter at zero.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        let counters = ProcessName::ALL
            .into_iter()
            .map(|name| (name, RetryCounter::default()))
            .collect();
        Self {
            counters,
            max_retries,
        }
    }

    /// Records a failed check followed by a restart attempt.
    ///
    /// Returns `true` once the counter reaches or exceeds the retry limit,
    /// meaning the watchdog must give up.
    pub fn record_failure(&mut self, name: ProcessName) -> bool {
        let counter = self.counters.entry(name).or_default();
        counter.consecutive_failures = counter.consecutive_failures.saturating_add(1);
        counter.consecutive_failures >= self.max_retries
    }

    /// Records a successful check, clearing the counter.
    pub fn record_success(&mut self, name: ProcessName) {
        self.counters.entry(name).or_default().consecutive_failures = 0;
    }

    /// Consecutive failures recorded for `name`.
    #[must_use]
    pub fn failures(&self, name: ProcessName) -> u32 {
        self.counters
            .get(&name)
            .map_or(0, |counter| counter.consecutive_failures)
    }

    /// The active retry limit.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Applies a retry limit from a reloaded configuration. Counters are kept.
    pub const fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
    }
}

#[cfg(test)]
mod tests {
    use psadwatch_config::ProcessName;
    use rstest::rstest;

    use super::RetryLedger;

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(10)]
    fn gives_up_on_the_limit_and_not_before(#[case] limit: u32) {
        let mut ledger = RetryLedger::new(limit);
        for attempt in 1..limit {
            assert!(
                !ledger.record_failure(ProcessName::Psad),
                "attempt {attempt} should not give up"
            );
        }
        assert!(ledger.record_failure(ProcessName::Psad));
        assert_eq!(ledger.failures(ProcessName::Psad), limit);
    }

    #[rstest]
    fn success_resets_only_the_named_counter() {
        let mut ledger = RetryLedger::new(5);
        ledger.record_failure(ProcessName::Psad);
        ledger.record_failure(ProcessName::Psad);
        ledger.record_failure(ProcessName::Kmsgsd);

        ledger.record_success(ProcessName::Psad);

        assert_eq!(ledger.failures(ProcessName::Psad), 0);
        assert_eq!(ledger.failures(ProcessName::Kmsgsd), 1);
        assert_eq!(ledger.failures(ProcessName::Diskmond), 0);
    }

    #[rstest]
    fn lowering_the_limit_applies_to_existing_counts() {
        let mut ledger = RetryLedger::new(10);
        ledger.record_failure(ProcessName::Diskmond);
        ledger.set_max_retries(2);

        assert!(ledger.record_failure(ProcessName::Diskmond));
        assert_eq!(ledger.max_retries(), 2);
    }

    const fn with_limit(mut ledger: RetryLedger, max_retries: u32) -> RetryLedger {
        ledger.set_max_retries(max_retries);
        ledger
    }

    #[rstest]
    fn limit_can_be_applied_in_const_context() {
        let ledger = with_limit(RetryLedger::new(10), 4);
        assert_eq!(ledger.max_retries(), 4);
    }

    #[rstest]
    fn zero_limit_gives_up_on_first_failure() {
        let mut ledger = RetryLedger::new(0);
        assert!(ledger.record_failure(ProcessName::Kmsgsd));
    }
}
