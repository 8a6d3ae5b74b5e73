/// Cooldown shared by every remote call. Each rate-limited response grows the
/// number of subsequent calls to skip by one (1, 2, 3, ...); any successful
/// call resets the growth. Linear on purpose: the sync cadence is slow enough
/// that exponential backoff would overshoot.
#[derive(Debug, Default)]
pub struct Backoff {
    cooldown: u32,
    last_cooldown: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one tick of the cooldown. Returns true when the caller must
    /// skip its remote call this round.
    pub fn should_skip(&mut self) -> bool {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return true;
        }
        false
    }

    /// Resets the escalation. Any residual cooldown still drains naturally
    /// through [Self::should_skip].
    pub fn on_success(&mut self) {
        self.last_cooldown = 0;
    }

    pub fn on_rate_limited(&mut self) {
        self.cooldown = self.last_cooldown + 1;
        self.last_cooldown = self.cooldown;
    }
}

#[cfg(test)]
mod backoff_tests {
    use super::Backoff;

    /// Runs attempts against the backoff until one is allowed through,
    /// returning how many were skipped first.
    fn skipped_before_next_call(backoff: &mut Backoff) -> u32 {
        let mut skipped = 0;
        while backoff.should_skip() {
            skipped += 1;
        }
        skipped
    }

    #[test]
    fn no_cooldown_initially() {
        let mut backoff = Backoff::new();
        assert!(!backoff.should_skip());
    }

    #[test]
    fn sustained_rate_limiting_escalates_linearly() {
        let mut backoff = Backoff::new();

        for expected in 1..=4 {
            backoff.on_rate_limited();
            assert_eq!(skipped_before_next_call(&mut backoff), expected);
        }
    }

    #[test]
    fn success_resets_the_escalation() {
        let mut backoff = Backoff::new();

        backoff.on_rate_limited();
        backoff.on_rate_limited();
        assert_eq!(skipped_before_next_call(&mut backoff), 2);

        backoff.on_success();
        backoff.on_rate_limited();
        assert_eq!(skipped_before_next_call(&mut backoff), 1);
    }

    #[test]
    fn success_does_not_drain_a_pending_cooldown() {
        let mut backoff = Backoff::new();

        backoff.on_rate_limited();
        backoff.on_success();

        // the one pending skip still applies, only the growth was reset
        assert!(backoff.should_skip());
        assert!(!backoff.should_skip());
    }
}
