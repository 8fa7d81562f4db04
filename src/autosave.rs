//! Shared pieces of the optimistic-save contract: the request
//! generation guard for lookups, the transient indicator state, and
//! the derived done-flag rule.

use std::cell::Cell;
use std::rc::Rc;

/// Monotonic generation counter for async lookups. Each issued request
/// takes `next()`; a response is applied only if its generation is
/// still current, so a slow stale response can never overwrite a newer
/// result (last-issued-wins, not last-completed-wins).
#[derive(Clone, Default)]
pub struct RequestGen {
    counter: Rc<Cell<u64>>,
}

impl RequestGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let gen = self.counter.get() + 1;
        self.counter.set(gen);
        gen
    }

    pub fn is_current(&self, gen: u64) -> bool {
        self.counter.get() == gen
    }
}

/// Transient per-field indicator shown while a debounced write is in
/// flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Failed,
}

/// A set counts as done once both a weight and a reps value are
/// present. Recomputed whenever both debounced inputs settle, and it
/// wins over a manual toggle at that point.
pub fn derived_done(weight: Option<f64>, reps: Option<u32>) -> bool {
    weight.is_some() && reps.is_some()
}

/// Whether a locally persisted draft should be offered over the server
/// row it shadows.
pub fn draft_is_newer(draft_updated_at: i64, server_updated_at: i64) -> bool {
    draft_updated_at > server_updated_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_is_discarded() {
        let gen = RequestGen::new();
        let a = gen.next();
        let b = gen.next();
        // B resolves first and is applied; A resolves later and is not.
        assert!(gen.is_current(b));
        assert!(!gen.is_current(a));
    }

    #[test]
    fn each_issue_invalidates_the_previous() {
        let gen = RequestGen::new();
        let first = gen.next();
        assert!(gen.is_current(first));
        let second = gen.next();
        assert!(!gen.is_current(first));
        assert!(gen.is_current(second));
    }

    #[test]
    fn clones_share_the_counter() {
        let gen = RequestGen::new();
        let other = gen.clone();
        let a = gen.next();
        assert!(other.is_current(a));
        let b = other.next();
        assert!(!gen.is_current(a));
        assert!(gen.is_current(b));
    }

    #[test]
    fn done_requires_both_weight_and_reps() {
        assert!(!derived_done(None, None));
        assert!(!derived_done(Some(60.0), None));
        assert!(!derived_done(None, Some(8)));
        assert!(derived_done(Some(60.0), Some(8)));
    }

    #[test]
    fn draft_wins_only_when_strictly_newer() {
        assert!(draft_is_newer(200, 100));
        assert!(!draft_is_newer(100, 100));
        assert!(!draft_is_newer(50, 100));
    }
}
