use std::time::{Duration, Instant};

/// Delay between a page render and the scroll to the first text match.
pub const HIGHLIGHT_SCROLL_DELAY: Duration = Duration::from_millis(60);

/// Lets an auto-scroll happen once per distinct key.
#[derive(Debug, Clone)]
pub struct ScrollOnce<K> {
    last: Option<K>,
}

impl<K> Default for ScrollOnce<K> {
    fn default() -> Self {
        ScrollOnce { last: None }
    }
}

impl<K: PartialEq + Clone> ScrollOnce<K> {
    /// True the first time a key is seen since the previous different key.
    pub fn should_scroll(&mut self, key: &K) -> bool {
        if self.last.as_ref() == Some(key) {
            return false;
        }
        self.last = Some(key.clone());
        true
    }
}

/// Single pending deadline; re-scheduling pushes it back.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    due: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Debounce { delay, due: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// True once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
