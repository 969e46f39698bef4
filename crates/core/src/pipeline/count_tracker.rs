/// Remembers the last published people count so the display is only
/// touched when the number actually changes.
#[derive(Debug, Default)]
pub struct CountTracker {
    previous: Option<usize>,
}

impl CountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(count)` when it differs from the previous frame's
    /// count. The first call always publishes.
    pub fn update(&mut self, count: usize) -> Option<usize> {
        if self.previous == Some(count) {
            return None;
        }
        self.previous = Some(count);
        Some(count)
    }
}
