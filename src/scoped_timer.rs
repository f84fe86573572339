use std::time::Instant;

use tracing::trace;

pub(crate) struct ScopedTimer {
    start: Instant,
    op: &'static str,
}

impl ScopedTimer {
    pub(crate) fn new(op: &'static str) -> Self {
        Self {
            start: Instant::now(),
            op,
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        trace!(target: "timing", op = self.op, elapsed_ms, "operation finished");
    }
}
