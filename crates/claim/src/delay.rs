use std::sync::{Arc, Barrier};
use std::time::Duration;

/// Something a claimer does between reading its row and writing it.
///
/// For the locking variant this happens with the lock held.  Durations sleep, which is what the demos use.  Barriers
/// make several claimers wait for each other, which is how tests force every non-locking claimer past its read before
/// any of them writes.
pub trait WorkDelay: std::fmt::Debug + Send + Sync {
    fn hold(&self, row_id: i64);
}

impl WorkDelay for Duration {
    fn hold(&self, _row_id: i64) {
        if !self.is_zero() {
            std::thread::sleep(*self);
        }
    }
}

impl WorkDelay for Barrier {
    fn hold(&self, _row_id: i64) {
        self.wait();
    }
}

impl<T: WorkDelay + ?Sized> WorkDelay for Arc<T> {
    fn hold(&self, row_id: i64) {
        (**self).hold(row_id)
    }
}

impl<T: WorkDelay + ?Sized> WorkDelay for &T {
    fn hold(&self, row_id: i64) {
        (**self).hold(row_id)
    }
}
