use std::time::Duration;

/// Abstraction over the host delay primitive to improve testability.
///
/// The ACK wait loop sleeps through this trait, so tests can substitute a
/// delay that only records elapsed time.
pub trait Delay {
    /// Blocks the caller for `duration`.
    fn delay(&mut self, duration: Duration);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    #[inline]
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}
