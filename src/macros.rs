//! Internal helper macros.
//!
//! Lock acquisition helpers shared across the crate. A poisoned lock means another
//! thread panicked while holding it; the cached data behind these locks is always
//! recomputable, so the guard is recovered instead of propagating the poison.

/// Acquires a `Mutex`, recovering the guard if the mutex was poisoned.
macro_rules! lock {
    ($lock:expr) => {
        $lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
