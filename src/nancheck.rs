//! Process-wide switch for the NaN input screen of the high-level interface.
//!
//! The screen defaults to on. Setting the `ZGESDD_SHIM_NANCHECK` environment
//! variable to `0` disables it for the whole process; [`set_nancheck`]
//! overrides either source at run time.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::OnceLock;

// -1 means "not overridden": fall back to the environment
static OVERRIDE: AtomicI32 = AtomicI32::new(-1);
static FROM_ENV: OnceLock<bool> = OnceLock::new();

/// Forces the NaN screen on or off for the rest of the process.
pub fn set_nancheck(enabled: bool) {
    OVERRIDE.store(enabled as i32, Ordering::Relaxed);
}

/// Whether the high-level interface screens its input for NaN entries.
pub fn get_nancheck() -> bool {
    match OVERRIDE.load(Ordering::Relaxed) {
        0 => false,
        1 => true,
        _ => *FROM_ENV.get_or_init(|| match std::env::var("ZGESDD_SHIM_NANCHECK") {
            Ok(value) => value != "0",
            Err(_) => true,
        }),
    }
}

// serializes the tests that flip the process-wide switch
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_round_trips() {
        let _guard = TEST_LOCK.lock().unwrap();
        set_nancheck(false);
        assert!(!get_nancheck());
        set_nancheck(true);
        assert!(get_nancheck());
    }
}
