//! Panic containment for user-supplied callbacks.
//!
//! Event handlers are arbitrary caller code running on the connection task.
//! A panic in one of them must not take the connection down or starve the
//! handlers registered after it, so every invocation goes through
//! [`invoke_isolated`].

use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to `Debug` formatting otherwise.
///
/// ```
/// use tether::panic::format_panic;
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(
///     format_panic(Box::new(String::from("boom"))).to_string(),
///     "boom"
/// );
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Create a [`PanicMessage`] for the given payload.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

/// Run `f`, converting a panic into an error instead of unwinding further.
///
/// # Errors
///
/// Returns the formatted panic payload if `f` panicked.
///
/// # Examples
///
/// ```
/// use tether::panic::invoke_isolated;
///
/// assert!(invoke_isolated(|| ()).is_ok());
/// let err = invoke_isolated(|| panic!("handler blew up")).unwrap_err();
/// assert_eq!(err.to_string(), "handler blew up");
/// ```
pub fn invoke_isolated(f: impl FnOnce()) -> Result<(), PanicMessage> {
    catch_unwind(AssertUnwindSafe(f)).map_err(format_panic)
}
