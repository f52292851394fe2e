//! Stable error codes shared by every error enum in the crate.
//!
//! DESIGN
//! ======
//! Callers (the CLI, a UI layer) branch on `error_code()` rather than on
//! display strings. `retryable()` marks transient failures so the caller
//! can decide whether to surface a retry affordance.

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
