// Panic isolation for completion handlers
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Run `f`, turning a panic into `Err(message)`
///
/// Handlers run while the dispatcher lock is held; catching here keeps the
/// executor thread that delivered the completion alive.
pub fn execute_guarded<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Ok(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Completion handler panicked");
            Err(panic_msg)
        }
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_passes_through() {
        assert_eq!(execute_guarded(|| 41 + 1), Ok(42));
    }

    #[test]
    fn test_panic_is_caught() {
        let result: Result<(), String> = execute_guarded(|| panic!("handler exploded"));
        assert_eq!(result, Err("handler exploded".to_string()));

        let result: Result<(), String> = execute_guarded(|| panic!("job {} failed", 7));
        assert_eq!(result, Err("job 7 failed".to_string()));
    }
}
