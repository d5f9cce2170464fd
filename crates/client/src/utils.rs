//! Utility macros shared by the client engine.

/// Returns early with an error if a condition is not met.
///
/// Similar to `assert!`, but returns `Err($error)` instead of panicking. Used
/// by the codec and the request builder for limit and shape checks.
///
/// # Example
///
/// ```ignore
/// ensure!(header_count <= max_headers, ParseError::too_many_headers(max_headers));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
