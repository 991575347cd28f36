//! Assertions over request results

/// Assert that a request result succeeded and unwrap its output
#[macro_export]
macro_rules! assert_request_ok {
    ($result:expr) => {
        match &$result.outcome {
            chroma_types::app::RequestOutcome::Success(out) => out.clone(),
            chroma_types::app::RequestOutcome::Failure { code, reason } => {
                panic!("Expected request success, got {}: {}", code, reason)
            }
        }
    };
}

/// Assert that a request result failed with the given error code
#[macro_export]
macro_rules! assert_request_failed {
    ($result:expr, $code:expr) => {
        match &$result.outcome {
            chroma_types::app::RequestOutcome::Failure { code, .. } => {
                assert_eq!(code.as_str(), $code, "unexpected failure code")
            }
            chroma_types::app::RequestOutcome::Success(out) => {
                panic!("Expected request failure {}, got success: {:?}", $code, out)
            }
        }
    };
}
