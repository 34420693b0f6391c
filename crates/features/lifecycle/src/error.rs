use std::borrow::Cow;

/// Error types specific to the lifecycle feature.
///
/// Operation failures are synchronous: an illegal transition rejects the
/// operation with a description and leaves the server state untouched.
#[sgrid_derive::sgrid_error]
pub enum LifecycleError {
    /// No managed server registered under that name.
    #[error("Unknown server{}: {message}", format_context(.context))]
    UnknownServer { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The requested operation is not legal in the server's current state.
    #[error("Operation failed{}: {message}", format_context(.context))]
    OperationFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal lifecycle error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
