use std::borrow::Cow;

/// Errors that can occur during event hub operations.
#[sgrid_derive::sgrid_error]
pub enum EventHubError {
    /// Capacity must be greater than zero for broadcast channels.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal event hub error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
