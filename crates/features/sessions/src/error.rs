use std::borrow::Cow;

/// Error types specific to the sessions feature.
#[sgrid_derive::sgrid_error]
pub enum SessionsError {
    /// The session is neither active nor passivated.
    #[error("Session not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Passivation store failure.
    #[error("Passivation store error{}: {source}", format_context(.context))]
    Store { source: sgrid_store::StoreError, context: Option<Cow<'static, str>> },

    /// Session record (de)serialization failure.
    #[error("Record codec error{}: {source}", format_context(.context))]
    Codec { source: postcard::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal sessions error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
