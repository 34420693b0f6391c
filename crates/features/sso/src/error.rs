use std::borrow::Cow;

/// Error types specific to the single sign-on feature.
#[sgrid_derive::sgrid_error]
pub enum SsoError {
    /// The SSO entry does not exist (or was already expired).
    #[error("SSO entry not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Single sign-on is disabled by configuration.
    #[error("SSO disabled{}: {message}", format_context(.context))]
    Disabled { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal SSO error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
