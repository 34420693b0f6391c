use std::borrow::Cow;

/// Error types specific to the routing feature.
#[sgrid_derive::sgrid_error]
pub enum RoutingError {
    /// Affinity configuration rejected (empty delimiter, zero max-routes).
    #[error("Invalid affinity configuration{}: {message}", format_context(.context))]
    InvalidAffinity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Route location requested for an undeclared session-management instance.
    #[error("Unknown session manager{}: {message}", format_context(.context))]
    UnknownManager { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal routing error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
