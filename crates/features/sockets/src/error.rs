use std::borrow::Cow;

/// Error types specific to the sockets feature.
#[sgrid_derive::sgrid_error]
pub enum SocketsError {
    /// A criterion could not be compiled (bad regex, malformed subnet, etc).
    #[error("Invalid criterion{}: {message}", format_context(.context))]
    InvalidCriterion { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No enumerated (interface, address) pair satisfied the criteria.
    #[error("No matching interface{}: {message}", format_context(.context))]
    NoMatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A binding referenced an interface name that is not declared.
    #[error("Unknown interface reference{}: {message}", format_context(.context))]
    UnknownInterface { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A socket binding is malformed (bad multicast address, port overflow, etc).
    #[error("Invalid socket binding{}: {message}", format_context(.context))]
    InvalidBinding { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Interface enumeration failed at the OS level.
    #[error("Interface enumeration failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal sockets error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
