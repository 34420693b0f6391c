use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[sgrid_derive::sgrid_error]
pub enum StoreError {
    #[error("Record not found{}: {message}", format_context(.context))]
    RecordNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Namespace or record names outside the safe alphabet.
    #[error("Invalid name{}: {message}", format_context(.context))]
    InvalidName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Decompression failure{}: {source}", format_context(.context))]
    Decompress { source: lz4_flex::block::DecompressError, context: Option<Cow<'static, str>> },
}
