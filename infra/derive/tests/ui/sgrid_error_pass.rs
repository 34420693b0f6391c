use sgrid_derive::sgrid_error;
use std::borrow::Cow;

#[sgrid_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: DemoError = std::io::Error::other("boom").into();
    assert!(err.to_string().contains("IO error"));

    let with_context: Result<(), DemoError> =
        Err(std::io::Error::other("boom")).context("reading record");
    assert!(with_context.unwrap_err().to_string().contains("(reading record)"));
}
