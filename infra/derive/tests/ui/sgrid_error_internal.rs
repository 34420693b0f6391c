use sgrid_derive::sgrid_error;
use std::borrow::Cow;

#[sgrid_error]
pub enum DemoError {
    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let from_str: DemoError = "static failure".into();
    assert!(from_str.to_string().contains("static failure"));

    let from_string: DemoError = String::from("owned failure").into();
    assert!(from_string.to_string().contains("owned failure"));
}
