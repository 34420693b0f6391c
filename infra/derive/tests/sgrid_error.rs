#[test]
fn sgrid_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/sgrid_error_pass.rs");
    t.pass("tests/ui/sgrid_error_internal.rs");
}
