#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        // The full preprocess + parse + lower pipeline should never panic.
        let Ok(expanded) = glint_parser::preprocess(source, glint_parser::Dialect::Core) else {
            return;
        };
        let Ok(ast) = glint_parser::parse(&expanded.text) else {
            return;
        };
        let mut diags = glint_ir::DiagnosticLog::new();
        let _ = glint_parser::lower(&ast, glint_ir::Stage::Fragment, &mut diags);
    }
});
