#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(script) = kinduct_syntax::parse(s) {
            if let Ok(program) = kinduct_ir::compile(&script) {
                let _ = program.tasks();
            }
        }
    }
});
