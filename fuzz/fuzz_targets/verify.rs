#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(program) = kinduct_ir::compile_source(s) {
            if let Ok(tasks) = program.tasks() {
                let config = kinduct_symbolic::SymbolicConfig::default()
                    .with_max_depth(3)
                    .with_timeout_ms(1_000);
                for task in &tasks {
                    let _ = kinduct_symbolic::verify(task, &config);
                }
            }
        }
    }
});
