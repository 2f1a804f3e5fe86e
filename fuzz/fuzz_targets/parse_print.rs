#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(script) = kinduct_syntax::parse(s) {
            let printed = kinduct_syntax::pretty_print(&script);
            let reparsed = kinduct_syntax::parse(&printed).expect("printed script must parse");
            assert_eq!(printed, kinduct_syntax::pretty_print(&reparsed));
        }
    }
});
