#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_screening::models::RawRecord;
use paper_screening::sources::parse_atom_feed;

fuzz_target!(|data: &[u8]| {
    // Arbitrary feed text must parse or fail, never panic
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(raw) = parse_atom_feed(text) {
            let _ = raw.into_iter().filter_map(RawRecord::into_record).count();
        }
    }
});
