#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_screening::analysis::{finalize_payload, parse_response};
use paper_screening::models::{AnalysisVariant, RawRecord, SourceId};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Whatever the parser recovers must finalize into a bounded payload
    if let Ok(parsed) = parse_response(text) {
        let Some(paper) = RawRecord {
            title: Some("Fuzzed".to_string()),
            ..RawRecord::new(SourceId::Generic)
        }
        .into_record() else {
            return;
        };
        let payload =
            finalize_payload(parsed.fields, &paper, parsed.origin, AnalysisVariant::Extended);
        assert!((0.0..=1.0).contains(&payload.confidence));
    }
});
