#![no_main]

use libfuzzer_sys::fuzz_target;
use paper_screening::models::{AnalysisResult, S2Paper, S2SearchResult};

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(paper) = serde_json::from_value::<S2Paper>(json.clone()) {
            let _ = paper.into_raw().into_record();
        }
        let _ = serde_json::from_value::<S2SearchResult>(json.clone());
        // Stored history is read back from disk
        let _ = serde_json::from_value::<Vec<AnalysisResult>>(json);
    }
});
