#![no_main]

use addrform_core::{EditGate, Field, FormSnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let accepted = EditGate::filter(Field::PostalCode, &text, &FormSnapshot::empty()).is_accept();
    let well_formed = text.chars().count() <= 7 && text.chars().all(|c| c.is_ascii_digit());
    assert_eq!(accepted, well_formed);
});
