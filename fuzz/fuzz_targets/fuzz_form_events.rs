#![no_main]

use addrform_core::clock::{Clock, LabClock};
use addrform_core::{Field, Validity};
use addrform_runtime::{AddressForm, PipelineConfig};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use web_time::Duration;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzField {
    PostalCode,
    Prefecture,
    City,
    Town,
    Building,
}

impl From<FuzzField> for Field {
    fn from(f: FuzzField) -> Self {
        match f {
            FuzzField::PostalCode => Field::PostalCode,
            FuzzField::Prefecture => Field::Prefecture,
            FuzzField::City => Field::City,
            FuzzField::Town => Field::Town,
            FuzzField::Building => Field::Building,
        }
    }
}

#[derive(Arbitrary, Debug)]
enum FuzzEvent {
    Edit(FuzzField, String),
    CompositionStart(FuzzField),
    CompositionEnd(FuzzField, String),
    Wait(u16),
    Submit,
    Close,
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let lab = LabClock::new();
    let mut form = AddressForm::with_clock(PipelineConfig::default(), Clock::lab(&lab));
    for event in events.into_iter().take(512) {
        match event {
            FuzzEvent::Edit(f, v) => {
                form.on_field_edit(f.into(), &v);
            }
            FuzzEvent::CompositionStart(f) => form.on_composition_start(f.into()),
            FuzzEvent::CompositionEnd(f, v) => form.on_composition_end(f.into(), &v),
            FuzzEvent::Wait(ms) => {
                lab.advance(Duration::from_millis(u64::from(ms)));
                form.poll();
            }
            FuzzEvent::Submit => {
                let _ = form.on_submit();
            }
            FuzzEvent::Close => form.close(),
        }
        let postal = form.snapshot().postal_code().to_owned();
        assert!(postal.len() <= 7 && postal.bytes().all(|b| b.is_ascii_digit()));
    }

    // Once settled, an open form's flag matches the predicate over what the
    // display shows.
    if !form.is_closed() && !form.is_composing() {
        form.flush();
        assert_eq!(form.is_valid(), Validity::evaluate(&form.snapshot()));
    }
});
