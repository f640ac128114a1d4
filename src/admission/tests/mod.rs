// src/admission/tests/mod.rs
//! Tests for admission control


pub(crate) mod utils {
    use std::time::Duration;

    use crate::admission::{AdmissionGate, AdmissionLimits};

    pub fn gate(max_concurrent: usize, max_per_window: usize) -> AdmissionGate {
        AdmissionGate::new(AdmissionLimits {
            enabled: true,
            max_concurrent,
            max_per_window,
            window: Duration::from_secs(60),
        })
    }
}
