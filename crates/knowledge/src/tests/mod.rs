//! Crate-level tests that wire several modules together.

mod answer_scenarios;
mod support;
