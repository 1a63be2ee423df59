//! Step definition modules for Cucumber feature tests.

pub mod advice_pipeline;
pub mod aspect_ordering;
