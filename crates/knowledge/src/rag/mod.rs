//! Grounded question answering.
//!
//! Per question: retrieve chunks, pick an [`AnswerStrategy`], synthesize an
//! answer along that strategy's path, then post-process it deterministically.
//!
//! [`AnswerStrategy`]: crate::types::AnswerStrategy

pub mod pipeline;
pub mod postprocess;
pub mod strategy;
pub mod synthesis;

pub use pipeline::{AskOptions, QaPipeline};
pub use strategy::{is_comparison_question, select_strategy};
pub use synthesis::Synthesizer;
