//! # Reporter Module
//!
//! Explains WHY a document received its verdict.
//!
//! A bare score is hard to act on. The reporter turns an
//! [`AnalysisResult`](crate::core::aggregator::AnalysisResult) into a one-line
//! summary plus a plain-language finding per feature, most suspicious first.

mod explanation;

pub use explanation::{explain, Finding, SignalLevel, VerdictExplanation};
