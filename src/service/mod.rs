//! The voting flow, independent of HTTP: issuing secret IDs, recording
//! ballots against them, and reporting on what was recorded.

pub mod issuer;
pub mod recorder;
pub mod reporting;
