//! Admission decision logic for the Pod `service` label webhook.
//!
//! A call flows through [`decoder::decode`], then [`engine::Engine::decide`], and the resulting
//! [`admission::AdmissionDecision`] is turned back into an `AdmissionReview` by the HTTP layer.

pub mod admission;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod label;
pub mod patch;
pub mod pod;
