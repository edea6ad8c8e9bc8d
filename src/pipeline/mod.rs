//! Orchestration layer: components 4.F (Sanitize) and 4.G (Reveal), each
//! composing the lower-level modules into the one call [`crate::AegisEngine`]
//! exposes for it.

pub mod reveal;
pub mod sanitize;
