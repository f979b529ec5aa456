//! `vigil` — a sustained-attention session engine.
//!
//! Presents digit stimuli under strict timing, scores go/no-go responses,
//! estimates an attention-risk score from rolling robust statistics, and
//! drives a fixed phase sequence with surveys, exports, and a
//! crash-tolerant finish path. Rendering, input, haptics, and persistence
//! are ports (see [`ports`]); the engine itself is host-agnostic.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod ports;
pub mod session;
pub mod sim;
