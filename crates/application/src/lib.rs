//! Glory-Hole Application Layer
//!
//! Orchestration only: the `HandleQueryUseCase` wires the ports together per
//! the handler state machine. No concrete storage, codec, or network type
//! appears here — those live behind the `ports` traits, implemented in
//! infrastructure.

pub mod ports;
pub mod use_cases;

pub use use_cases::HandleQueryUseCase;
