//! Scripted-session test harness.
//!
//! Pairs a fully deterministic machine core with recording host capabilities
//! so session behavior can be pinned down by digest: same ROM seed plus same
//! input script always yields the same pixels, audio and serialized state.
//! The binary runs one scripted session and emits a JSON [`report::RunReport`].

pub mod host;
pub mod report;
pub mod scripted;

pub use host::{InputScript, RecordingHost, ScriptedPad};
pub use report::RunReport;
pub use scripted::{ScriptedCore, ScriptedFactory};
