//! Boundary traits and types for multi-instance link sessions.
//!
//! Two seams live here. `machine` is the capability set the session consumes
//! from a single-instance handheld core. `host` is the capability bundle the
//! embedding runtime injects into the session. Neither side sees the other's
//! internals.

mod host;
mod machine;

pub use host::{
    AudioSink, HostBundle, HostButton, InputSource, OptionsSource, RumbleDevice, VideoSink,
};
pub use machine::{
    CoreFactory, MachineCore, MemoryRegion, Platform, SAVE_BUFFER_SIZE, SaveKind, SaveRam,
    VideoDimensions,
};
