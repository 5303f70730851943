//! Lockstep multi-instance session orchestration.
//!
//! A [`Session`] drives 1..=4 fully independent machine cores created from
//! one ROM image and presents them to the host as a single emulated device:
//! one composed frame, one audio stream, one aggregate savestate, one shared
//! cartridge save RAM. Instances advance in lockstep, one frame per host
//! tick, strictly in index order.
//!
//! The host side is injected through `quadlink-core`'s capability traits;
//! the machine side through its `MachineCore` and `CoreFactory` seams. This
//! crate owns everything in between: instance lifetime, the frame clock,
//! input routing (including turbo and opposing-direction handling), video
//! compositing, shared peripherals (solar sensor, rumble PWM), serialization
//! and serial-link wiring.

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod instances;
pub mod link;
pub mod peripherals;
pub mod session;
pub mod state;
pub mod video;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{IdleOptimization, OpposingDirections, SessionOptions, TurboDelay};
pub use error::{LoadError, StateError};
pub use instances::{CoreInstance, InstanceSet, MAX_INSTANCES};
pub use link::LinkMode;
pub use session::{AvInfo, MemoryMapDescriptor, Session, SessionConfig};
pub use video::{LayoutPolicy, PresentedFrame};
