//! Serial-link wiring.
//!
//! Applied once, at load time. The session only triggers the hub attach on
//! instance 0; the cores' own link-list mechanism wires the remaining
//! instances symmetrically, and all bit-transfer timing lives inside the
//! cores. Without wiring, instances have no cross-instance data path and the
//! extra instances exist purely for display composition.

use log::{info, warn};

use crate::instances::InstanceSet;

/// Whether a session carries a link cable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Display composition only: no cross-instance data path, all controller
    /// ports collapse onto instance 0.
    #[default]
    Broadcast,
    /// Hardware link cable: serial hub attached, port i drives instance i.
    Cable,
}

/// Attach the serial hub if the mode asks for one. Returns whether the
/// session ended up wired.
pub fn wire(set: &mut InstanceSet, mode: LinkMode) -> bool {
    match mode {
        LinkMode::Broadcast => false,
        LinkMode::Cable => {
            if set.first_mut().core_mut().attach_serial_hub() {
                info!("serial hub attached, {} station(s)", set.len());
                true
            } else {
                warn!("platform has no serial port, continuing unwired");
                false
            }
        }
    }
}
