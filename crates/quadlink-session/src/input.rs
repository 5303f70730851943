//! Input routing.
//!
//! Maps host controller state onto the hardware-native 16-bit key word, with
//! two synthetic layers on top: turbo buttons driven by a shared square wave,
//! and an opposing-directions workaround that the real pad cannot express.

use quadlink_core::{HostButton, InputSource};

use crate::config::{OpposingDirections, SessionOptions, TurboDelay};
use crate::instances::MAX_INSTANCES;

/// Key word bit positions, hardware-native order.
pub mod key {
    pub const A: u16 = 0;
    pub const B: u16 = 1;
    pub const SELECT: u16 = 2;
    pub const START: u16 = 3;
    pub const RIGHT: u16 = 4;
    pub const LEFT: u16 = 5;
    pub const UP: u16 = 6;
    pub const DOWN: u16 = 7;
    pub const R: u16 = 8;
    pub const L: u16 = 9;
}

/// Direct (non-turbo) button-to-bit mapping.
const DIRECT_KEYS: [(HostButton, u16); 10] = [
    (HostButton::A, key::A),
    (HostButton::B, key::B),
    (HostButton::Select, key::SELECT),
    (HostButton::Start, key::START),
    (HostButton::Right, key::RIGHT),
    (HostButton::Left, key::LEFT),
    (HostButton::Up, key::UP),
    (HostButton::Down, key::DOWN),
    (HostButton::R, key::R),
    (HostButton::L, key::L),
];

/// Turbo button-to-bit mapping. Turbo buttons drive the same bits as their
/// base buttons, but only while the square wave is in its asserted phase.
const TURBO_KEYS: [(HostButton, u16); 4] = [
    (HostButton::TurboA, key::A),
    (HostButton::TurboB, key::B),
    (HostButton::TurboR, key::R),
    (HostButton::TurboL, key::L),
];

/// Synthetic rapid-fire square wave shared by every turbo button.
///
/// The wave alternates between deasserted and asserted runs of exactly one
/// half-period each, starting deasserted, independent of how long any host
/// button is actually held.
#[derive(Debug)]
pub struct TurboState {
    half_period: u32,
    counter: u32,
    asserted: bool,
}

impl TurboState {
    #[must_use]
    pub fn new(delay: TurboDelay) -> Self {
        Self {
            half_period: delay.half_period(),
            counter: 0,
            asserted: false,
        }
    }

    /// Change the cadence. The current phase is kept; the run length counter
    /// restarts so the next run has the new length.
    pub fn set_delay(&mut self, delay: TurboDelay) {
        let half_period = delay.half_period();
        if half_period != self.half_period {
            self.half_period = half_period;
            self.counter = 0;
        }
    }

    /// Advance one tick and return whether this tick is in the asserted
    /// phase.
    pub fn tick(&mut self) -> bool {
        let asserted = self.asserted;
        self.counter += 1;
        if self.counter >= self.half_period {
            self.counter = 0;
            self.asserted = !self.asserted;
        }
        asserted
    }
}

/// Per-tick router from host ports to per-instance key words.
#[derive(Debug)]
pub struct InputRouter {
    turbo: TurboState,
    opposing: OpposingDirections,
}

impl InputRouter {
    #[must_use]
    pub fn new(options: &SessionOptions) -> Self {
        Self {
            turbo: TurboState::new(options.turbo_delay),
            opposing: options.opposing_directions,
        }
    }

    /// Re-apply reloaded options.
    pub fn apply_options(&mut self, options: &SessionOptions) {
        self.turbo.set_delay(options.turbo_delay);
        self.opposing = options.opposing_directions;
    }

    /// Compute the key word for every instance for this tick.
    ///
    /// With link wiring live, port i maps 1:1 onto instance i. Without it,
    /// every port collapses onto instance 0 — extra instances exist for
    /// display composition, not independent players — and the remaining
    /// instances see no input.
    pub fn route(
        &mut self,
        input: &dyn InputSource,
        count: usize,
        linked: bool,
    ) -> [u16; MAX_INSTANCES] {
        let turbo_phase = self.turbo.tick();
        let mut keys = [0u16; MAX_INSTANCES];
        if linked {
            for (port, word) in keys.iter_mut().enumerate().take(count) {
                *word = self.port_keys(input, port, turbo_phase);
            }
        } else {
            for port in 0..count {
                keys[0] |= self.port_keys(input, port, turbo_phase);
            }
        }
        keys
    }

    fn port_keys(&self, input: &dyn InputSource, port: usize, turbo_phase: bool) -> u16 {
        let mut word = 0u16;
        for (button, bit) in DIRECT_KEYS {
            if input.pressed(port, button) {
                word |= 1 << bit;
            }
        }
        if turbo_phase {
            for (button, bit) in TURBO_KEYS {
                if input.pressed(port, button) {
                    word |= 1 << bit;
                }
            }
        }
        self.resolve_opposing(word)
    }

    /// Enforce the pad's native restriction on whichever opposing pairs the
    /// configuration has not relaxed: both held means neither asserted.
    fn resolve_opposing(&self, mut word: u16) -> u16 {
        const HORIZONTAL: u16 = 1 << key::RIGHT | 1 << key::LEFT;
        const VERTICAL: u16 = 1 << key::UP | 1 << key::DOWN;
        if !self.opposing.allows_horizontal() && word & HORIZONTAL == HORIZONTAL {
            word &= !HORIZONTAL;
        }
        if !self.opposing.allows_vertical() && word & VERTICAL == VERTICAL {
            word &= !VERTICAL;
        }
        word
    }
}
