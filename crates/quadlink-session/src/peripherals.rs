//! Shared environmental peripherals.
//!
//! One solar luminance level and one rumble duty window serve the whole
//! session: every instance reads the same light and drives the same motor
//! pair, the way a stack of consoles on one desk would.

use quadlink_core::{HostButton, InputSource, RumbleDevice};

use crate::config::SOLAR_LEVEL_MAX;
use crate::instances::InstanceSet;

/// Sensor intensity added per level above zero. Indexed by `level - 1`.
pub const LUX_LEVELS: [u8; 10] = [5, 11, 18, 27, 42, 62, 84, 109, 139, 183];

/// Sensor intensity at level 0 (darkness floor).
const LUX_BASE: u8 = 0x16;

/// Simulated ambient-light sensor with host-button adjustment.
///
/// The sensor byte has native polarity: a brighter level yields a lower raw
/// value, because the hardware reports the complement of the measured
/// intensity.
#[derive(Debug)]
pub struct SolarSensor {
    level: u8,
    adjusting: bool,
}

impl SolarSensor {
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(SOLAR_LEVEL_MAX),
            adjusting: false,
        }
    }

    /// Current level, 0..=10.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Set the level directly (option reload path).
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(SOLAR_LEVEL_MAX);
    }

    /// Process the brighten/darken buttons for one tick.
    ///
    /// Edge-triggered: a held button advances the level exactly once, then
    /// the latch suppresses auto-repeat until both buttons are released.
    pub fn adjust(&mut self, brighten: bool, darken: bool) {
        if self.adjusting {
            self.adjusting = brighten || darken;
        } else if brighten {
            self.level = (self.level + 1).min(SOLAR_LEVEL_MAX);
            self.adjusting = true;
        } else if darken {
            self.level = self.level.saturating_sub(1);
            self.adjusting = true;
        }
    }

    /// Raw sensor byte for the current level, native polarity.
    #[must_use]
    pub fn read_raw(&self) -> u8 {
        let mut intensity = LUX_BASE;
        if self.level > 0 {
            intensity += LUX_LEVELS[usize::from(self.level) - 1];
        }
        0xFF - intensity
    }
}

/// Rumble PWM window length in ticks.
pub const RUMBLE_WINDOW: usize = 35;

/// Fixed-capacity circular window of per-tick motor samples.
///
/// The cartridge toggles its motor much faster than a host rumble device can
/// follow, so the duty cycle over the last [`RUMBLE_WINDOW`] ticks becomes
/// the delivered strength. Writing at capacity evicts exactly the oldest
/// sample.
#[derive(Debug)]
pub struct RumblePwm {
    window: [bool; RUMBLE_WINDOW],
    head: usize,
    len: usize,
    active: usize,
}

impl RumblePwm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            window: [false; RUMBLE_WINDOW],
            head: 0,
            len: 0,
            active: 0,
        }
    }

    /// Drop all history (session reset).
    pub fn clear(&mut self) {
        self.window = [false; RUMBLE_WINDOW];
        self.head = 0;
        self.len = 0;
        self.active = 0;
    }

    /// Record one tick's motor sample.
    pub fn push(&mut self, enabled: bool) {
        if self.len == RUMBLE_WINDOW {
            if self.window[self.head] {
                self.active -= 1;
            }
            self.window[self.head] = enabled;
            self.head = (self.head + 1) % RUMBLE_WINDOW;
        } else {
            self.window[(self.head + self.len) % RUMBLE_WINDOW] = enabled;
            self.len += 1;
        }
        if enabled {
            self.active += 1;
        }
    }

    /// Current duty as a motor strength, rounded to the nearest step of
    /// 0xFFFF / window.
    #[must_use]
    pub fn strength(&self) -> u16 {
        ((self.active * 0xFFFF + RUMBLE_WINDOW / 2) / RUMBLE_WINDOW) as u16
    }
}

impl Default for RumblePwm {
    fn default() -> Self {
        Self::new()
    }
}

/// Distributes shared peripheral state to every instance each tick.
#[derive(Debug)]
pub struct PeripheralBroadcaster {
    solar: SolarSensor,
    rumble: RumblePwm,
}

impl PeripheralBroadcaster {
    #[must_use]
    pub fn new(solar_level: u8) -> Self {
        Self {
            solar: SolarSensor::new(solar_level),
            rumble: RumblePwm::new(),
        }
    }

    /// Direct access for option reload and inspection.
    pub fn solar_mut(&mut self) -> &mut SolarSensor {
        &mut self.solar
    }

    #[must_use]
    pub fn solar(&self) -> &SolarSensor {
        &self.solar
    }

    /// Drop rumble history (session reset).
    pub fn clear_rumble(&mut self) {
        self.rumble.clear();
    }

    /// Pre-step phase: adjust the level from the port-0 solar buttons and
    /// broadcast the resulting sensor byte to every instance.
    pub fn broadcast_solar(&mut self, input: &dyn InputSource, set: &mut InstanceSet) {
        self.solar.adjust(
            input.pressed(0, HostButton::BrightenSolar),
            input.pressed(0, HostButton::DarkenSolar),
        );
        let raw = self.solar.read_raw();
        for instance in set.iter_mut() {
            instance.core_mut().set_luminance(raw);
        }
    }

    /// Post-step phase: sample the motors (any instance asserting counts)
    /// and drive the host device. Without a device this is a silent no-op.
    ///
    /// The device is the host-owned trait object, so the parameter keeps the
    /// owned `'static` bound rather than eliding it to the borrow.
    pub fn sample_rumble(
        &mut self,
        set: &InstanceSet,
        device: Option<&mut (dyn RumbleDevice + 'static)>,
    ) {
        let Some(device) = device else {
            return;
        };
        let enabled = set.iter().any(|instance| instance.core().rumble_active());
        self.rumble.push(enabled);
        let strength = self.rumble.strength();
        device.set_strength(strength, strength);
    }
}
