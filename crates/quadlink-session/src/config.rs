//! Session configuration.
//!
//! The host exposes a flat string option store; this module gives every
//! option a closed enum of legal values and a tolerant reload path. A
//! malformed value is discarded with a warning and the previous value kept —
//! a bad option never reaches an instance and never aborts a tick.

use log::warn;
use quadlink_core::OptionsSource;

/// Option keys, as registered with the host.
pub mod option_key {
    pub const USE_BIOS: &str = "use_bios";
    pub const SKIP_BIOS: &str = "skip_bios";
    pub const IDLE_OPTIMIZATION: &str = "idle_optimization";
    pub const SOLAR_SENSOR_LEVEL: &str = "solar_sensor_level";
    pub const ALLOW_OPPOSING_DIRECTIONS: &str = "allow_opposing_directions";
    pub const TURBO_DELAY: &str = "turbo_delay";
    pub const VOLUME: &str = "volume";
}

/// Idle-loop removal strategy, forwarded to every instance's config map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IdleOptimization {
    /// Remove idle loops known from a database.
    #[default]
    RemoveKnown,
    /// Detect idle loops at runtime and remove them.
    DetectAndRemove,
    /// Leave idle loops alone.
    DontRemove,
}

impl IdleOptimization {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "Remove Known" => Some(Self::RemoveKnown),
            "Detect and Remove" => Some(Self::DetectAndRemove),
            "Don't Remove" => Some(Self::DontRemove),
            _ => None,
        }
    }

    /// Value understood by the core's config map.
    #[must_use]
    pub const fn core_value(self) -> &'static str {
        match self {
            Self::RemoveKnown => "remove",
            Self::DetectAndRemove => "detect",
            Self::DontRemove => "ignore",
        }
    }
}

/// Which opposing direction pairs may be held simultaneously.
///
/// The hardware pad cannot assert opposing directions at once; this is a
/// deliberate workaround layer in the input router, not a hardware feature.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OpposingDirections {
    /// Native behavior: opposing presses cancel each other.
    #[default]
    Disabled,
    /// Up and Down may be held together.
    UpAndDown,
    /// Left and Right may be held together.
    LeftAndRight,
    /// Both pairs may be held together.
    All,
}

impl OpposingDirections {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "disabled" => Some(Self::Disabled),
            "Up & Down" => Some(Self::UpAndDown),
            "Left & Right" => Some(Self::LeftAndRight),
            "All directions" => Some(Self::All),
            _ => None,
        }
    }

    /// Whether Up + Down may pass through together.
    #[must_use]
    pub const fn allows_vertical(self) -> bool {
        matches!(self, Self::UpAndDown | Self::All)
    }

    /// Whether Left + Right may pass through together.
    #[must_use]
    pub const fn allows_horizontal(self) -> bool {
        matches!(self, Self::LeftAndRight | Self::All)
    }
}

/// Turbo cadence. The half-period is the length in ticks of each asserted or
/// deasserted run of the synthetic square wave.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TurboDelay {
    #[default]
    Fast,
    Medium,
    Slow,
}

impl TurboDelay {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "Fast" => Some(Self::Fast),
            "Medium" => Some(Self::Medium),
            "Slow" => Some(Self::Slow),
            _ => None,
        }
    }

    /// Square-wave half-period in ticks.
    #[must_use]
    pub const fn half_period(self) -> u32 {
        match self {
            Self::Fast => 2,
            Self::Medium => 4,
            Self::Slow => 8,
        }
    }
}

/// Full-scale core volume (0x100 = 100%).
const VOLUME_MAX: u16 = 0x100;

/// Highest solar sensor level.
pub const SOLAR_LEVEL_MAX: u8 = 10;

/// Snapshot of every recognized option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Boot through a real BIOS image when one is supplied.
    pub use_bios: bool,
    /// Skip the BIOS intro animation.
    pub skip_bios: bool,
    /// Idle-loop removal strategy.
    pub idle_optimization: IdleOptimization,
    /// Solar sensor level, 0..=10.
    pub solar_level: u8,
    /// Opposing-direction pass-through.
    pub opposing_directions: OpposingDirections,
    /// Turbo cadence.
    pub turbo_delay: TurboDelay,
    /// Core volume, 0..=0x100.
    pub volume: u16,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_bios: true,
            skip_bios: false,
            idle_optimization: IdleOptimization::default(),
            solar_level: 0,
            opposing_directions: OpposingDirections::default(),
            turbo_delay: TurboDelay::default(),
            volume: VOLUME_MAX,
        }
    }
}

impl SessionOptions {
    /// Re-read every recognized option from the host store. Unknown or
    /// malformed values leave the previous value in place.
    pub fn reload(&mut self, source: &dyn OptionsSource) {
        if let Some(value) = source.value(option_key::USE_BIOS) {
            self.use_bios = value == "ON";
        }
        if let Some(value) = source.value(option_key::SKIP_BIOS) {
            self.skip_bios = value == "ON";
        }
        if let Some(value) = source.value(option_key::IDLE_OPTIMIZATION) {
            match IdleOptimization::parse(&value) {
                Some(idle) => self.idle_optimization = idle,
                None => warn!("unrecognized idle_optimization {value:?}, keeping previous"),
            }
        }
        if let Some(value) = source.value(option_key::SOLAR_SENSOR_LEVEL) {
            match value.parse::<i32>() {
                Ok(level) => self.solar_level = level.clamp(0, i32::from(SOLAR_LEVEL_MAX)) as u8,
                Err(_) => warn!("unparsable solar_sensor_level {value:?}, keeping previous"),
            }
        }
        if let Some(value) = source.value(option_key::ALLOW_OPPOSING_DIRECTIONS) {
            match OpposingDirections::parse(&value) {
                Some(mode) => self.opposing_directions = mode,
                None => {
                    warn!("unrecognized allow_opposing_directions {value:?}, keeping previous");
                }
            }
        }
        if let Some(value) = source.value(option_key::TURBO_DELAY) {
            match TurboDelay::parse(&value) {
                Some(delay) => self.turbo_delay = delay,
                None => warn!("unrecognized turbo_delay {value:?}, keeping previous"),
            }
        }
        if let Some(value) = source.value(option_key::VOLUME) {
            match value.strip_suffix('%').unwrap_or(&value).parse::<u32>() {
                Ok(percent) => {
                    let percent = percent.min(100);
                    self.volume = (percent * u32::from(VOLUME_MAX) / 100) as u16;
                }
                Err(_) => warn!("unparsable volume {value:?}, keeping previous"),
            }
        }
    }
}

/// One registrable option: key, human description, closed list of legal
/// values (first entry is the default).
#[derive(Debug, Clone, Copy)]
pub struct OptionDef {
    pub key: &'static str,
    pub description: &'static str,
    pub values: &'static [&'static str],
}

/// Every option the session recognizes, for host-side registration.
#[must_use]
pub const fn option_definitions() -> &'static [OptionDef] {
    &[
        OptionDef {
            key: option_key::USE_BIOS,
            description: "Use BIOS file if found",
            values: &["ON", "OFF"],
        },
        OptionDef {
            key: option_key::SKIP_BIOS,
            description: "Skip BIOS intro",
            values: &["OFF", "ON"],
        },
        OptionDef {
            key: option_key::IDLE_OPTIMIZATION,
            description: "Idle loop removal",
            values: &["Remove Known", "Detect and Remove", "Don't Remove"],
        },
        OptionDef {
            key: option_key::SOLAR_SENSOR_LEVEL,
            description: "Solar sensor level",
            values: &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"],
        },
        OptionDef {
            key: option_key::ALLOW_OPPOSING_DIRECTIONS,
            description: "Allow opposing directional input",
            values: &["disabled", "Up & Down", "Left & Right", "All directions"],
        },
        OptionDef {
            key: option_key::TURBO_DELAY,
            description: "Turbo button cadence",
            values: &["Fast", "Medium", "Slow"],
        },
        OptionDef {
            key: option_key::VOLUME,
            description: "Audio volume",
            values: &[
                "100%", "90%", "80%", "70%", "60%", "50%", "40%", "30%", "20%", "10%", "0%",
            ],
        },
    ]
}
