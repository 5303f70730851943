//! The host seam.
//!
//! The embedding runtime hands the session one [`HostBundle`] at
//! construction. Every capability is validated once, there; nothing in the
//! per-tick path checks for missing callbacks. The only optional capability
//! is the rumble device, which degrades to a no-op.

/// Logical buttons the host can report per controller port.
///
/// The turbo and solar entries are dedicated host buttons, not pass-throughs:
/// turbo buttons drive their base key through the shared square wave, and the
/// solar pair adjusts the session-wide luminance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostButton {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
    TurboA,
    TurboB,
    TurboR,
    TurboL,
    BrightenSolar,
    DarkenSolar,
}

/// Controller state provider. `poll` is called exactly once per tick, before
/// any `pressed` queries for that tick.
pub trait InputSource {
    /// Refresh controller state for this tick.
    fn poll(&mut self);

    /// Whether `button` is held on controller `port` (0-based).
    fn pressed(&self, port: usize, button: HostButton) -> bool;
}

/// Receives the composed frame once per tick. The pixel slice is only valid
/// for the duration of the call; the session overwrites it next tick.
pub trait VideoSink {
    /// Present one composed RGB565 frame. `stride` is the row pitch in
    /// pixels.
    fn present(&mut self, pixels: &[u16], width: u32, height: u32, stride: usize);
}

/// Receives one audio batch per tick: interleaved stereo `i16` pairs from
/// the first instance. Sessions never mix audio across instances.
pub trait AudioSink {
    /// Post `frames` stereo pairs from the start of `samples`.
    fn post(&mut self, samples: &[i16], frames: usize);
}

/// Host rumble motor pair. Strength is 0..=0xFFFF per channel.
pub trait RumbleDevice {
    /// Drive both motor channels.
    fn set_strength(&mut self, strong: u16, weak: u16);
}

/// Flat string-keyed option store with a change flag, polled once per tick.
pub trait OptionsSource {
    /// True when any option changed since the last call. Reading the flag
    /// clears it.
    fn take_update(&mut self) -> bool;

    /// Current value for `key`, if the host knows it.
    fn value(&self, key: &str) -> Option<String>;
}

/// Everything the session needs from the host, injected at construction.
pub struct HostBundle {
    /// Controller state.
    pub input: Box<dyn InputSource>,
    /// Composed frame consumer.
    pub video: Box<dyn VideoSink>,
    /// Audio batch consumer.
    pub audio: Box<dyn AudioSink>,
    /// Option store.
    pub options: Box<dyn OptionsSource>,
    /// Rumble device, if the host offers one.
    pub rumble: Option<Box<dyn RumbleDevice>>,
}
