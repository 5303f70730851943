//! The machine-core seam.
//!
//! A `MachineCore` is one fully independent emulated handheld: CPU, video,
//! audio, cartridge and peripherals behind a frame-granular interface. The
//! session never reaches into board state directly; everything it needs is a
//! method here, gated by the platform tag where the platforms differ.

use std::cell::RefCell;
use std::rc::Rc;

/// Which handheld a core emulates. Closed set; probing a ROM yields one of
/// these or fails the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// 32-bit handheld with the 240x160 panel and the link/solar peripherals.
    Advance,
    /// The 8-bit predecessor (and its color revision).
    Classic,
}

/// Native panel geometry of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
}

/// Detected cartridge save-memory kind. Sizes are fixed per kind; the backing
/// buffer is always allocated at [`SAVE_BUFFER_SIZE`] and reported at the
/// detected size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveKind {
    /// 1 Mbit flash (also the autodetect fallback).
    #[default]
    Flash1M,
    /// 512 Kbit flash.
    Flash512,
    /// Serial EEPROM.
    Eeprom,
    /// Battery-backed SRAM.
    Sram,
    /// Cartridge has no save memory.
    None,
}

impl SaveKind {
    /// Save-memory size in bytes for this kind.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Flash1M => 128 * 1024,
            Self::Flash512 => 64 * 1024,
            Self::Eeprom => 8 * 1024,
            Self::Sram => 32 * 1024,
            Self::None => 0,
        }
    }
}

/// Size of the shared cartridge save buffer: the largest [`SaveKind`], so one
/// allocation covers whatever the core detects after boot.
pub const SAVE_BUFFER_SIZE: usize = SaveKind::Flash1M.size();

/// Board memory regions reachable through capability accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// On-board working RAM.
    WorkingRam,
    /// On-die (internal) working RAM.
    InternalWorkingRam,
    /// Video RAM.
    VideoRam,
    /// Palette RAM.
    PaletteRam,
    /// Object attribute memory.
    ObjectRam,
    /// Memory-mapped I/O registers.
    Io,
    /// System BIOS image.
    Bios,
    /// Cartridge ROM.
    Rom,
    /// Cartridge save memory. Session-owned and shared; cores answer `None`
    /// for this region and the session serves it from the shared buffer.
    SaveRam,
}

/// Cartridge save RAM, shared by every instance of a session. Multiple
/// instances deliberately emulate one physical cartridge, so they all write
/// the same buffer. Single-threaded by contract.
pub type SaveRam = Rc<RefCell<Vec<u8>>>;

/// One emulated machine, frame-granular.
///
/// Everything here is infallible by contract once the core exists: a core
/// that loaded a ROM can always step, render, and serialize. Sizing errors
/// are the caller's to prevent (`state_size` first, then `save_state`).
pub trait MachineCore {
    /// Platform this core probed the ROM as.
    fn platform(&self) -> Platform;

    /// Native panel geometry. Fixed for the lifetime of the core.
    fn video_dimensions(&self) -> VideoDimensions;

    /// Framebuffer row pitch in pixels. At least `video_dimensions().width`;
    /// columns past the visible width are padding.
    fn video_stride(&self) -> usize;

    /// The private framebuffer, `video_stride() * height` RGB565 pixels,
    /// updated by `run_frame`.
    fn framebuffer(&self) -> &[u16];

    /// Core clock frequency in Hz.
    fn frequency(&self) -> u32;

    /// Clock cycles per video frame. `frequency / frame_cycles` is the
    /// native frame rate.
    fn frame_cycles(&self) -> u32;

    /// Hard-reset the machine. Loaded ROM, save RAM and BIOS survive.
    fn reset(&mut self);

    /// Advance emulation by exactly one video frame.
    fn run_frame(&mut self);

    /// Latch the 16-bit key word for the next frame. Bit layout is the
    /// hardware-native one (bit 0 = A .. bit 9 = L).
    fn set_keys(&mut self, keys: u16);

    /// Set a string-keyed config entry. Unknown keys are ignored.
    fn set_option(&mut self, key: &str, value: &str);

    /// Output volume, 0..=0x100.
    fn set_volume(&mut self, volume: u16);

    /// Latest ambient-light sensor byte, native polarity (lower = brighter).
    fn set_luminance(&mut self, raw: u8);

    /// Whether the cartridge asserted its rumble motor during the last frame.
    fn rumble_active(&self) -> bool;

    /// Drain up to `out.len() / 2` interleaved stereo sample pairs from the
    /// audio ring. Returns the number of pairs written.
    fn drain_audio(&mut self, out: &mut [i16]) -> usize;

    /// Size in bytes of one serialized machine state. Constant for a given
    /// ROM and platform.
    fn state_size(&self) -> usize;

    /// Serialize into `out`, which is exactly `state_size()` bytes.
    fn save_state(&self, out: &mut [u8]);

    /// Restore from `data`, which is exactly `state_size()` bytes.
    fn load_state(&mut self, data: &[u8]);

    /// Detected cartridge save-memory kind.
    fn save_kind(&self) -> SaveKind;

    /// Attach the shared cartridge save RAM.
    fn load_save(&mut self, save: SaveRam);

    /// Load a system BIOS image.
    fn load_bios(&mut self, bios: &[u8]);

    /// Read view of a board memory region, if the platform has it.
    fn memory_view(&self, region: MemoryRegion) -> Option<&[u8]>;

    /// Write view of a board memory region, if the platform has it and it is
    /// writable.
    fn memory_view_mut(&mut self, region: MemoryRegion) -> Option<&mut [u8]>;

    /// Initialize the serial-link hub on this core. Called once, on the
    /// first instance of a linked session; cores wire the remaining stations
    /// through their own link mechanism. Returns false when the platform has
    /// no serial port.
    fn attach_serial_hub(&mut self) -> bool;
}

/// Probes ROM images and builds cores. Each instance of a session is created
/// by an independent probe of the same bytes; a session is all-or-nothing,
/// so one failed probe aborts the whole load.
pub trait CoreFactory {
    /// Probe `rom` and build a core for it, or `None` when no platform
    /// claims the image.
    fn create(&self, rom: Rc<[u8]>) -> Option<Box<dyn MachineCore>>;
}
