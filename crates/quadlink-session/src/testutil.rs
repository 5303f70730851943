//! Deterministic fakes for unit tests: a scriptable machine core, a factory
//! for it, and shared-handle host capabilities.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use quadlink_core::{
    AudioSink, CoreFactory, HostBundle, HostButton, InputSource, MachineCore, MemoryRegion,
    OptionsSource, Platform, RumbleDevice, SaveKind, SaveRam, VideoDimensions, VideoSink,
};

/// Test panel geometry: narrower than the stride so padding columns exist.
pub const FAKE_WIDTH: u32 = 6;
pub const FAKE_HEIGHT: u32 = 4;
pub const FAKE_STRIDE: usize = 8;

/// Serialized size of one fake core.
pub const FAKE_STATE_SIZE: usize = 16;

/// Solid fill colors per creation ordinal, distinct per instance.
pub const FILL_COLORS: [u16; 4] = [0xF800, 0x07E0, 0x001F, 0xFFE0];

/// Everything the session pushed into one core, visible to tests.
#[derive(Debug, Default, Clone)]
pub struct Observed {
    pub frames: u32,
    pub resets: u32,
    pub keys: u16,
    pub lux: u8,
    pub volume: u16,
    pub options: Vec<(String, String)>,
    pub bios_loaded: bool,
    pub serial_attached: bool,
}

pub struct FakeCore {
    ordinal: usize,
    fill: u16,
    framebuffer: Vec<u16>,
    frames: u32,
    keys: u16,
    lux: u8,
    working_ram: Vec<u8>,
    video_ram: Vec<u8>,
    observed: Rc<RefCell<Vec<Observed>>>,
    rumble_flag: Rc<Cell<bool>>,
    rom: Rc<[u8]>,
    // Held only for the shared refcount.
    _save: Option<SaveRam>,
}

impl FakeCore {
    fn observe<F: FnOnce(&mut Observed)>(&self, f: F) {
        f(&mut self.observed.borrow_mut()[self.ordinal]);
    }

    fn paint(&mut self) {
        for row in 0..FAKE_HEIGHT as usize {
            for col in 0..FAKE_STRIDE {
                // Visible pixels get the fill; padding columns get its
                // complement so any stride/width confusion shows up.
                self.framebuffer[row * FAKE_STRIDE + col] = if col < FAKE_WIDTH as usize {
                    self.fill
                } else {
                    !self.fill
                };
            }
        }
    }
}

impl MachineCore for FakeCore {
    fn platform(&self) -> Platform {
        Platform::Advance
    }

    fn video_dimensions(&self) -> VideoDimensions {
        VideoDimensions {
            width: FAKE_WIDTH,
            height: FAKE_HEIGHT,
        }
    }

    fn video_stride(&self) -> usize {
        FAKE_STRIDE
    }

    fn framebuffer(&self) -> &[u16] {
        &self.framebuffer
    }

    fn frequency(&self) -> u32 {
        0x0100_0000
    }

    fn frame_cycles(&self) -> u32 {
        280_896
    }

    fn reset(&mut self) {
        self.frames = 0;
        self.keys = 0;
        self.paint();
        self.observe(|o| {
            o.resets += 1;
            o.frames = 0;
        });
    }

    fn run_frame(&mut self) {
        self.frames += 1;
        self.paint();
        self.observe(|o| o.frames += 1);
    }

    fn set_keys(&mut self, keys: u16) {
        self.keys = keys;
        self.observe(|o| o.keys = keys);
    }

    fn set_option(&mut self, key: &str, value: &str) {
        self.observe(|o| o.options.push((key.to_string(), value.to_string())));
    }

    fn set_volume(&mut self, volume: u16) {
        self.observe(|o| o.volume = volume);
    }

    fn set_luminance(&mut self, raw: u8) {
        self.lux = raw;
        self.observe(|o| o.lux = raw);
    }

    fn rumble_active(&self) -> bool {
        self.rumble_flag.get()
    }

    fn drain_audio(&mut self, out: &mut [i16]) -> usize {
        out.fill(0);
        out.len() / 2
    }

    fn state_size(&self) -> usize {
        FAKE_STATE_SIZE
    }

    fn save_state(&self, out: &mut [u8]) {
        out.fill(0xA5);
        out[0..4].copy_from_slice(&self.frames.to_le_bytes());
        out[4..6].copy_from_slice(&self.keys.to_le_bytes());
        out[6] = self.lux;
        out[7..9].copy_from_slice(&self.fill.to_le_bytes());
    }

    fn load_state(&mut self, data: &[u8]) {
        self.frames = u32::from_le_bytes(data[0..4].try_into().expect("frames"));
        self.keys = u16::from_le_bytes(data[4..6].try_into().expect("keys"));
        self.lux = data[6];
        self.fill = u16::from_le_bytes(data[7..9].try_into().expect("fill"));
        self.paint();
        let frames = self.frames;
        self.observe(|o| o.frames = frames);
    }

    fn save_kind(&self) -> SaveKind {
        SaveKind::Sram
    }

    fn load_save(&mut self, save: SaveRam) {
        self._save = Some(save);
    }

    fn load_bios(&mut self, _bios: &[u8]) {
        self.observe(|o| o.bios_loaded = true);
    }

    fn memory_view(&self, region: MemoryRegion) -> Option<&[u8]> {
        match region {
            MemoryRegion::WorkingRam => Some(&self.working_ram),
            MemoryRegion::VideoRam => Some(&self.video_ram),
            MemoryRegion::Rom => Some(self.rom.as_ref()),
            _ => None,
        }
    }

    fn memory_view_mut(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        match region {
            MemoryRegion::WorkingRam => Some(&mut self.working_ram),
            MemoryRegion::VideoRam => Some(&mut self.video_ram),
            _ => None,
        }
    }

    fn attach_serial_hub(&mut self) -> bool {
        self.observe(|o| o.serial_attached = true);
        true
    }
}

/// Factory for [`FakeCore`] with optional scripted probe failure.
pub struct FakeFactory {
    pub fail_at: Option<usize>,
    pub state_size: usize,
    created: Cell<usize>,
    pub rom_seen: RefCell<Option<Weak<[u8]>>>,
    pub observed: Rc<RefCell<Vec<Observed>>>,
    pub rumble_flag: Rc<Cell<bool>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            state_size: FAKE_STATE_SIZE,
            created: Cell::new(0),
            rom_seen: RefCell::new(None),
            observed: Rc::new(RefCell::new(Vec::new())),
            rumble_flag: Rc::new(Cell::new(false)),
        }
    }

    /// Fail the probe for the core with this creation ordinal.
    pub fn failing_at(mut self, ordinal: usize) -> Self {
        self.fail_at = Some(ordinal);
        self
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }

    /// Snapshot of what instance `ordinal` has been told so far.
    pub fn observed(&self, ordinal: usize) -> Observed {
        self.observed.borrow()[ordinal].clone()
    }
}

impl CoreFactory for FakeFactory {
    fn create(&self, rom: Rc<[u8]>) -> Option<Box<dyn MachineCore>> {
        let ordinal = self.created.get();
        self.created.set(ordinal + 1);
        *self.rom_seen.borrow_mut() = Some(Rc::downgrade(&rom));
        if self.fail_at == Some(ordinal) {
            return None;
        }
        self.observed.borrow_mut().push(Observed::default());
        let mut core = FakeCore {
            ordinal,
            fill: FILL_COLORS[ordinal % FILL_COLORS.len()],
            framebuffer: vec![0; FAKE_STRIDE * FAKE_HEIGHT as usize],
            frames: 0,
            keys: 0,
            lux: 0,
            working_ram: vec![0; 64],
            video_ram: vec![0; 32],
            observed: Rc::clone(&self.observed),
            rumble_flag: Rc::clone(&self.rumble_flag),
            rom,
            _save: None,
        };
        core.paint();
        Some(Box::new(core))
    }
}

// ---------------------------------------------------------------------------
// Host capability fakes (shared-handle so tests keep a side channel)
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct SharedPad(pub Rc<RefCell<HashSet<(usize, HostButton)>>>);

impl SharedPad {
    pub fn press(&self, port: usize, button: HostButton) {
        self.0.borrow_mut().insert((port, button));
    }

    pub fn release(&self, port: usize, button: HostButton) {
        self.0.borrow_mut().remove(&(port, button));
    }

    pub fn release_all(&self) {
        self.0.borrow_mut().clear();
    }
}

impl InputSource for SharedPad {
    fn poll(&mut self) {}

    fn pressed(&self, port: usize, button: HostButton) -> bool {
        self.0.borrow().contains(&(port, button))
    }
}

/// Captures the last presented frame.
#[derive(Clone, Default)]
pub struct SharedScreen(pub Rc<RefCell<Option<(Vec<u16>, u32, u32, usize)>>>);

impl VideoSink for SharedScreen {
    fn present(&mut self, pixels: &[u16], width: u32, height: u32, stride: usize) {
        *self.0.borrow_mut() = Some((pixels.to_vec(), width, height, stride));
    }
}

/// Counts posted audio frames.
#[derive(Clone, Default)]
pub struct SharedSpeaker(pub Rc<Cell<usize>>);

impl AudioSink for SharedSpeaker {
    fn post(&mut self, _samples: &[i16], frames: usize) {
        self.0.set(self.0.get() + frames);
    }
}

/// Records the last strength pair.
#[derive(Clone, Default)]
pub struct SharedMotor(pub Rc<Cell<(u16, u16)>>);

impl RumbleDevice for SharedMotor {
    fn set_strength(&mut self, strong: u16, weak: u16) {
        self.0.set((strong, weak));
    }
}

/// String option store with an explicit dirty flag.
#[derive(Clone, Default)]
pub struct SharedOptions {
    pub values: Rc<RefCell<HashMap<String, String>>>,
    pub dirty: Rc<Cell<bool>>,
}

impl SharedOptions {
    pub fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.dirty.set(true);
    }
}

impl OptionsSource for SharedOptions {
    fn take_update(&mut self) -> bool {
        self.dirty.replace(false)
    }

    fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

/// A full host bundle wired to shared handles.
pub struct FakeHost {
    pub pad: SharedPad,
    pub screen: SharedScreen,
    pub speaker: SharedSpeaker,
    pub motor: SharedMotor,
    pub options: SharedOptions,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            pad: SharedPad::default(),
            screen: SharedScreen::default(),
            speaker: SharedSpeaker::default(),
            motor: SharedMotor::default(),
            options: SharedOptions::default(),
        }
    }

    pub fn bundle(&self) -> HostBundle {
        HostBundle {
            input: Box::new(self.pad.clone()),
            video: Box::new(self.screen.clone()),
            audio: Box::new(self.speaker.clone()),
            options: Box::new(self.options.clone()),
            rumble: Some(Box::new(self.motor.clone())),
        }
    }

    /// Bundle without a rumble device, for degradation tests.
    pub fn bundle_without_rumble(&self) -> HostBundle {
        HostBundle {
            rumble: None,
            ..self.bundle()
        }
    }
}
