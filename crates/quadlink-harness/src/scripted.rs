//! A deterministic scripted machine core.
//!
//! Every observable output — pixels, audio, rumble, serialized state — is a
//! pure function of the ROM seed and the inputs the session pushed in, so
//! two runs with the same script are bit-identical. That makes digest
//! comparison meaningful across sessions, savestate restores and processes.

use std::cell::Cell;
use std::rc::Rc;

use quadlink_core::{
    CoreFactory, MachineCore, MemoryRegion, Platform, SaveKind, SaveRam, VideoDimensions,
};

/// Scripted panel geometry, hardware-sized with a padded stride.
pub const SCREEN_WIDTH: u32 = 240;
pub const SCREEN_HEIGHT: u32 = 160;
pub const SCREEN_STRIDE: usize = 256;

/// Serialized size of one scripted core.
pub const STATE_SIZE: usize = 32;

/// ROMs whose first byte is this are rejected by the probe.
pub const BAD_ROM_MARKER: u8 = 0xFF;

const WRAM_SIZE: usize = 0x4_0000;
const IWRAM_SIZE: usize = 0x8000;
const VRAM_SIZE: usize = 0x1_8000;
const PALETTE_SIZE: usize = 0x400;
const OAM_SIZE: usize = 0x400;
const IO_SIZE: usize = 0x400;

const LCG_MUL: u64 = 6_364_136_223_846_793_005;

fn seed_from(rom: &[u8]) -> u64 {
    // FNV-1a over the image; any stable mix works.
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &byte in rom {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash | 1
}

pub struct ScriptedCore {
    seed: u64,
    lcg: u64,
    frames: u32,
    keys: u16,
    lux: u8,
    volume: u16,
    /// Motor script: asserted for the first half of every `period` frames.
    /// 0 disables the motor.
    rumble_period: u16,
    framebuffer: Vec<u16>,
    working_ram: Vec<u8>,
    internal_ram: Vec<u8>,
    video_ram: Vec<u8>,
    palette_ram: Vec<u8>,
    object_ram: Vec<u8>,
    io: Vec<u8>,
    rom: Rc<[u8]>,
    bios: Option<Vec<u8>>,
    save: Option<SaveRam>,
    serial_hub: bool,
}

impl ScriptedCore {
    fn new(rom: Rc<[u8]>) -> Self {
        let seed = seed_from(&rom);
        let mut core = Self {
            seed,
            lcg: seed,
            frames: 0,
            keys: 0,
            lux: 0,
            volume: 0x100,
            rumble_period: 0,
            framebuffer: vec![0; SCREEN_STRIDE * SCREEN_HEIGHT as usize],
            working_ram: vec![0; WRAM_SIZE],
            internal_ram: vec![0; IWRAM_SIZE],
            video_ram: vec![0; VRAM_SIZE],
            palette_ram: vec![0; PALETTE_SIZE],
            object_ram: vec![0; OAM_SIZE],
            io: vec![0; IO_SIZE],
            rom,
            bios: None,
            save: None,
            serial_hub: false,
        };
        core.render();
        core
    }

    fn render(&mut self) {
        for (row, line) in self.framebuffer.chunks_exact_mut(SCREEN_STRIDE).enumerate() {
            let row_seed = self.lcg ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            for (col, pixel) in line.iter_mut().enumerate() {
                let lane = (row_seed >> ((col & 3) * 16)) as u16;
                *pixel = lane ^ (col as u16).wrapping_mul(31);
            }
        }
    }
}

impl MachineCore for ScriptedCore {
    fn platform(&self) -> Platform {
        Platform::Advance
    }

    fn video_dimensions(&self) -> VideoDimensions {
        VideoDimensions {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        }
    }

    fn video_stride(&self) -> usize {
        SCREEN_STRIDE
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
        self.lcg = self.seed;
        self.frames = 0;
        self.keys = 0;
        self.render();
    }

    fn run_frame(&mut self) {
        let input_mix = (u64::from(self.keys) << 24) | (u64::from(self.lux) << 8) | 1;
        self.lcg = self.lcg.wrapping_mul(LCG_MUL).wrapping_add(input_mix);
        self.frames += 1;
        self.render();
        // Pressing A writes one byte per frame into cartridge save memory.
        if self.keys & 1 != 0 {
            if let Some(save) = &self.save {
                let mut save = save.borrow_mut();
                let slot = self.frames as usize % 64;
                save[slot] = self.lcg as u8;
            }
        }
    }

    fn set_keys(&mut self, keys: u16) {
        self.keys = keys;
    }

    fn set_option(&mut self, key: &str, value: &str) {
        if key == "rumblePeriod" {
            self.rumble_period = value.parse().unwrap_or(0);
        }
    }

    fn set_volume(&mut self, volume: u16) {
        self.volume = volume;
    }

    fn set_luminance(&mut self, raw: u8) {
        self.lux = raw;
    }

    fn rumble_active(&self) -> bool {
        self.rumble_period >= 2 && self.frames % u32::from(self.rumble_period) < u32::from(self.rumble_period / 2)
    }

    fn drain_audio(&mut self, out: &mut [i16]) -> usize {
        let pairs = out.len() / 2;
        for (i, pair) in out.chunks_exact_mut(2).enumerate() {
            let phase = (self.frames as usize * 131 + i) % 2048;
            let raw = (phase as i32 - 1024) * 16;
            let sample = (raw * i32::from(self.volume) / 0x100) as i16;
            pair[0] = sample;
            pair[1] = sample;
        }
        pairs
    }

    fn state_size(&self) -> usize {
        STATE_SIZE
    }

    fn save_state(&self, out: &mut [u8]) {
        out.fill(0);
        out[0..8].copy_from_slice(&self.lcg.to_le_bytes());
        out[8..12].copy_from_slice(&self.frames.to_le_bytes());
        out[12..14].copy_from_slice(&self.keys.to_le_bytes());
        out[14] = self.lux;
        out[15] = u8::from(self.serial_hub);
        out[16..18].copy_from_slice(&self.volume.to_le_bytes());
        out[18..20].copy_from_slice(&self.rumble_period.to_le_bytes());
    }

    fn load_state(&mut self, data: &[u8]) {
        self.lcg = u64::from_le_bytes(data[0..8].try_into().unwrap_or_default());
        self.frames = u32::from_le_bytes(data[8..12].try_into().unwrap_or_default());
        self.keys = u16::from_le_bytes(data[12..14].try_into().unwrap_or_default());
        self.lux = data[14];
        self.serial_hub = data[15] != 0;
        self.volume = u16::from_le_bytes(data[16..18].try_into().unwrap_or_default());
        self.rumble_period = u16::from_le_bytes(data[18..20].try_into().unwrap_or_default());
        self.render();
    }

    fn save_kind(&self) -> SaveKind {
        SaveKind::Flash1M
    }

    fn load_save(&mut self, save: SaveRam) {
        self.save = Some(save);
    }

    fn load_bios(&mut self, bios: &[u8]) {
        self.bios = Some(bios.to_vec());
    }

    fn memory_view(&self, region: MemoryRegion) -> Option<&[u8]> {
        match region {
            MemoryRegion::WorkingRam => Some(&self.working_ram),
            MemoryRegion::InternalWorkingRam => Some(&self.internal_ram),
            MemoryRegion::VideoRam => Some(&self.video_ram),
            MemoryRegion::PaletteRam => Some(&self.palette_ram),
            MemoryRegion::ObjectRam => Some(&self.object_ram),
            MemoryRegion::Io => Some(&self.io),
            MemoryRegion::Rom => Some(self.rom.as_ref()),
            MemoryRegion::Bios => self.bios.as_deref(),
            MemoryRegion::SaveRam => None,
        }
    }

    fn memory_view_mut(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        match region {
            MemoryRegion::WorkingRam => Some(&mut self.working_ram),
            MemoryRegion::InternalWorkingRam => Some(&mut self.internal_ram),
            MemoryRegion::VideoRam => Some(&mut self.video_ram),
            MemoryRegion::PaletteRam => Some(&mut self.palette_ram),
            MemoryRegion::ObjectRam => Some(&mut self.object_ram),
            MemoryRegion::Io => Some(&mut self.io),
            _ => None,
        }
    }

    fn attach_serial_hub(&mut self) -> bool {
        self.serial_hub = true;
        true
    }
}

/// Builds [`ScriptedCore`]s. Rejects images starting with
/// [`BAD_ROM_MARKER`], so load-failure paths can be exercised.
#[derive(Default)]
pub struct ScriptedFactory {
    created: Cell<usize>,
    rumble_period: u16,
}

impl ScriptedFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the motor on every created core: asserted for the first half
    /// of every `period` frames.
    #[must_use]
    pub fn with_rumble_period(mut self, period: u16) -> Self {
        self.rumble_period = period;
        self
    }

    /// How many cores this factory has built.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl CoreFactory for ScriptedFactory {
    fn create(&self, rom: Rc<[u8]>) -> Option<Box<dyn MachineCore>> {
        if rom.first() == Some(&BAD_ROM_MARKER) {
            return None;
        }
        self.created.set(self.created.get() + 1);
        let mut core = ScriptedCore::new(rom);
        core.rumble_period = self.rumble_period;
        Some(Box::new(core))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(rom: &[u8]) -> ScriptedCore {
        ScriptedCore::new(Rc::from(rom))
    }

    #[test]
    fn same_rom_and_inputs_give_identical_state() {
        let mut a = core(&[1, 2, 3, 4]);
        let mut b = core(&[1, 2, 3, 4]);
        for frame in 0..20 {
            a.set_keys(frame as u16 & 0x3FF);
            b.set_keys(frame as u16 & 0x3FF);
            a.run_frame();
            b.run_frame();
        }
        let mut sa = [0u8; STATE_SIZE];
        let mut sb = [0u8; STATE_SIZE];
        a.save_state(&mut sa);
        b.save_state(&mut sb);
        assert_eq!(sa, sb);
        assert_eq!(a.framebuffer(), b.framebuffer());
    }

    #[test]
    fn different_keys_diverge() {
        let mut a = core(&[1, 2, 3, 4]);
        let mut b = core(&[1, 2, 3, 4]);
        a.set_keys(1);
        a.run_frame();
        b.run_frame();
        assert_ne!(a.framebuffer(), b.framebuffer());
    }

    #[test]
    fn state_restore_rewinds_the_script() {
        let mut core = core(&[9; 16]);
        for _ in 0..5 {
            core.run_frame();
        }
        let mut snapshot = [0u8; STATE_SIZE];
        core.save_state(&mut snapshot);
        core.run_frame();
        core.run_frame();
        core.load_state(&snapshot);
        let mut again = [0u8; STATE_SIZE];
        core.save_state(&mut again);
        assert_eq!(snapshot, again);
    }

    #[test]
    fn probe_rejects_marked_roms() {
        let factory = ScriptedFactory::new();
        assert!(factory.create(Rc::from(&[BAD_ROM_MARKER, 0][..])).is_none());
        assert!(factory.create(Rc::from(&[0u8, 0][..])).is_some());
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn rumble_script_follows_its_period() {
        let mut core = core(&[5; 8]);
        core.set_option("rumblePeriod", "4");
        let mut pattern = Vec::new();
        for _ in 0..8 {
            core.run_frame();
            pattern.push(core.rumble_active());
        }
        assert_eq!(
            pattern,
            [true, false, false, true, true, false, false, true]
        );
    }
}
