//! The session orchestrator.
//!
//! One `Session` drives 1..=4 lockstep instances as a single emulated device
//! behind a frame-granular host surface: load, tick, reset, serialize. All
//! host capabilities arrive in one bundle at construction; the per-tick path
//! never checks for missing callbacks.

use std::cell::{Ref, RefMut};

use log::info;
use quadlink_core::{CoreFactory, HostBundle, MemoryRegion, Platform};

use crate::clock::FrameClock;
use crate::config::SessionOptions;
use crate::error::{LoadError, StateError};
use crate::input::InputRouter;
use crate::instances::InstanceSet;
use crate::link::{self, LinkMode};
use crate::peripherals::PeripheralBroadcaster;
use crate::state;
use crate::video::{LayoutPolicy, PresentedFrame, VideoCompositor};

/// Stereo pairs drained from instance 0 and posted to the host each tick.
pub const AUDIO_BATCH_FRAMES: usize = 1024;

/// Host-facing sample rate in Hz.
pub const SAMPLE_RATE: u32 = 32_768;

/// Fixed per-session parameters, chosen before load.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How many instances to create, 1..=4.
    pub instances: usize,
    /// Whether the instances carry a link cable.
    pub link: LinkMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instances: 1,
            link: LinkMode::default(),
        }
    }
}

/// Output timing and geometry, fixed from load to unload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    /// Composed frame width in pixels.
    pub width: u32,
    /// Composed frame height in pixels.
    pub height: u32,
    /// Composed row pitch in pixels (packed, equals width).
    pub stride: usize,
    /// Native frame rate.
    pub fps: f64,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
}

/// One mapped board region of the composed device, from instance 0's point
/// of view. Bus addresses are the platform-native ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapDescriptor {
    pub region: MemoryRegion,
    /// Platform-native bus address of the region base.
    pub base: u32,
    /// Region length in bytes.
    pub len: usize,
    pub read_only: bool,
}

/// Platform-native bus address for a region, or `None` when the platform
/// does not map it.
const fn region_base(platform: Platform, region: MemoryRegion) -> Option<u32> {
    match platform {
        Platform::Advance => Some(match region {
            MemoryRegion::Bios => 0x0000_0000,
            MemoryRegion::WorkingRam => 0x0200_0000,
            MemoryRegion::InternalWorkingRam => 0x0300_0000,
            MemoryRegion::Io => 0x0400_0000,
            MemoryRegion::PaletteRam => 0x0500_0000,
            MemoryRegion::VideoRam => 0x0600_0000,
            MemoryRegion::ObjectRam => 0x0700_0000,
            MemoryRegion::Rom => 0x0800_0000,
            MemoryRegion::SaveRam => 0x0E00_0000,
        }),
        Platform::Classic => match region {
            MemoryRegion::Rom => Some(0x0000),
            MemoryRegion::VideoRam => Some(0x8000),
            MemoryRegion::SaveRam => Some(0xA000),
            MemoryRegion::WorkingRam => Some(0xC000),
            MemoryRegion::ObjectRam => Some(0xFE00),
            MemoryRegion::Io => Some(0xFF00),
            MemoryRegion::Bios
            | MemoryRegion::InternalWorkingRam
            | MemoryRegion::PaletteRam => None,
        },
    }
}

/// Push the current option snapshot into every instance identically.
fn apply_instance_options(set: &mut InstanceSet, options: &SessionOptions) {
    for instance in set.iter_mut() {
        let core = instance.core_mut();
        core.set_option("idleOptimization", options.idle_optimization.core_value());
        core.set_option("skipBios", if options.skip_bios { "1" } else { "0" });
        core.set_volume(options.volume);
    }
}

/// The frontend-facing orchestrator.
pub struct Session {
    host: HostBundle,
    config: SessionConfig,
    options: SessionOptions,
    router: InputRouter,
    broadcaster: PeripheralBroadcaster,
    clock: FrameClock,
    instances: Option<InstanceSet>,
    compositor: Option<VideoCompositor>,
    memory_map: Vec<MemoryMapDescriptor>,
    link_wired: bool,
    audio_buf: Vec<i16>,
}

impl Session {
    #[must_use]
    pub fn new(host: HostBundle, config: SessionConfig) -> Self {
        let options = SessionOptions::default();
        Self {
            router: InputRouter::new(&options),
            broadcaster: PeripheralBroadcaster::new(options.solar_level),
            clock: FrameClock::new(),
            instances: None,
            compositor: None,
            memory_map: Vec::new(),
            link_wired: false,
            audio_buf: vec![0; AUDIO_BATCH_FRAMES * 2],
            options,
            host,
            config,
        }
    }

    /// Load a ROM into freshly created instances.
    ///
    /// Replaces any loaded session. All-or-nothing: on error nothing stays
    /// loaded. The BIOS image, when supplied and enabled, goes into every
    /// instance identically.
    pub fn load(
        &mut self,
        factory: &dyn CoreFactory,
        rom: &[u8],
        bios: Option<&[u8]>,
    ) -> Result<(), LoadError> {
        self.unload();
        self.options.reload(self.host.options.as_ref());
        // The reload above already consumed any pending change.
        let _ = self.host.options.take_update();

        let mut set = InstanceSet::create(factory, rom, self.config.instances)?;
        apply_instance_options(&mut set, &self.options);
        if self.options.use_bios {
            if let Some(bios) = bios {
                for instance in set.iter_mut() {
                    instance.core_mut().load_bios(bios);
                }
            }
        }
        self.link_wired = link::wire(&mut set, self.config.link);
        set.reset_all();

        let first = set.first().core();
        self.compositor = Some(VideoCompositor::new(
            LayoutPolicy::for_count(set.len()),
            first.video_dimensions(),
            first.video_stride(),
        ));
        self.router.apply_options(&self.options);
        self.broadcaster
            .solar_mut()
            .set_level(self.options.solar_level);
        self.instances = Some(set);
        self.rebuild_memory_map();
        self.clock.restart();
        Ok(())
    }

    /// Tear down the loaded session. The ROM mapping and the shared save RAM
    /// are released when the last instance drops. Idempotent.
    pub fn unload(&mut self) {
        if self.instances.take().is_some() {
            info!("session unloaded");
        }
        self.compositor = None;
        self.memory_map.clear();
        self.link_wired = false;
        self.broadcaster.clear_rumble();
        self.clock.restart();
    }

    /// Hard-reset every instance, in index order. Save RAM survives; rumble
    /// history and the frame counter do not. No-op when nothing is loaded.
    pub fn reset(&mut self) {
        let Some(set) = self.instances.as_mut() else {
            return;
        };
        set.reset_all();
        self.broadcaster.clear_rumble();
        self.clock.restart();
        self.rebuild_memory_map();
    }

    /// Advance the whole session by one frame.
    ///
    /// Fixed phase order: poll input, reload options if changed, latch keys,
    /// broadcast the solar byte, step every instance, sample the motors,
    /// compose and present video, post instance 0's audio. No-op when
    /// nothing is loaded.
    pub fn run_frame(&mut self) {
        let Some(set) = self.instances.as_mut() else {
            return;
        };
        self.host.input.poll();

        if self.host.options.take_update() {
            self.options.reload(self.host.options.as_ref());
            self.router.apply_options(&self.options);
            self.broadcaster
                .solar_mut()
                .set_level(self.options.solar_level);
            apply_instance_options(set, &self.options);
        }

        let keys = self
            .router
            .route(self.host.input.as_ref(), set.len(), self.link_wired);
        for instance in set.iter_mut() {
            let word = keys[instance.index()];
            instance.core_mut().set_keys(word);
        }
        self.broadcaster
            .broadcast_solar(self.host.input.as_ref(), set);

        self.clock.tick(set);

        self.broadcaster
            .sample_rumble(set, self.host.rumble.as_deref_mut());

        if let Some(compositor) = self.compositor.as_mut() {
            compositor.compose(set);
            let frame = compositor.frame();
            self.host
                .video
                .present(frame.pixels(), frame.width(), frame.height(), frame.stride());
        }

        let pairs = set.first_mut().core_mut().drain_audio(&mut self.audio_buf);
        self.host.audio.post(&self.audio_buf[..pairs * 2], pairs);
    }

    /// Aggregate serialized size, 0 when nothing is loaded.
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.instances.as_ref().map_or(0, state::state_size)
    }

    /// Serialize every instance into `out`, which must be exactly
    /// [`Self::state_size`] bytes.
    pub fn save_state(&self, out: &mut [u8]) -> Result<(), StateError> {
        let set = self.instances.as_ref().ok_or(StateError::NotLoaded)?;
        state::save_state(set, out)
    }

    /// Restore every instance from `data`. On any error no instance is
    /// touched.
    pub fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        let set = self.instances.as_mut().ok_or(StateError::NotLoaded)?;
        state::load_state(set, data)
    }

    #[must_use]
    pub fn loaded(&self) -> bool {
        self.instances.is_some()
    }

    /// Whether the serial hub ended up attached at load.
    #[must_use]
    pub fn link_wired(&self) -> bool {
        self.link_wired
    }

    /// Ticks completed since load or the last reset.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.clock.frame()
    }

    /// Current option snapshot.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The loaded instance set, for inspection.
    #[must_use]
    pub fn instances(&self) -> Option<&InstanceSet> {
        self.instances.as_ref()
    }

    /// Last composed frame, if loaded.
    #[must_use]
    pub fn frame(&self) -> Option<&PresentedFrame> {
        self.compositor.as_ref().map(VideoCompositor::frame)
    }

    /// Output timing and geometry, if loaded.
    #[must_use]
    pub fn av_info(&self) -> Option<AvInfo> {
        let set = self.instances.as_ref()?;
        let frame = self.compositor.as_ref()?.frame();
        let core = set.first().core();
        Some(AvInfo {
            width: frame.width(),
            height: frame.height(),
            stride: frame.stride(),
            fps: f64::from(core.frequency()) / f64::from(core.frame_cycles()),
            sample_rate: SAMPLE_RATE,
        })
    }

    /// Mapped board regions of instance 0, empty when nothing is loaded.
    #[must_use]
    pub fn memory_map(&self) -> &[MemoryMapDescriptor] {
        &self.memory_map
    }

    /// Size in bytes of a board region, 0 when unmapped or unloaded.
    #[must_use]
    pub fn memory_size(&self, region: MemoryRegion) -> usize {
        let Some(set) = self.instances.as_ref() else {
            return 0;
        };
        let core = set.first().core();
        match region {
            MemoryRegion::SaveRam => core.save_kind().size(),
            _ => core.memory_view(region).map_or(0, <[u8]>::len),
        }
    }

    /// Read view of a board region on instance 0. Save RAM is not served
    /// here; use [`Self::save_ram`].
    #[must_use]
    pub fn memory_data(&self, region: MemoryRegion) -> Option<&[u8]> {
        self.instances
            .as_ref()
            .and_then(|set| set.first().core().memory_view(region))
    }

    /// Write view of a board region on instance 0, when it is writable.
    pub fn memory_data_mut(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        self.instances
            .as_mut()
            .and_then(|set| set.first_mut().core_mut().memory_view_mut(region))
    }

    /// The shared cartridge save RAM, sliced to the detected kind's size.
    #[must_use]
    pub fn save_ram(&self) -> Option<Ref<'_, [u8]>> {
        let set = self.instances.as_ref()?;
        let len = set.first().core().save_kind().size();
        Some(Ref::map(set.save_ram().borrow(), |buf| &buf[..len]))
    }

    /// Writable view of the shared cartridge save RAM.
    pub fn save_ram_mut(&mut self) -> Option<RefMut<'_, [u8]>> {
        let set = self.instances.as_ref()?;
        let len = set.first().core().save_kind().size();
        Some(RefMut::map(set.save_ram().borrow_mut(), |buf| {
            &mut buf[..len]
        }))
    }

    fn rebuild_memory_map(&mut self) {
        const REGIONS: [(MemoryRegion, bool); 8] = [
            (MemoryRegion::Bios, true),
            (MemoryRegion::WorkingRam, false),
            (MemoryRegion::InternalWorkingRam, false),
            (MemoryRegion::Io, false),
            (MemoryRegion::PaletteRam, false),
            (MemoryRegion::VideoRam, false),
            (MemoryRegion::ObjectRam, false),
            (MemoryRegion::Rom, true),
        ];
        let mut map = Vec::new();
        if let Some(set) = self.instances.as_ref() {
            let core = set.first().core();
            let platform = core.platform();
            for (region, read_only) in REGIONS {
                if let Some(view) = core.memory_view(region) {
                    if let Some(base) = region_base(platform, region) {
                        map.push(MemoryMapDescriptor {
                            region,
                            base,
                            len: view.len(),
                            read_only,
                        });
                    }
                }
            }
            let save_len = core.save_kind().size();
            if save_len > 0 {
                if let Some(base) = region_base(platform, MemoryRegion::SaveRam) {
                    map.push(MemoryMapDescriptor {
                        region: MemoryRegion::SaveRam,
                        base,
                        len: save_len,
                        read_only: false,
                    });
                }
            }
        }
        self.memory_map = map;
    }
}
