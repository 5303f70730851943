//! Recording host capabilities.
//!
//! Input comes from a frame-indexed event script; video, audio and rumble
//! land in shared-handle recorders a test (or the report writer) can read
//! after the run. Everything is deterministic and clonable, so two hosts
//! built from the same script drive identical sessions.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use quadlink_core::{
    AudioSink, HostBundle, HostButton, InputSource, OptionsSource, RumbleDevice, VideoSink,
};

/// One scripted press or release, applied when its frame is polled.
#[derive(Debug, Clone, Copy)]
pub struct InputEvent {
    pub frame: u64,
    pub port: usize,
    pub button: HostButton,
    pub down: bool,
}

/// Frame-indexed controller script.
#[derive(Clone, Default)]
pub struct InputScript {
    events: Vec<InputEvent>,
}

impl InputScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `button` on `port` from `from` until `until` (exclusive).
    pub fn hold(&mut self, port: usize, button: HostButton, from: u64, until: u64) {
        self.events.push(InputEvent {
            frame: from,
            port,
            button,
            down: true,
        });
        self.events.push(InputEvent {
            frame: until,
            port,
            button,
            down: false,
        });
    }

    /// Tap `button` for a single frame.
    pub fn tap(&mut self, port: usize, button: HostButton, frame: u64) {
        self.hold(port, button, frame, frame + 1);
    }
}

/// Plays an [`InputScript`] back, one frame per poll.
pub struct ScriptedPad {
    events: Vec<InputEvent>,
    held: HashSet<(usize, HostButton)>,
    next_frame: u64,
}

impl ScriptedPad {
    #[must_use]
    pub fn new(script: InputScript) -> Self {
        let mut events = script.events;
        events.sort_by_key(|event| event.frame);
        Self {
            events,
            held: HashSet::new(),
            next_frame: 0,
        }
    }
}

impl InputSource for ScriptedPad {
    fn poll(&mut self) {
        let frame = self.next_frame;
        self.next_frame += 1;
        for event in self.events.iter().filter(|event| event.frame == frame) {
            if event.down {
                self.held.insert((event.port, event.button));
            } else {
                self.held.remove(&(event.port, event.button));
            }
        }
    }

    fn pressed(&self, port: usize, button: HostButton) -> bool {
        self.held.contains(&(port, button))
    }
}

/// Keeps the last presented frame and a count of presentations.
#[derive(Clone, Default)]
pub struct FrameRecorder {
    pub last: Rc<RefCell<Option<(Vec<u16>, u32, u32)>>>,
    pub presented: Rc<Cell<u64>>,
}

impl VideoSink for FrameRecorder {
    fn present(&mut self, pixels: &[u16], width: u32, height: u32, _stride: usize) {
        *self.last.borrow_mut() = Some((pixels.to_vec(), width, height));
        self.presented.set(self.presented.get() + 1);
    }
}

/// Accumulates a running checksum over every posted sample, plus totals.
#[derive(Clone, Default)]
pub struct AudioRecorder {
    pub frames: Rc<Cell<u64>>,
    pub checksum: Rc<Cell<u64>>,
}

impl AudioSink for AudioRecorder {
    fn post(&mut self, samples: &[i16], frames: usize) {
        self.frames.set(self.frames.get() + frames as u64);
        let mut sum = self.checksum.get();
        for &sample in &samples[..frames * 2] {
            sum = sum
                .wrapping_mul(31)
                .wrapping_add(sample as u16 as u64);
        }
        self.checksum.set(sum);
    }
}

/// Records every strength pair the session delivered.
#[derive(Clone, Default)]
pub struct MotorRecorder {
    pub history: Rc<RefCell<Vec<u16>>>,
}

impl MotorRecorder {
    /// Strongest strength seen over the run.
    #[must_use]
    pub fn peak(&self) -> u16 {
        self.history.borrow().iter().copied().max().unwrap_or(0)
    }
}

impl RumbleDevice for MotorRecorder {
    fn set_strength(&mut self, strong: u16, _weak: u16) {
        self.history.borrow_mut().push(strong);
    }
}

/// Flat option store with an explicit change flag.
#[derive(Clone, Default)]
pub struct OptionStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    dirty: Rc<Cell<bool>>,
}

impl OptionStore {
    pub fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.dirty.set(true);
    }
}

impl OptionsSource for OptionStore {
    fn take_update(&mut self) -> bool {
        self.dirty.replace(false)
    }

    fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

/// A full recording host. Keep a clone of the recorders to inspect the run.
pub struct RecordingHost {
    pub video: FrameRecorder,
    pub audio: AudioRecorder,
    pub motor: MotorRecorder,
    pub options: OptionStore,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            video: FrameRecorder::default(),
            audio: AudioRecorder::default(),
            motor: MotorRecorder::default(),
            options: OptionStore::default(),
        }
    }

    /// Bundle the recorders with a scripted pad.
    #[must_use]
    pub fn bundle(&self, script: InputScript) -> HostBundle {
        HostBundle {
            input: Box::new(ScriptedPad::new(script)),
            video: Box::new(self.video.clone()),
            audio: Box::new(self.audio.clone()),
            options: Box::new(self.options.clone()),
            rumble: Some(Box::new(self.motor.clone())),
        }
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}
