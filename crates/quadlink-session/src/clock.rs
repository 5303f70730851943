//! Lockstep frame clock.
//!
//! One host tick advances every instance by exactly one frame, strictly
//! sequentially in index order. No instance observes another mid-step.
//! Instance 0 always steps first, so serial-link state it writes during its
//! step is visible to later instances within the same tick when wiring is
//! live. That is a documented asymmetry of the stepping order, not
//! simultaneity.

use crate::instances::InstanceSet;

#[derive(Debug, Default)]
pub struct FrameClock {
    frame: u64,
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self { frame: 0 }
    }

    /// Ticks completed since load or the last restart.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Restart the counter (session reset).
    pub fn restart(&mut self) {
        self.frame = 0;
    }

    /// Advance every instance by one frame, in index order.
    pub fn tick(&mut self, set: &mut InstanceSet) {
        for instance in set.iter_mut() {
            instance.core_mut().run_frame();
        }
        self.frame += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFactory;

    #[test]
    fn tick_steps_every_instance_once() {
        let factory = FakeFactory::new();
        let mut set = InstanceSet::create(&factory, &[1; 16], 3).expect("load");
        let mut clock = FrameClock::new();
        for _ in 0..5 {
            clock.tick(&mut set);
        }
        assert_eq!(clock.frame(), 5);
        for ordinal in 0..3 {
            assert_eq!(factory.observed(ordinal).frames, 5);
        }
    }
}
