//! Instance ownership.
//!
//! An `InstanceSet` owns 1..=4 fully independent machines created from one
//! ROM image. The index is load-bearing: it fixes the controller port, the
//! compositing slot, and the serialization section for each instance.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::info;
use quadlink_core::{CoreFactory, MachineCore, SAVE_BUFFER_SIZE, SaveRam};

use crate::error::LoadError;

/// Most instances one session can drive.
pub const MAX_INSTANCES: usize = 4;

/// One emulated machine plus its fixed session index.
pub struct CoreInstance {
    core: Box<dyn MachineCore>,
    index: usize,
}

impl CoreInstance {
    /// Position in the set; fixes port and compositing slot.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn core(&self) -> &dyn MachineCore {
        self.core.as_ref()
    }

    pub fn core_mut(&mut self) -> &mut dyn MachineCore {
        self.core.as_mut()
    }
}

// The boxed core is opaque; show what identifies the instance instead.
impl fmt::Debug for CoreInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreInstance")
            .field("index", &self.index)
            .field("platform", &self.core.platform())
            .finish_non_exhaustive()
    }
}

/// Ordered set of instances sharing one ROM and one cartridge save RAM.
pub struct InstanceSet {
    instances: Vec<CoreInstance>,
    rom: Rc<[u8]>,
    save_ram: SaveRam,
}

impl InstanceSet {
    /// Create `count` instances from `rom_bytes`, all-or-nothing.
    ///
    /// The ROM is mapped once and shared read-only. Each instance probes the
    /// same bytes independently — every one is a fully independent machine,
    /// so the redundancy is intentional. Any probe failure drops whatever
    /// was already created, along with the ROM mapping.
    pub fn create(
        factory: &dyn CoreFactory,
        rom_bytes: &[u8],
        count: usize,
    ) -> Result<Self, LoadError> {
        if !(1..=MAX_INSTANCES).contains(&count) {
            return Err(LoadError::BadInstanceCount(count));
        }
        if rom_bytes.is_empty() {
            return Err(LoadError::EmptyRom);
        }

        let rom: Rc<[u8]> = Rc::from(rom_bytes);
        let save_ram: SaveRam = Rc::new(RefCell::new(vec![0; SAVE_BUFFER_SIZE]));

        let mut instances = Vec::with_capacity(count);
        for index in 0..count {
            let Some(mut core) = factory.create(Rc::clone(&rom)) else {
                // Dropping `instances` and `rom` here releases everything
                // created so far; no partial session survives.
                return Err(LoadError::ProbeFailed { instance: index });
            };
            core.load_save(Rc::clone(&save_ram));
            instances.push(CoreInstance { core, index });
        }

        info!(
            "created {count} instance(s), platform {:?}, rom {} bytes",
            instances[0].core().platform(),
            rom.len()
        );
        Ok(Self {
            instances,
            rom,
            save_ram,
        })
    }

    /// Number of instances. Always 1..=4.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreInstance> {
        self.instances.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CoreInstance> {
        self.instances.iter_mut()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CoreInstance> {
        self.instances.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CoreInstance> {
        self.instances.get_mut(index)
    }

    /// Instance 0, which always exists.
    #[must_use]
    pub fn first(&self) -> &CoreInstance {
        &self.instances[0]
    }

    pub fn first_mut(&mut self) -> &mut CoreInstance {
        &mut self.instances[0]
    }

    /// Forward a hard reset to every instance, in index order.
    pub fn reset_all(&mut self) {
        for instance in &mut self.instances {
            instance.core.reset();
        }
    }

    /// Serialized size of one instance. Uniform across the set because every
    /// instance holds the same ROM on the same platform.
    #[must_use]
    pub fn unit_size(&self) -> usize {
        self.first().core().state_size()
    }

    /// The shared read-only ROM mapping.
    #[must_use]
    pub fn rom(&self) -> &Rc<[u8]> {
        &self.rom
    }

    /// The shared cartridge save RAM.
    #[must_use]
    pub fn save_ram(&self) -> &SaveRam {
        &self.save_ram
    }
}

impl fmt::Debug for InstanceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSet")
            .field("instances", &self.instances)
            .field("rom_len", &self.rom.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFactory;
    use std::rc::Weak;

    #[test]
    fn debug_output_names_instances_without_core_internals() {
        let factory = FakeFactory::new();
        let set = InstanceSet::create(&factory, &[7; 32], 2).expect("load");
        let rendered = format!("{set:?}");
        assert!(rendered.contains("InstanceSet"));
        assert!(rendered.contains("index: 1"));
        assert!(rendered.contains("rom_len: 32"));
    }

    #[test]
    fn create_rejects_bad_counts() {
        let factory = FakeFactory::new();
        for count in [0, 5, 16] {
            let err = InstanceSet::create(&factory, &[1, 2, 3], count).unwrap_err();
            assert_eq!(err, LoadError::BadInstanceCount(count));
        }
    }

    #[test]
    fn create_rejects_empty_rom() {
        let factory = FakeFactory::new();
        let err = InstanceSet::create(&factory, &[], 2).unwrap_err();
        assert_eq!(err, LoadError::EmptyRom);
    }

    #[test]
    fn create_is_all_or_nothing() {
        let factory = FakeFactory::new().failing_at(2);
        let err = InstanceSet::create(&factory, &[9; 64], 4).unwrap_err();
        assert_eq!(err, LoadError::ProbeFailed { instance: 2 });
        // Partially created instances and the ROM mapping are gone.
        let rom = factory.rom_seen.borrow();
        let weak: &Weak<[u8]> = rom.as_ref().expect("factory saw the rom");
        assert!(weak.upgrade().is_none(), "rom mapping leaked");
    }

    #[test]
    fn every_instance_probes_the_same_bytes() {
        let factory = FakeFactory::new();
        let set = InstanceSet::create(&factory, &[7; 32], 3).expect("load");
        assert_eq!(set.len(), 3);
        assert_eq!(factory.created(), 3);
        for (i, instance) in set.iter().enumerate() {
            assert_eq!(instance.index(), i);
        }
    }

    #[test]
    fn teardown_releases_rom_exactly_once() {
        let factory = FakeFactory::new();
        let set = InstanceSet::create(&factory, &[7; 32], 4).expect("load");
        let weak = Rc::downgrade(set.rom());
        // Session + 4 cores hold the mapping while the set is alive.
        assert!(weak.upgrade().is_some());
        drop(set);
        assert!(weak.upgrade().is_none(), "rom survived teardown");
    }

    #[test]
    fn save_ram_is_shared_across_instances() {
        let factory = FakeFactory::new();
        let set = InstanceSet::create(&factory, &[7; 32], 2).expect("load");
        assert_eq!(set.save_ram().borrow().len(), SAVE_BUFFER_SIZE);
        // One buffer, N+1 handles (set + each core).
        assert_eq!(Rc::strong_count(set.save_ram()), 3);
    }

    #[test]
    fn unit_size_comes_from_first_instance() {
        let factory = FakeFactory::new();
        let set = InstanceSet::create(&factory, &[7; 32], 2).expect("load");
        assert_eq!(set.unit_size(), factory.state_size);
    }
}
