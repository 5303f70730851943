//! State serialization across the whole set.
//!
//! The aggregate blob is the plain concatenation of N fixed-size sections,
//! section i at offset `i * unit_size`, in index order. No per-instance size
//! is stored: the unit size is uniform because every instance holds the same
//! ROM on the same platform. Sizing is strict equality both ways, checked
//! before anything is touched.

use crate::error::StateError;
use crate::instances::InstanceSet;

/// Aggregate blob size for the set.
#[must_use]
pub fn state_size(set: &InstanceSet) -> usize {
    set.len() * set.unit_size()
}

/// Serialize every instance into `out`, which must be exactly
/// [`state_size`] bytes.
pub fn save_state(set: &InstanceSet, out: &mut [u8]) -> Result<(), StateError> {
    let unit = set.unit_size();
    let expected = set.len() * unit;
    if out.len() != expected {
        return Err(StateError::SizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    for (instance, section) in set.iter().zip(out.chunks_exact_mut(unit)) {
        instance.core().save_state(section);
    }
    Ok(())
}

/// Restore every instance from `data`, which must be exactly
/// [`state_size`] bytes. On a size mismatch no instance is touched.
pub fn load_state(set: &mut InstanceSet, data: &[u8]) -> Result<(), StateError> {
    let unit = set.unit_size();
    let expected = set.len() * unit;
    if data.len() != expected {
        return Err(StateError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    for (instance, section) in set.iter_mut().zip(data.chunks_exact(unit)) {
        instance.core_mut().load_state(section);
    }
    Ok(())
}
