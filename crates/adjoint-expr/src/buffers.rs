//! The two contiguous buffers shared by every node of an expression.

use std::fmt;

use adjoint_arena::Block;
use log::debug;

use crate::bind::{SizeRequirement, Slot};
use crate::error::ExprError;

/// One value block and one adjoint block, sized once from a
/// [`SizeRequirement`] and zero-initialised.
pub struct Buffers {
    values: Block<f64>,
    adjoints: Block<f64>,
}

impl Buffers {
    /// Reserve both buffers.
    pub fn new(required: SizeRequirement) -> Result<Self, ExprError> {
        let values = Block::filled(required.values, 0.0)?;
        let adjoints = Block::filled(required.adjoints, 0.0)?;
        debug!(
            "expression buffers: {} value words, {} adjoint words",
            required.values, required.adjoints
        );
        Ok(Self { values, adjoints })
    }

    /// Sizes of both buffers.
    pub fn size(&self) -> SizeRequirement {
        SizeRequirement::new(self.values.used(), self.adjoints.used())
    }

    /// The whole value buffer.
    pub fn values(&self) -> &[f64] {
        self.values.as_slice()
    }

    /// The whole adjoint buffer.
    pub fn adjoints(&self) -> &[f64] {
        self.adjoints.as_slice()
    }

    /// Both buffers, mutably.
    pub fn split_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (self.values.as_mut_slice(), self.adjoints.as_mut_slice())
    }

    /// Resolve an adjoint slot.
    pub fn adjoint_slot(&self, slot: Slot) -> Result<&[f64], ExprError> {
        resolve(self.adjoints.as_slice(), slot)
    }

    /// Resolve an adjoint slot mutably.
    pub fn adjoint_slot_mut(&mut self, slot: Slot) -> Result<&mut [f64], ExprError> {
        resolve_mut(self.adjoints.as_mut_slice(), slot)
    }

    /// Reset every adjoint word to zero; values are kept.
    pub fn zero_adjoints(&mut self) {
        self.adjoints.as_mut_slice().fill(0.0);
    }
}

impl fmt::Debug for Buffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffers")
            .field("values", &self.values.used())
            .field("adjoints", &self.adjoints.used())
            .finish()
    }
}

pub(crate) fn resolve(data: &[f64], slot: Slot) -> Result<&[f64], ExprError> {
    data.get(slot.range()).ok_or(ExprError::SlotOutOfBounds {
        slot,
        len: data.len(),
    })
}

pub(crate) fn resolve_mut(data: &mut [f64], slot: Slot) -> Result<&mut [f64], ExprError> {
    let len = data.len();
    data.get_mut(slot.range())
        .ok_or(ExprError::SlotOutOfBounds { slot, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_and_zeroed() {
        let b = Buffers::new(SizeRequirement::new(3, 5)).unwrap();
        assert_eq!(b.size(), SizeRequirement::new(3, 5));
        assert!(b.values().iter().all(|&v| v == 0.0));
        assert_eq!(b.adjoints().len(), 5);
    }

    #[test]
    fn empty_buffers_are_fine() {
        let b = Buffers::new(SizeRequirement::ZERO).unwrap();
        assert!(b.values().is_empty());
        assert_eq!(b.adjoint_slot(Slot::default()).unwrap(), &[] as &[f64]);
    }

    #[test]
    fn out_of_bounds_slot_rejected() {
        let mut b = Buffers::new(SizeRequirement::new(0, 4)).unwrap();
        let slot = Slot { offset: 2, len: 4 };
        assert_eq!(
            b.adjoint_slot_mut(slot).unwrap_err(),
            ExprError::SlotOutOfBounds { slot, len: 4 }
        );
    }

    #[test]
    fn zero_adjoints_keeps_values() {
        let mut b = Buffers::new(SizeRequirement::new(2, 2)).unwrap();
        {
            let (v, a) = b.split_mut();
            v.fill(3.0);
            a.fill(4.0);
        }
        b.zero_adjoints();
        assert_eq!(b.values(), &[3.0, 3.0]);
        assert_eq!(b.adjoints(), &[0.0, 0.0]);
    }
}
