//! Growable constant banks
//!
//! Capacity grows in fixed increments. The length only grows between
//! explicit clears and range removals.

use crate::error::Result;
use crate::orbit_bail;

pub const DEFAULT_GROW_STEP: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantList<T> {
    values: Vec<T>,
    grow_step: usize,
}

pub type FloatConstantList = ConstantList<f32>;
pub type IntConstantList = ConstantList<i32>;

impl<T: Copy + Default> ConstantList<T> {
    pub fn new() -> Self {
        Self::with_grow_step(DEFAULT_GROW_STEP)
    }

    pub fn with_grow_step(grow_step: usize) -> Self {
        Self {
            values: Vec::new(),
            grow_step: grow_step.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn grow_step(&self) -> usize {
        self.grow_step
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    /// Grow to `new_len`, filling with default values
    ///
    /// # Errors
    ///
    /// Returns `Error::StateViolation` if `new_len` is smaller than the
    /// current length.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        if new_len < self.values.len() {
            orbit_bail!(StateViolation => "orbit3d::ConstantList",
                "Cannot shrink constant list from {} to {}", self.values.len(), new_len);
        }
        self.reserve_for(new_len);
        self.values.resize(new_len, T::default());
        Ok(())
    }

    /// Append `count` default values
    pub fn extend_zeros(&mut self, count: usize) {
        let new_len = self.values.len() + count;
        self.reserve_for(new_len);
        self.values.resize(new_len, T::default());
    }

    /// Insert `count` default values before `position`
    pub fn insert_zeros(&mut self, position: usize, count: usize) -> Result<()> {
        if position > self.values.len() {
            orbit_bail!(BoundsViolation => "orbit3d::ConstantList",
                "Insert position {} beyond length {}", position, self.values.len());
        }
        self.reserve_for(self.values.len() + count);
        self.values.splice(position..position, std::iter::repeat(T::default()).take(count));
        Ok(())
    }

    pub fn push(&mut self, value: T) {
        self.reserve_for(self.values.len() + 1);
        self.values.push(value);
    }

    /// Remove `count` values starting at `start`
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= self.values.len() => {
                self.values.drain(start..end);
                Ok(())
            }
            _ => Err(crate::orbit_err!(BoundsViolation => "orbit3d::ConstantList",
                "Range {}+{} beyond length {}", start, count, self.values.len())),
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Copy `src` to `offset`
    pub fn write(&mut self, offset: usize, src: &[T]) -> Result<()> {
        match offset.checked_add(src.len()) {
            Some(end) if end <= self.values.len() => {
                self.values[offset..end].copy_from_slice(src);
                Ok(())
            }
            _ => Err(crate::orbit_err!(BoundsViolation => "orbit3d::ConstantList",
                "Write of {} values at {} beyond length {}", src.len(), offset, self.values.len())),
        }
    }

    fn reserve_for(&mut self, len: usize) {
        let capacity = self.values.capacity();
        if len > capacity {
            let steps = (len - capacity).div_ceil(self.grow_step);
            self.values.reserve_exact(capacity + steps * self.grow_step - self.values.len());
        }
    }
}

impl<T: Copy + Default> Default for ConstantList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "constant_list_tests.rs"]
mod tests;
