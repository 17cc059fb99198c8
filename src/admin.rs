//! Admin slot
//!
//! Mutually-exclusive single-occupant reservation: at most one
//! administrator session is ever in its command loop. Acquisition is a
//! check-and-set under one lock; release happens when the guard drops, so
//! abnormal exits from the command loop release the slot too.

use std::sync::Mutex;

/// Notice sent to a second administrator while the slot is occupied
pub const ADMIN_BUSY_NOTICE: &str =
    "An admin is already connected. Only one admin can be connected at a time.";

/// Single-occupant reservation for the administrator role
#[derive(Debug, Default)]
pub struct AdminSlot {
    occupied: Mutex<bool>,
}

impl AdminSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to occupy the slot
    ///
    /// Returns a guard on success; the slot stays occupied until the guard
    /// drops. Fails when another admin session holds it.
    pub fn try_acquire(&self) -> Option<AdminGuard<'_>> {
        let mut occupied = self.occupied.lock().unwrap_or_else(|e| e.into_inner());
        if *occupied {
            return None;
        }
        *occupied = true;
        Some(AdminGuard { slot: self })
    }

    /// Whether an admin session currently holds the slot
    pub fn is_occupied(&self) -> bool {
        *self.occupied.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self) {
        let mut occupied = self.occupied.lock().unwrap_or_else(|e| e.into_inner());
        *occupied = false;
    }
}

/// Occupancy guard; releases the slot on drop
#[derive(Debug)]
pub struct AdminGuard<'a> {
    slot: &'a AdminSlot,
}

impl Drop for AdminGuard<'_> {
    fn drop(&mut self) {
        self.slot.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_acquisition() {
        let slot = AdminSlot::new();
        let guard = slot.try_acquire();
        assert!(guard.is_some());
        assert!(slot.is_occupied());

        // Second attempt fails while the first guard lives
        assert!(slot.try_acquire().is_none());
    }

    #[test]
    fn test_release_on_drop() {
        let slot = AdminSlot::new();
        let guard = slot.try_acquire().unwrap();
        drop(guard);

        assert!(!slot.is_occupied());
        assert!(slot.try_acquire().is_some());
    }

    #[test]
    fn test_occupancy_never_exceeds_one() {
        let slot = AdminSlot::new();
        let _guard = slot.try_acquire().unwrap();
        for _ in 0..10 {
            assert!(slot.try_acquire().is_none());
        }
    }
}
