//! Frame slot bookkeeping
//!
//! Tracks which of the N frame slots have unfinished GPU work and which slot
//! last rendered into each swap chain image. The chain consults this before
//! reusing an image so at most N frames are ever in flight, and an image is
//! never rendered into while a different slot's submission still targets it.
//!
//! The fence waits themselves are supplied by the caller, so the same
//! sequencing drives both the Vulkan chain and the in-memory test chain.

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Ring of frame slots plus per-image ownership
#[derive(Debug, Clone)]
pub struct FrameSlots {
    current: usize,
    submitted: Vec<bool>,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameSlots {
    /// Create `frames_in_flight` idle slots for a chain of `image_count` images
    pub fn new(frames_in_flight: usize, image_count: usize) -> Self {
        Self {
            current: 0,
            submitted: vec![false; frames_in_flight.max(1)],
            images_in_flight: vec![None; image_count],
        }
    }

    /// Number of slots
    pub fn frames_in_flight(&self) -> usize {
        self.submitted.len()
    }

    /// Slot used by the frame being prepared
    pub fn current(&self) -> usize {
        self.current
    }

    /// Mark a slot's submission as complete; call after its fence signaled
    pub fn retire(&mut self, slot: usize) {
        if let Some(submitted) = self.submitted.get_mut(slot) {
            *submitted = false;
        }
    }

    /// Wait for the current slot's previous submission and retire it
    ///
    /// `wait` blocks on the fence of the slot it is given. Returns the slot.
    pub fn wait_current(&mut self, wait: impl FnOnce(usize) -> VulkanResult<()>) -> VulkanResult<usize> {
        let slot = self.current;
        wait(slot)?;
        self.retire(slot);
        Ok(slot)
    }

    /// Record that the current slot will render into `image`
    ///
    /// Returns the slot that previously rendered into the image when that
    /// slot differs from the current one and has not been retired. The caller
    /// must wait on that slot's fence and retire it before recording.
    pub fn claim_image(&mut self, image: usize) -> Option<usize> {
        let entry = self.images_in_flight.get_mut(image)?;
        let previous = entry.replace(self.current);
        previous.filter(|&owner| owner != self.current && self.submitted.get(owner).copied().unwrap_or(false))
    }

    /// Claim `image` for the current slot, waiting on a pending previous owner
    pub fn acquire_image(&mut self, image: usize, wait: impl FnOnce(usize) -> VulkanResult<()>) -> VulkanResult<()> {
        if let Some(owner) = self.claim_image(image) {
            wait(owner)?;
            self.retire(owner);
        }
        Ok(())
    }

    /// Record that the current slot submits work
    ///
    /// Fails when the slot's previous submission was never retired, which
    /// means its fence was not waited on and more than
    /// [`frames_in_flight`](Self::frames_in_flight) frames could be queued.
    pub fn mark_submitted(&mut self) -> VulkanResult<()> {
        let slot = self.current;
        if self.submitted[slot] {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Frame slot {slot} submitted again before its fence was waited on"),
            });
        }
        self.submitted[slot] = true;
        Ok(())
    }

    /// Move to the next slot
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.submitted.len();
    }

    /// Number of slots whose work may still be executing
    pub fn in_flight(&self) -> usize {
        self.submitted.iter().filter(|&&submitted| submitted).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_wait(_: usize) -> VulkanResult<()> {
        Ok(())
    }

    #[test]
    fn test_slots_cycle() {
        let mut slots = FrameSlots::new(2, 3);
        assert_eq!(slots.current(), 0);
        slots.advance();
        assert_eq!(slots.current(), 1);
        slots.advance();
        assert_eq!(slots.current(), 0);
    }

    #[test]
    fn test_in_flight_never_exceeds_slot_count() {
        let mut slots = FrameSlots::new(2, 3);
        let mut max_seen = 0;
        let mut waits = Vec::new();

        for frame in 0..12 {
            slots
                .wait_current(|slot| {
                    waits.push(slot);
                    Ok(())
                })
                .unwrap();
            slots.acquire_image(frame % 3, no_wait).unwrap();
            slots.mark_submitted().unwrap();
            max_seen = max_seen.max(slots.in_flight());
            slots.advance();
        }

        assert_eq!(max_seen, 2);
        assert_eq!(waits.len(), 12);
        assert_eq!(&waits[..4], &[0, 1, 0, 1]);
    }

    #[test]
    fn test_submit_without_fence_wait_is_rejected() {
        let mut slots = FrameSlots::new(2, 3);

        for _ in 0..2 {
            slots.mark_submitted().unwrap();
            slots.advance();
        }

        // Slot 0 comes round again with its first frame still pending
        let err = slots.mark_submitted().unwrap_err();
        assert!(matches!(err, VulkanError::InvalidOperation { .. }));
        assert_eq!(slots.in_flight(), 2);
    }

    #[test]
    fn test_failed_wait_keeps_slot_pending() {
        let mut slots = FrameSlots::new(2, 2);
        slots.mark_submitted().unwrap();
        slots.advance();
        slots.advance();

        let result = slots.wait_current(|_| Err(VulkanError::Api(ash::vk::Result::TIMEOUT)));
        assert!(result.is_err());
        assert_eq!(slots.in_flight(), 1);
        assert!(slots.mark_submitted().is_err());
    }

    #[test]
    fn test_acquire_waits_on_other_pending_owner() {
        let mut slots = FrameSlots::new(2, 2);

        slots.acquire_image(0, no_wait).unwrap();
        slots.mark_submitted().unwrap();
        slots.advance();

        // Slot 1 gets image 0 back while slot 0 is still pending
        let mut waited = None;
        slots
            .acquire_image(0, |owner| {
                waited = Some(owner);
                Ok(())
            })
            .unwrap();
        assert_eq!(waited, Some(0));
        assert_eq!(slots.in_flight(), 0);
    }

    #[test]
    fn test_claim_ignores_retired_or_same_owner() {
        let mut slots = FrameSlots::new(2, 2);

        slots.claim_image(1);
        slots.mark_submitted().unwrap();
        slots.advance();
        slots.retire(0);
        assert_eq!(slots.claim_image(1), None);

        slots.mark_submitted().unwrap();
        slots.advance();
        slots.advance();
        // Same slot as the last owner
        assert_eq!(slots.claim_image(1), None);
    }

    #[test]
    fn test_out_of_range_image_is_ignored() {
        let mut slots = FrameSlots::new(2, 1);
        assert_eq!(slots.claim_image(5), None);
    }
}
