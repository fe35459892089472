use std::sync::Arc;
use tokio::sync::Semaphore;

/// Admission control over the system-wide transcode budget.
///
/// Injected into every session at construction so independent managers
/// (and tests) never share bookkeeping by accident. Implementations must
/// tolerate concurrent calls from arbitrarily many sessions.
pub trait AdmissionControl: Send + Sync {
    /// Claim a slot. Returns false when the budget is exhausted.
    fn try_acquire(&self) -> bool;

    /// Return a previously granted slot. Called exactly once per grant,
    /// on process exit.
    fn release(&self);
}

/// Default slot pool bounding concurrent transcoder processes.
pub struct TranscodeSlots {
    sem: Semaphore,
}

impl TranscodeSlots {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            sem: Semaphore::new(capacity),
        })
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }
}

impl AdmissionControl for TranscodeSlots {
    fn try_acquire(&self) -> bool {
        match self.sem.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    fn release(&self) {
        self.sem.add_permits(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_up_to_capacity_then_denies() {
        let slots = TranscodeSlots::new(2);
        assert!(slots.try_acquire());
        assert!(slots.try_acquire());
        assert!(!slots.try_acquire());
        assert_eq!(slots.available(), 0);
    }

    #[test]
    fn release_restores_a_slot() {
        let slots = TranscodeSlots::new(1);
        assert!(slots.try_acquire());
        assert!(!slots.try_acquire());
        slots.release();
        assert!(slots.try_acquire());
    }

    #[test]
    fn zero_capacity_always_denies() {
        let slots = TranscodeSlots::new(0);
        assert!(!slots.try_acquire());
    }

    #[test]
    fn concurrent_acquire_release_conserves_slots() {
        let slots = TranscodeSlots::new(4);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&slots);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    if pool.try_acquire() {
                        pool.release();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(slots.available(), 4);
    }
}
