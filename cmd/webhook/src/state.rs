use svclabel_mutator::engine::Engine;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct WebhookState<L> {
    pub engine: Arc<Engine<L>>,
    ready: Arc<AtomicBool>,
}

// manual impl: `L` itself does not need to be `Clone`
impl<L> Clone for WebhookState<L> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            ready: Arc::clone(&self.ready),
        }
    }
}

impl<L> WebhookState<L> {
    pub fn new(engine: Engine<L>) -> Self {
        Self {
            engine: Arc::new(engine),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Flip readiness off so the Service stops routing admission calls here.
    pub fn set_not_ready(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }
}
