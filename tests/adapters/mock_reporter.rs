use gatesweep::adapters::{PurgeEvent, PurgeReporter};
use std::sync::{Arc, Mutex};

pub struct MockReporter {
    pub events: Arc<Mutex<Vec<PurgeEvent>>>,
}

impl Default for MockReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReporter {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<PurgeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events satisfying `predicate`
    pub fn count(&self, predicate: impl Fn(&PurgeEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl PurgeReporter for MockReporter {
    fn report(&self, event: PurgeEvent) {
        self.events.lock().unwrap().push(event);
    }
}
