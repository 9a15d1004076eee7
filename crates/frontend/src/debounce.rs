use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;

/// Delay between the last zoom event and the marker rebuild.
pub const ZOOM_DEBOUNCE_MS: u32 = 100;

/// Runs only the most recent scheduled callback once `delay_ms` has passed
/// without another call.
#[derive(Clone)]
pub struct Debouncer {
    delay_ms: u32,
    pending: Rc<RefCell<Option<Timeout>>>,
}

impl Debouncer {
    pub fn new(delay_ms: u32) -> Self {
        Debouncer {
            delay_ms,
            pending: Rc::new(RefCell::new(None)),
        }
    }

    pub fn call(&self, f: impl FnOnce() + 'static) {
        let slot = self.pending.clone();
        let timeout = Timeout::new(self.delay_ms, move || {
            slot.borrow_mut().take();
            f();
        });
        // Dropping the previous timeout cancels it.
        self.pending.borrow_mut().replace(timeout);
    }

    pub fn cancel(&self) {
        if let Some(timeout) = self.pending.borrow_mut().take() {
            timeout.cancel();
        }
    }
}
