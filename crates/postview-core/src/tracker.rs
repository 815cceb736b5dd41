//! "Currently reading" heading, driven by viewport intersection reports.
//!
//! The browser side (an `IntersectionObserver`) feeds [`Subscription::observe`];
//! everything here is single-threaded and platform independent.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

/// Vertical band of the viewport, as fractions from the top, that counts as
/// "in view".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportBand {
    pub top: f64,
    pub bottom: f64,
}

impl Default for ViewportBand {
    fn default() -> Self {
        Self {
            top: 0.2,
            bottom: 0.4,
        }
    }
}

impl ViewportBand {
    /// `rootMargin` for an `IntersectionObserver` that only reports headings
    /// inside the band, e.g. `-20% 0px -60% 0px`.
    pub fn root_margin(&self) -> String {
        let top = (self.top.clamp(0.0, 1.0) * 100.0).round();
        let bottom = ((1.0 - self.bottom.clamp(0.0, 1.0)) * 100.0).round();
        format!("-{}% 0px -{}% 0px", top, bottom)
    }
}

type Listener = Box<dyn FnMut(Option<&str>)>;

struct TrackerState {
    heading_ids: Vec<String>,
    active: Option<String>,
    listeners: Vec<Listener>,
    stopped: bool,
}

/// Live tracking of the active heading for one mounted document.
///
/// Stops on [`Subscription::stop`] or when dropped; reports after that are
/// ignored.
pub struct Subscription {
    state: Rc<RefCell<TrackerState>>,
}

/// Weak handle for observer callbacks; it never keeps a subscription alive.
#[derive(Clone)]
pub struct TrackerHandle {
    state: Weak<RefCell<TrackerState>>,
}

pub fn start_tracking<I, S>(heading_ids: I) -> Subscription
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let heading_ids: Vec<String> = heading_ids.into_iter().map(Into::into).collect();
    debug!("tracker: watching {} headings", heading_ids.len());
    Subscription {
        state: Rc::new(RefCell::new(TrackerState {
            heading_ids,
            active: None,
            listeners: Vec::new(),
            stopped: false,
        })),
    }
}

impl Subscription {
    pub fn active_id(&self) -> Option<String> {
        self.state.borrow().active.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    pub fn heading_ids(&self) -> Vec<String> {
        self.state.borrow().heading_ids.clone()
    }

    /// Calls `listener` with the new active id after every change.
    pub fn on_change(&self, listener: impl FnMut(Option<&str>) + 'static) {
        self.state.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Records one intersection report. Intersecting headings win in report
    /// order (last write wins); headings leaving the band keep the current
    /// value so the outline does not flicker between sections.
    pub fn observe(&self, id: &str, intersecting: bool) {
        observe(&self.state, id, intersecting);
    }

    pub fn handle(&self) -> TrackerHandle {
        TrackerHandle {
            state: Rc::downgrade(&self.state),
        }
    }

    pub fn stop(&self) {
        let mut state = self.state.borrow_mut();
        if !state.stopped {
            debug!("tracker: stopped");
            state.stopped = true;
            state.listeners.clear();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Subscription")
            .field("heading_ids", &state.heading_ids)
            .field("active", &state.active)
            .field("stopped", &state.stopped)
            .finish()
    }
}

impl TrackerHandle {
    /// Forwards a report; returns false once the subscription is gone or stopped.
    pub fn observe(&self, id: &str, intersecting: bool) -> bool {
        match self.state.upgrade() {
            Some(state) => {
                if state.borrow().stopped {
                    return false;
                }
                observe(&state, id, intersecting);
                true
            }
            None => false,
        }
    }
}

fn observe(state: &RefCell<TrackerState>, id: &str, intersecting: bool) {
    let mut listeners = {
        let mut state = state.borrow_mut();
        if state.stopped || !intersecting {
            return;
        }
        if !state.heading_ids.iter().any(|known| known == id) {
            return;
        }
        if state.active.as_deref() == Some(id) {
            return;
        }
        state.active = Some(id.to_string());
        std::mem::take(&mut state.listeners)
    };

    // Listeners run without the borrow held so they may query the subscription.
    for listener in &mut listeners {
        listener(Some(id));
    }

    let mut state = state.borrow_mut();
    if !state.stopped {
        listeners.append(&mut state.listeners);
        state.listeners = listeners;
    }
}
