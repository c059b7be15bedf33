//! Observer registration and firing
//!
//! The hub is the explicit tap interface the network consults during a
//! forward evaluation: callbacks registered against an observation point
//! fire synchronously, on the calling thread, at the moment the evaluation
//! reaches that point. There is no background machinery: interception is
//! blocking, and a callback failure aborts the evaluation it interrupted.

use super::point::ObservationPoint;
use crate::nn::Network;
use crate::Result;
use ndarray::ArrayD;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A captured activation handed to a tap callback.
///
/// The activation is borrowed from the evaluation in progress and is valid
/// only for the duration of the call: a callback that needs the values
/// afterwards must copy them out (the buffer may be reused by the next
/// layer). Callbacks cannot mutate the activation.
pub struct TapEvent<'a> {
    /// The point this event fired at
    pub point: &'a ObservationPoint,
    /// The intercepted activation, `[batch, channel, ...spatial]`
    pub activation: &'a ArrayD<f32>,
}

/// Callback invoked with each intercepted activation.
///
/// Errors propagate up through the forward evaluation: a bad observer
/// aborts the whole inspection run rather than being silently dropped.
pub type TapCallback = Box<dyn FnMut(&TapEvent<'_>) -> Result<()>>;

struct Tap {
    id: u64,
    point: ObservationPoint,
    callback: Rc<RefCell<TapCallback>>,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    taps: Vec<Tap>,
}

/// Registry of live tap registrations.
///
/// Registrations fire in registration order. The firing path snapshots the
/// matching callbacks first, so a callback may attach further taps without
/// invalidating the iteration; a detach performed mid-evaluation takes
/// effect from the next firing point onward.
#[derive(Default)]
pub struct ObserverHub {
    inner: Rc<RefCell<HubInner>>,
}

impl ObserverHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` at `point`, validating the address against
    /// `network` first.
    ///
    /// Multiple registrations on distinct or even the same point are
    /// permitted. The returned handle is the only way to revoke the
    /// registration; a registration that is never detached keeps firing
    /// on every later forward evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LayerNotFound`] when `point` does not
    /// resolve to a layer of `network`.
    pub fn attach(
        &self,
        network: &Network,
        point: ObservationPoint,
        callback: TapCallback,
    ) -> Result<TapHandle> {
        network.resolve(&point.layer)?;

        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.taps.push(Tap {
            id,
            point,
            callback: Rc::new(RefCell::new(callback)),
        });

        Ok(TapHandle {
            hub: Rc::downgrade(&self.inner),
            id,
        })
    }

    /// Number of registrations currently attached.
    pub fn active_taps(&self) -> usize {
        self.inner.borrow().taps.len()
    }

    /// Invoke every callback registered at `point`, in registration order.
    pub(crate) fn fire(&self, point: &ObservationPoint, activation: &ArrayD<f32>) -> Result<()> {
        let matching: Vec<Rc<RefCell<TapCallback>>> = self
            .inner
            .borrow()
            .taps
            .iter()
            .filter(|tap| tap.point == *point)
            .map(|tap| Rc::clone(&tap.callback))
            .collect();

        if matching.is_empty() {
            return Ok(());
        }

        let event = TapEvent { point, activation };
        for callback in matching {
            (callback.borrow_mut())(&event)?;
        }
        Ok(())
    }
}

/// A live observer registration.
///
/// ATTACHED until [`TapHandle::detach`] is called, then DETACHED: terminal
/// and one-way. Dropping the handle does *not* detach; detachment is an
/// explicit, required step once an inspection run is over.
#[derive(Debug)]
pub struct TapHandle {
    hub: Weak<RefCell<HubInner>>,
    id: u64,
}

impl TapHandle {
    /// Revoke the registration. Subsequent forward evaluations no longer
    /// invoke its callback. Detaching twice is a no-op.
    pub fn detach(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.borrow_mut().taps.retain(|tap| tap.id != self.id);
        }
        self.hub = Weak::new();
    }

    /// Whether this registration is still live in its hub.
    pub fn is_attached(&self) -> bool {
        self.hub
            .upgrade()
            .is_some_and(|inner| inner.borrow().taps.iter().any(|tap| tap.id == self.id))
    }
}
