//! Viewport measurement port and bus-backed resize subscriptions.

use std::{cell::Cell, rc::Rc};

use log::{debug, warn};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::protocol::{Message, ViewportMessage};

/// Source of viewport geometry and resize notices.
pub trait ViewportPort {
    /// Current viewport width in logical pixels.
    fn measure_width_px(&self) -> u32;
    /// Registers for resize notices. Dropping the subscription unsubscribes.
    fn subscribe_resize(&self) -> ResizeSubscription;
}

/// Receiving half of a resize registration.
///
/// Holds a bus receiver; the registration ends when this value is dropped.
pub struct ResizeSubscription {
    receiver: broadcast::Receiver<Message>,
    closed: bool,
}

impl ResizeSubscription {
    pub fn new(receiver: broadcast::Receiver<Message>) -> Self {
        Self {
            receiver,
            closed: false,
        }
    }

    /// Drains queued bus traffic without blocking.
    ///
    /// Returns `true` when at least one resize notice arrived since the last
    /// call. Coalescing is fine because notices carry no payload.
    pub fn take_resize_pending(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let mut pending = false;
        loop {
            match self.receiver.try_recv() {
                Ok(Message::Viewport(ViewportMessage::Resized)) => pending = true,
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(
                        "Resize subscription lagged, skipped {} message(s); re-measuring",
                        skipped
                    );
                    pending = true;
                }
                Err(TryRecvError::Closed) => {
                    warn!("Viewport bus closed; no further resize notices will arrive");
                    self.closed = true;
                    break;
                }
            }
        }
        pending
    }
}

/// Viewport owned by the shell and observed by carousel controllers.
#[derive(Clone)]
pub struct SharedViewport {
    width_px: Rc<Cell<u32>>,
    bus_sender: broadcast::Sender<Message>,
}

impl SharedViewport {
    pub fn new(initial_width_px: u32, bus_sender: broadcast::Sender<Message>) -> Self {
        Self {
            width_px: Rc::new(Cell::new(initial_width_px)),
            bus_sender,
        }
    }

    /// Stores the new width and broadcasts a resize notice.
    pub fn resize(&self, width_px: u32) {
        self.width_px.set(width_px);
        // No receivers is not an error: nothing is listening yet.
        let _ = self
            .bus_sender
            .send(Message::Viewport(ViewportMessage::Resized));
    }

    /// Number of live bus receivers, resize subscriptions included.
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.bus_sender.receiver_count()
    }
}

impl ViewportPort for SharedViewport {
    fn measure_width_px(&self) -> u32 {
        self.width_px.get()
    }

    fn subscribe_resize(&self) -> ResizeSubscription {
        ResizeSubscription::new(self.bus_sender.subscribe())
    }
}
