//! Per-instance event channel.
//!
//! Each viewport owns one bus; it is created with the coordinator and cleared
//! during teardown. Delivery is synchronous: `emit` runs every subscriber for
//! the event's kind, in subscription order (FIFO within one kind). No ordering
//! is guaranteed across distinct kinds.

use std::collections::HashMap;

/// Discriminant used for subscription bookkeeping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Resized,
    CameraUpdated,
    Rendered,
    PreFrame,
    PostFrame,
}

/// Events published by the viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ViewportEvent {
    /// The observed surface size changed. Dimensions are logical pixels.
    Resized { width: f32, height: f32 },
    /// The camera projection was recomputed after a resize.
    CameraUpdated,
    /// The surface was attached and the first-resize pass completed.
    Rendered,
    /// Emitted at the top of every frame tick.
    PreFrame,
    /// Emitted at the end of every frame tick.
    PostFrame,
}

impl ViewportEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewportEvent::Resized { .. } => EventKind::Resized,
            ViewportEvent::CameraUpdated => EventKind::CameraUpdated,
            ViewportEvent::Rendered => EventKind::Rendered,
            ViewportEvent::PreFrame => EventKind::PreFrame,
            ViewportEvent::PostFrame => EventKind::PostFrame,
        }
    }
}

/// Handle returned by [`EventBus::on`]; pass back to [`EventBus::off`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

type Callback = Box<dyn FnMut(&ViewportEvent)>;

/// Process-local publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: HashMap<EventKind, Vec<(u64, Callback)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`. Subscribers are invoked in
    /// registration order.
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> Subscription
    where
        F: FnMut(&ViewportEvent) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers
            .entry(kind)
            .or_default()
            .push((id, Box::new(callback)));
        Subscription { kind, id }
    }

    /// Removes a subscription. Unknown handles are ignored.
    pub fn off(&mut self, subscription: Subscription) {
        if let Some(list) = self.subscribers.get_mut(&subscription.kind) {
            list.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Delivers `event` to every subscriber of its kind, FIFO.
    pub fn emit(&mut self, event: ViewportEvent) {
        let Some(list) = self.subscribers.get_mut(&event.kind()) else {
            return;
        };
        // Index-based iteration tolerates subscriptions added mid-delivery;
        // they are picked up by this emit if appended to the same kind.
        let mut i = 0;
        while i < list.len() {
            (list[i].1)(&event);
            i += 1;
        }
    }

    /// Drops every subscriber. Used during teardown.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}
