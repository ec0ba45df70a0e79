use derive_more::Display;
use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::{Rc, Weak},
};

///
/// Topic
///
/// Invalidation topics. Events carry no payload: subscribers re-read the
/// authoritative state themselves. Entity-scoped topics exist so a
/// consumer interested in one collection need not subscribe to the
/// catch-all; `AllDataUpdated` exists so "anything changed" consumers
/// need exactly one registration.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Topic {
    #[display("products_updated")]
    ProductsUpdated,

    #[display("avatars_updated")]
    AvatarsUpdated,

    #[display("all_data_updated")]
    AllDataUpdated,
}

impl Topic {
    pub const ALL: [Self; 3] = [
        Self::ProductsUpdated,
        Self::AvatarsUpdated,
        Self::AllDataUpdated,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::ProductsUpdated => 0,
            Self::AvatarsUpdated => 1,
            Self::AllDataUpdated => 2,
        }
    }
}

type Callback = Rc<dyn Fn()>;

struct Registered {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct BusState {
    topics: [Vec<Registered>; 3],
    next_id: u64,
    delivering: bool,
    queued: VecDeque<Topic>,
}

///
/// EventBus
///
/// Publish/subscribe register, constructed once per [`crate::db::Db`] and
/// passed by reference — never a process-wide global, so tests can build
/// isolated buses freely.
///
/// Delivery is synchronous and in registration order. Emissions raised
/// while a delivery is in progress are queued and flushed after the
/// current delivery completes: a re-entrant write cannot skip a
/// subscriber or reorder invalidations.
///

#[derive(Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one topic. Dropping the returned
    /// [`Subscription`] removes the registration.
    pub fn subscribe(&self, topic: Topic, callback: impl Fn() + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.topics[topic.slot()].push(Registered {
            id,
            callback: Rc::new(callback),
        });

        Subscription {
            state: Rc::downgrade(&self.state),
            topic,
            id,
        }
    }

    /// Emit an invalidation. Every callback currently registered for
    /// `topic` runs before this returns — unless a delivery is already in
    /// progress, in which case the emission is queued and flushed by the
    /// outer call.
    pub fn emit(&self, topic: Topic) {
        {
            let mut state = self.state.borrow_mut();
            if state.delivering {
                state.queued.push_back(topic);
                return;
            }
            state.delivering = true;
        }

        // Clears the delivering flag on every exit, unwind included: one
        // panicking callback must not wedge the bus for the session.
        struct Guard(Rc<RefCell<BusState>>);

        impl Drop for Guard {
            fn drop(&mut self) {
                let mut state = self.0.borrow_mut();
                state.delivering = false;
                state.queued.clear();
            }
        }

        let _guard = Guard(Rc::clone(&self.state));

        let mut current = Some(topic);
        while let Some(topic) = current {
            self.deliver(topic);
            current = self.state.borrow_mut().queued.pop_front();
        }
    }

    fn deliver(&self, topic: Topic) {
        // Snapshot the list so callbacks may subscribe or unsubscribe
        // without invalidating this iteration.
        let callbacks: Vec<Callback> = self.state.borrow().topics[topic.slot()]
            .iter()
            .map(|registered| Rc::clone(&registered.callback))
            .collect();

        for callback in callbacks {
            callback();
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.state.borrow().topics[topic.slot()].len()
    }
}

///
/// Subscription
///
/// Registration guard. Removes itself on drop; removal after the bus is
/// gone, or a second removal, is a no-op.
///

pub struct Subscription {
    state: Weak<RefCell<BusState>>,
    topic: Topic,
    id: u64,
}

impl Subscription {
    /// Explicitly remove this registration.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    fn remove(&self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().topics[self.topic.slot()]
                .retain(|registered| registered.id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_bus() -> (EventBus, Rc<RefCell<Vec<&'static str>>>) {
        (EventBus::new(), Rc::new(RefCell::new(Vec::new())))
    }

    #[test]
    fn emit_delivers_in_registration_order() {
        let (bus, seen) = recording_bus();

        let subs: Vec<Subscription> = ["first", "second", "third"]
            .into_iter()
            .map(|label| {
                let seen = Rc::clone(&seen);
                bus.subscribe(Topic::AllDataUpdated, move || {
                    seen.borrow_mut().push(label);
                })
            })
            .collect();

        bus.emit(Topic::AllDataUpdated);

        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
        drop(subs);
    }

    #[test]
    fn topics_are_independent() {
        let (bus, seen) = recording_bus();

        let seen_products = Rc::clone(&seen);
        let _sub = bus.subscribe(Topic::ProductsUpdated, move || {
            seen_products.borrow_mut().push("products");
        });

        bus.emit(Topic::AvatarsUpdated);
        assert!(seen.borrow().is_empty());

        bus.emit(Topic::ProductsUpdated);
        assert_eq!(*seen.borrow(), vec!["products"]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let (bus, seen) = recording_bus();

        let seen_cb = Rc::clone(&seen);
        let sub = bus.subscribe(Topic::AllDataUpdated, move || {
            seen_cb.borrow_mut().push("hit");
        });
        assert_eq!(bus.subscriber_count(Topic::AllDataUpdated), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(Topic::AllDataUpdated), 0);

        bus.emit(Topic::AllDataUpdated);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn explicit_unsubscribe_matches_drop() {
        let (bus, seen) = recording_bus();

        let seen_cb = Rc::clone(&seen);
        let sub = bus.subscribe(Topic::ProductsUpdated, move || {
            seen_cb.borrow_mut().push("hit");
        });
        sub.unsubscribe();

        bus.emit(Topic::ProductsUpdated);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn reentrant_emit_is_queued_not_nested() {
        let bus = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        // First subscriber re-emits a different topic; the second must
        // still observe the original delivery before the queued one runs.
        let reemit_bus = Rc::clone(&bus);
        let seen_a = Rc::clone(&seen);
        let fired = Rc::new(RefCell::new(false));
        let fired_flag = Rc::clone(&fired);
        let _sub_a = bus.subscribe(Topic::AllDataUpdated, move || {
            seen_a.borrow_mut().push("a:all");
            if !*fired_flag.borrow() {
                *fired_flag.borrow_mut() = true;
                reemit_bus.emit(Topic::ProductsUpdated);
            }
        });

        let seen_b = Rc::clone(&seen);
        let _sub_b = bus.subscribe(Topic::AllDataUpdated, move || {
            seen_b.borrow_mut().push("b:all");
        });

        let seen_c = Rc::clone(&seen);
        let _sub_c = bus.subscribe(Topic::ProductsUpdated, move || {
            seen_c.borrow_mut().push("c:products");
        });

        bus.emit(Topic::AllDataUpdated);

        // Queued emission lands after the in-progress delivery finished.
        assert_eq!(*seen.borrow(), vec!["a:all", "b:all", "c:products"]);
    }

    #[test]
    fn panicking_subscriber_does_not_wedge_the_bus() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let (bus, seen) = recording_bus();
        let sub = bus.subscribe(Topic::AllDataUpdated, || {
            panic!("intentional panic for guard test");
        });

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            bus.emit(Topic::AllDataUpdated);
        }))
        .is_err();
        assert!(panicked);
        drop(sub);

        let seen_cb = Rc::clone(&seen);
        let _sub = bus.subscribe(Topic::AllDataUpdated, move || {
            seen_cb.borrow_mut().push("after");
        });
        bus.emit(Topic::AllDataUpdated);

        assert_eq!(*seen.borrow(), vec!["after"]);
    }

    #[test]
    fn subscriber_added_during_delivery_misses_that_delivery() {
        let bus = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let late_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let sub_bus = Rc::clone(&bus);
        let seen_a = Rc::clone(&seen);
        let late_slot = Rc::clone(&late_sub);
        let _sub_a = bus.subscribe(Topic::AllDataUpdated, move || {
            seen_a.borrow_mut().push("a");
            if late_slot.borrow().is_none() {
                let seen_late = Rc::clone(&seen_a);
                let sub = sub_bus.subscribe(Topic::AllDataUpdated, move || {
                    seen_late.borrow_mut().push("late");
                });
                *late_slot.borrow_mut() = Some(sub);
            }
        });

        bus.emit(Topic::AllDataUpdated);
        assert_eq!(*seen.borrow(), vec!["a"]);

        bus.emit(Topic::AllDataUpdated);
        assert_eq!(*seen.borrow(), vec!["a", "a", "late"]);
    }
}
