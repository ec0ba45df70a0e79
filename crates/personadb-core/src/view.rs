use crate::{
    bus::{Subscription, Topic},
    db::Db,
    model::{Avatar, Product},
};
use std::{cell::RefCell, rc::Rc};

///
/// DataSnapshot
///
/// Point-in-time, read-only copy of both collections. Never the
/// authoritative data: writes go through [`Db`], not through a snapshot.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSnapshot {
    pub products: Vec<Product>,
    pub avatars: Vec<Avatar>,
}

type ChangeListener = Rc<dyn Fn(&DataSnapshot)>;

#[derive(Default)]
struct ViewState {
    snapshot: DataSnapshot,
    version: u64,
    listener: Option<ChangeListener>,
}

///
/// DataView
///
/// Consumer-facing binding: holds cached snapshots, reloads on bus
/// invalidations, and swallows reloads that change nothing, so a consumer
/// is never told "changed" when a re-read produced structurally identical
/// data.
///

pub struct DataView {
    db: Rc<Db>,
    state: Rc<RefCell<ViewState>>,
    subscriptions: Vec<Subscription>,
}

impl DataView {
    /// Bind to `db`: subscribe to every topic and prime the cache with
    /// one unconditional load.
    #[must_use]
    pub fn attach(db: Rc<Db>) -> Self {
        let state = Rc::new(RefCell::new(ViewState::default()));

        let subscriptions = Topic::ALL
            .into_iter()
            .map(|topic| {
                let reload_db = Rc::clone(&db);
                let reload_state = Rc::clone(&state);
                db.subscribe(topic, move || {
                    reload_into(&reload_db, &reload_state);
                })
            })
            .collect();

        let view = Self {
            db,
            state,
            subscriptions,
        };
        view.prime();
        view
    }

    // The default (empty) snapshot says nothing about storage contents,
    // so the first load replaces it without a version bump.
    fn prime(&self) {
        let snapshot = load_snapshot(&self.db);
        self.state.borrow_mut().snapshot = snapshot;
    }

    /// Re-read both collections now. The cached snapshot is replaced only
    /// when the loaded data is structurally different; only a replacement
    /// bumps the version and notifies the listener.
    pub fn reload(&self) {
        reload_into(&self.db, &self.state);
    }

    /// Install the listener invoked after each real snapshot replacement.
    pub fn on_change(&self, listener: impl Fn(&DataSnapshot) + 'static) {
        self.state.borrow_mut().listener = Some(Rc::new(listener));
    }

    /// Current cached snapshot.
    #[must_use]
    pub fn snapshot(&self) -> DataSnapshot {
        self.state.borrow().snapshot.clone()
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.state.borrow().snapshot.products.clone()
    }

    #[must_use]
    pub fn avatars(&self) -> Vec<Avatar> {
        self.state.borrow().snapshot.avatars.clone()
    }

    /// Number of real snapshot replacements since attach.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    /// Drop every bus registration. Safe to call repeatedly; a detached
    /// view keeps serving its last snapshot.
    pub fn detach(&mut self) {
        self.subscriptions.clear();
    }
}

fn load_snapshot(db: &Db) -> DataSnapshot {
    DataSnapshot {
        products: db.list::<Product>().into_inner(),
        avatars: db.list::<Avatar>().into_inner(),
    }
}

fn reload_into(db: &Db, state: &Rc<RefCell<ViewState>>) {
    let loaded = load_snapshot(db);

    let changed = {
        let mut current = state.borrow_mut();
        if current.snapshot == loaded {
            false
        } else {
            current.snapshot = loaded;
            current.version += 1;
            true
        }
    };

    if changed {
        // Clone out so the listener runs without a live borrow and may
        // read the view it belongs to.
        let (snapshot, listener) = {
            let current = state.borrow();
            (current.snapshot.clone(), current.listener.clone())
        };
        if let Some(listener) = listener {
            listener(&snapshot);
        }
    }
}
