//! Disposables
//!
//! Handles returned by registrations. Disposing runs the teardown once;
//! later calls are no-ops.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Runs a teardown action at most once
pub struct Disposable {
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Disposable {
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: RefCell::new(Some(Box::new(action))),
        }
    }

    /// A disposable with nothing to tear down
    pub fn empty() -> Self {
        Self {
            action: RefCell::new(None),
        }
    }

    pub fn dispose(&self) {
        let action = self.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.action.borrow().is_none()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Aggregates several disposables behind one `dispose`
#[derive(Default)]
pub struct CompositeDisposable {
    disposables: RefCell<Vec<Disposable>>,
    disposed: Cell<bool>,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disposable. Adding to an already disposed composite disposes
    /// the newcomer immediately.
    pub fn add(&self, disposable: Disposable) {
        if self.disposed.get() {
            disposable.dispose();
            return;
        }
        self.disposables.borrow_mut().push(disposable);
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
        let disposables = std::mem::take(&mut *self.disposables.borrow_mut());
        for disposable in disposables {
            disposable.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn len(&self) -> usize {
        self.disposables.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl From<CompositeDisposable> for Disposable {
    fn from(composite: CompositeDisposable) -> Self {
        Disposable::new(move || composite.dispose())
    }
}
