//! Dispatch hooks
//!
//! `will-dispatch` runs before any listener, `did-dispatch` after the walk
//! ends. The registry swaps in a fresh emitter on `clear`, so old
//! subscriptions and their disposers go inert.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::disposable::Disposable;
use crate::event::CommandEvent;

/// Hook callback
pub type DispatchHook = Rc<dyn Fn(&CommandEvent<'_>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookKind {
    WillDispatch,
    DidDispatch,
}

#[derive(Default)]
pub(crate) struct Emitter {
    will_dispatch: RefCell<Vec<(u64, DispatchHook)>>,
    did_dispatch: RefCell<Vec<(u64, DispatchHook)>>,
    next_id: Cell<u64>,
}

impl Emitter {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn hooks(&self, kind: HookKind) -> &RefCell<Vec<(u64, DispatchHook)>> {
        match kind {
            HookKind::WillDispatch => &self.will_dispatch,
            HookKind::DidDispatch => &self.did_dispatch,
        }
    }

    pub(crate) fn on(self: &Rc<Self>, kind: HookKind, hook: DispatchHook) -> Disposable {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.hooks(kind).borrow_mut().push((id, hook));

        let emitter = Rc::downgrade(self);
        Disposable::new(move || {
            if let Some(emitter) = emitter.upgrade() {
                emitter.hooks(kind).borrow_mut().retain(|(hook_id, _)| *hook_id != id);
            }
        })
    }

    pub(crate) fn emit(&self, kind: HookKind, event: &CommandEvent<'_>) {
        // Copy out so hooks may subscribe or dispose while running
        let hooks: Vec<DispatchHook> = self
            .hooks(kind)
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();
        for hook in hooks {
            hook(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self, kind: HookKind) -> usize {
        self.hooks(kind).borrow().len()
    }
}
