//! Command Registry
//!
//! Selector-scoped and element-bound command listeners, dispatched by
//! walking from the target up to `Window`. At each node, listeners bound
//! to that element run first (newest first), then selector matches in
//! descending `(specificity, sequence number)` order.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use fos_css::{Selector, Specificity};
use fos_dom::{Event, EventTarget, NodeId};
use futures::future::{FutureExt, LocalBoxFuture, try_join_all};
use indexmap::IndexMap;
use serde_json::Value;
use smol::LocalExecutor;

use crate::descriptor::CommandDescriptor;
use crate::disposable::{CompositeDisposable, Disposable};
use crate::emitter::{Emitter, HookKind};
use crate::error::{CommandError, InvalidListenerReason, ListenerError};
use crate::event::CommandEvent;
use crate::listener::{Callback, CommandMap, Listener, ListenerResult};
use crate::tree::{ElementTree, NativeListener};

/// Registration options
#[derive(Debug, Clone, Copy)]
pub struct AddOptions {
    /// Reject selectors that fail to parse. When off, an invalid selector
    /// is kept with zero specificity and never matches.
    pub validate_selector: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            validate_selector: true,
        }
    }
}

/// Where a command is registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    /// Any element matching the selector
    Selector(String),
    /// One specific element
    Element(EventTarget),
}

impl From<&str> for CommandTarget {
    fn from(selector: &str) -> Self {
        CommandTarget::Selector(selector.to_string())
    }
}

impl From<String> for CommandTarget {
    fn from(selector: String) -> Self {
        CommandTarget::Selector(selector)
    }
}

impl From<NodeId> for CommandTarget {
    fn from(node: NodeId) -> Self {
        CommandTarget::Element(EventTarget::Node(node))
    }
}

impl From<EventTarget> for CommandTarget {
    fn from(target: EventTarget) -> Self {
        CommandTarget::Element(target)
    }
}

/// `find_commands` query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindCommandsQuery {
    pub target: EventTarget,
}

impl FindCommandsQuery {
    pub fn new(target: impl Into<EventTarget>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[derive(Clone)]
struct SelectorBasedListener {
    id: u64,
    selector: String,
    parsed: Option<Rc<Selector>>,
    callback: Callback,
    descriptor: Rc<CommandDescriptor>,
    specificity: Specificity,
    sequence_number: u64,
}

impl fmt::Debug for SelectorBasedListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorBasedListener")
            .field("selector", &self.selector)
            .field("evaluable", &self.parsed.as_ref().is_some_and(|s| s.is_evaluable()))
            .field("specificity", &self.specificity)
            .field("sequence_number", &self.sequence_number)
            .finish()
    }
}

impl SelectorBasedListener {
    fn sort_key(&self) -> (Specificity, u64) {
        (self.specificity, self.sequence_number)
    }

    fn matches_target(&self, tree: &dyn ElementTree, node: NodeId) -> bool {
        self.parsed
            .as_deref()
            .is_some_and(|selector| tree.matches(node, selector))
    }
}

#[derive(Clone)]
struct InlineListener {
    id: u64,
    callback: Callback,
    descriptor: Rc<CommandDescriptor>,
}

type SelectorTable = IndexMap<String, Vec<SelectorBasedListener>>;
type InlineTable = IndexMap<String, IndexMap<EventTarget, Vec<InlineListener>>>;

/// Saved selector-based registrations
#[derive(Clone)]
pub struct CommandSnapshot {
    selector_listeners: SelectorTable,
}

impl CommandSnapshot {
    /// Command names captured in the snapshot
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.selector_listeners.keys().map(String::as_str)
    }

    /// Selectors captured for `command_name`, in registration order
    pub fn selectors(&self, command_name: &str) -> Vec<&str> {
        self.selector_listeners
            .get(command_name)
            .map(|list| list.iter().map(|l| l.selector.as_str()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for CommandSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.selector_listeners.iter())
            .finish()
    }
}

/// Aggregate result of a dispatch. Resolves to every listener's value in
/// invocation order, or the first failure.
#[must_use = "listener results are only observed by awaiting the dispatch"]
pub struct DispatchFuture {
    listener_count: usize,
    inner: LocalBoxFuture<'static, Result<Vec<Value>, ListenerError>>,
}

impl DispatchFuture {
    fn new(results: Vec<LocalBoxFuture<'static, ListenerResult>>) -> Self {
        Self {
            listener_count: results.len(),
            inner: try_join_all(results).boxed_local(),
        }
    }

    /// Number of listeners that ran
    pub fn listener_count(&self) -> usize {
        self.listener_count
    }
}

impl Future for DispatchFuture {
    type Output = Result<Vec<Value>, ListenerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for DispatchFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFuture")
            .field("listener_count", &self.listener_count)
            .finish()
    }
}

struct RegistryState {
    tree: Rc<dyn ElementTree>,
    root: Cell<Option<EventTarget>>,
    selector_listeners: RefCell<SelectorTable>,
    inline_listeners: RefCell<InlineTable>,
    /// Native listeners installed, by root and command name
    installed: RefCell<IndexMap<(EventTarget, String), NativeListener>>,
    emitter: RefCell<Rc<Emitter>>,
    next_sequence: Cell<u64>,
    next_id: Cell<u64>,
    executor: RefCell<Rc<LocalExecutor<'static>>>,
}

/// Command registry handle. Clones share the same tables.
#[derive(Clone)]
pub struct CommandRegistry {
    state: Rc<RegistryState>,
}

impl CommandRegistry {
    pub fn new(tree: Rc<dyn ElementTree>) -> Self {
        Self {
            state: Rc::new(RegistryState {
                tree,
                root: Cell::new(None),
                selector_listeners: RefCell::new(IndexMap::new()),
                inline_listeners: RefCell::new(IndexMap::new()),
                installed: RefCell::new(IndexMap::new()),
                emitter: RefCell::new(Emitter::new()),
                next_sequence: Cell::new(0),
                next_id: Cell::new(0),
                executor: RefCell::new(Rc::new(LocalExecutor::new())),
            }),
        }
    }

    fn downgrade(&self) -> Weak<RegistryState> {
        Rc::downgrade(&self.state)
    }

    fn upgrade(state: &Weak<RegistryState>) -> Option<Self> {
        state.upgrade().map(|state| Self { state })
    }

    fn next_id(&self) -> u64 {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        id
    }

    /// Executor that drives dispatches arriving through native events.
    /// Each registry starts with its own; results still pending after a
    /// native dispatch settle when the host runs it.
    pub fn executor(&self) -> Rc<LocalExecutor<'static>> {
        self.state.executor.borrow().clone()
    }

    /// Drive native-path dispatches on the host's executor instead
    pub fn set_executor(&self, executor: Rc<LocalExecutor<'static>>) {
        *self.state.executor.borrow_mut() = executor;
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `listener` for `command_name` on a selector or an element
    pub fn add(
        &self,
        target: impl Into<CommandTarget>,
        command_name: &str,
        listener: impl Into<Option<Listener>>,
    ) -> Result<Disposable, CommandError> {
        self.add_with_options(target, command_name, listener, AddOptions::default())
    }

    pub fn add_with_options(
        &self,
        target: impl Into<CommandTarget>,
        command_name: &str,
        listener: impl Into<Option<Listener>>,
        options: AddOptions,
    ) -> Result<Disposable, CommandError> {
        let listener = listener.into().ok_or(InvalidListenerReason::NullListener)?;
        let (callback, metadata) = listener.into_parts()?;
        let descriptor = Rc::new(CommandDescriptor::extract(command_name, Some(&metadata)));

        match target.into() {
            CommandTarget::Selector(selector) => {
                self.add_selector_based(selector, command_name, callback, descriptor, options)
            }
            CommandTarget::Element(element) => {
                Ok(self.add_inline(element, command_name, callback, descriptor))
            }
        }
    }

    /// Register several commands on one target. If any entry fails, the
    /// entries already registered by this call are disposed.
    pub fn add_commands(
        &self,
        target: impl Into<CommandTarget>,
        commands: CommandMap,
    ) -> Result<CompositeDisposable, CommandError> {
        self.add_commands_with_options(target, commands, AddOptions::default())
    }

    pub fn add_commands_with_options(
        &self,
        target: impl Into<CommandTarget>,
        commands: CommandMap,
        options: AddOptions,
    ) -> Result<CompositeDisposable, CommandError> {
        let target = target.into();
        let disposables = CompositeDisposable::new();
        for (command_name, listener) in commands {
            match self.add_with_options(target.clone(), &command_name, listener, options) {
                Ok(disposable) => disposables.add(disposable),
                Err(err) => {
                    disposables.dispose();
                    return Err(err);
                }
            }
        }
        Ok(disposables)
    }

    fn add_selector_based(
        &self,
        selector: String,
        command_name: &str,
        callback: Callback,
        descriptor: Rc<CommandDescriptor>,
        options: AddOptions,
    ) -> Result<Disposable, CommandError> {
        let parsed = match fos_css::parse_selector(&selector) {
            Ok(parsed) => {
                if !parsed.is_evaluable() {
                    tracing::debug!("{} on '{}' can never match", command_name, selector);
                }
                Some(Rc::new(parsed))
            }
            Err(source) if options.validate_selector => {
                return Err(CommandError::InvalidSelector { selector, source });
            }
            Err(err) => {
                tracing::warn!(
                    "Registering {} with unusable selector '{}': {}",
                    command_name,
                    selector,
                    err
                );
                None
            }
        };

        let id = self.next_id();
        let sequence_number = self.state.next_sequence.get();
        self.state.next_sequence.set(sequence_number + 1);

        self.state
            .selector_listeners
            .borrow_mut()
            .entry(command_name.to_string())
            .or_default()
            .push(SelectorBasedListener {
                id,
                specificity: parsed.as_ref().map_or(Specificity::ZERO, |s| s.specificity),
                selector,
                parsed,
                callback,
                descriptor,
                sequence_number,
            });
        self.command_registered(command_name);

        let state = self.downgrade();
        let command_name = command_name.to_string();
        Ok(Disposable::new(move || {
            if let Some(registry) = Self::upgrade(&state) {
                registry.remove_selector_based(&command_name, id);
            }
        }))
    }

    fn remove_selector_based(&self, command_name: &str, id: u64) {
        let mut table = self.state.selector_listeners.borrow_mut();
        let Some(list) = table.get_mut(command_name) else {
            return;
        };
        list.retain(|listener| listener.id != id);
        if list.is_empty() {
            table.shift_remove(command_name);
        }
    }

    fn add_inline(
        &self,
        element: EventTarget,
        command_name: &str,
        callback: Callback,
        descriptor: Rc<CommandDescriptor>,
    ) -> Disposable {
        self.sweep_released_elements();

        let id = self.next_id();
        self.state
            .inline_listeners
            .borrow_mut()
            .entry(command_name.to_string())
            .or_default()
            .entry(element)
            .or_default()
            .push(InlineListener {
                id,
                callback,
                descriptor,
            });
        self.command_registered(command_name);

        let state = self.downgrade();
        let command_name = command_name.to_string();
        Disposable::new(move || {
            if let Some(registry) = Self::upgrade(&state) {
                registry.remove_inline(&command_name, element, id);
            }
        })
    }

    fn remove_inline(&self, command_name: &str, element: EventTarget, id: u64) {
        let mut table = self.state.inline_listeners.borrow_mut();
        let Some(by_element) = table.get_mut(command_name) else {
            return;
        };
        if let Some(list) = by_element.get_mut(&element) {
            list.retain(|listener| listener.id != id);
            if list.is_empty() {
                by_element.shift_remove(&element);
            }
        }
        if by_element.is_empty() {
            table.shift_remove(command_name);
        }
    }

    /// Drop every listener bound to `element`. Call when the host tears
    /// the element down.
    pub fn release_element(&self, element: impl Into<EventTarget>) {
        let element = element.into();
        let mut table = self.state.inline_listeners.borrow_mut();
        for by_element in table.values_mut() {
            by_element.shift_remove(&element);
        }
        table.retain(|_, by_element| !by_element.is_empty());
    }

    /// Drop listeners bound to elements the tree no longer holds
    fn sweep_released_elements(&self) {
        let tree = &self.state.tree;
        let mut table = self.state.inline_listeners.borrow_mut();
        for by_element in table.values_mut() {
            by_element.retain(|element, _| tree.contains(*element));
        }
        table.retain(|_, by_element| !by_element.is_empty());
    }

    /// Command names with at least one registration, selector-based first
    pub fn registered_command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.selector_listeners.borrow().keys().cloned().collect();
        for name in self.state.inline_listeners.borrow().keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Drop every registration and hook subscription. Native listeners
    /// stay installed.
    pub fn clear(&self) {
        self.state.selector_listeners.borrow_mut().clear();
        self.state.inline_listeners.borrow_mut().clear();
        *self.state.emitter.borrow_mut() = Emitter::new();
        tracing::debug!("Cleared command registry");
    }

    // ========================================================================
    // Attachment
    // ========================================================================

    /// Bubble native command events arriving at `root` through the
    /// registry. Listeners installed on earlier roots stay until `destroy`.
    pub fn attach(&self, root: impl Into<EventTarget>) {
        let root = root.into();
        self.state.root.set(Some(root));
        for command_name in self.registered_command_names() {
            self.install_native_listener(root, &command_name);
        }
    }

    /// Remove every native listener this registry installed
    pub fn destroy(&self) {
        if self.state.root.get().is_none() {
            tracing::warn!("Destroying a command registry that was never attached");
        }
        let installed = std::mem::take(&mut *self.state.installed.borrow_mut());
        for ((root, command_name), listener) in installed {
            self.state
                .tree
                .remove_native_listener(root, &command_name, &listener);
            tracing::debug!("Removed native listener for {} from {:?}", command_name, root);
        }
        self.state.root.set(None);
    }

    pub fn is_attached(&self) -> bool {
        self.state.root.get().is_some()
    }

    pub fn root(&self) -> Option<EventTarget> {
        self.state.root.get()
    }

    fn command_registered(&self, command_name: &str) {
        if let Some(root) = self.state.root.get() {
            self.install_native_listener(root, command_name);
        }
    }

    fn install_native_listener(&self, root: EventTarget, command_name: &str) {
        let key = (root, command_name.to_string());
        if self.state.installed.borrow().contains_key(&key) {
            return;
        }

        let state = self.downgrade();
        let listener: NativeListener = Rc::new(move |event: &mut Event| {
            if let Some(registry) = Self::upgrade(&state) {
                if let Some(dispatch) = registry.handle_command_event(event) {
                    registry.spawn(dispatch);
                }
            }
        });
        self.state
            .tree
            .add_native_listener(root, command_name, listener.clone());
        self.state.installed.borrow_mut().insert(key, listener);
        tracing::debug!("Installed native listener for {} on {:?}", command_name, root);
    }

    fn spawn(&self, dispatch: DispatchFuture) {
        let executor = self.executor();
        let listener_count = dispatch.listener_count();
        let task = executor.spawn(async move {
            if let Err(err) = dispatch.await {
                tracing::warn!("Command listener failed: {}", err);
            }
        });

        // Settle whatever is already ready without waiting on the host
        while executor.try_tick() {}
        if !task.is_finished() {
            tracing::debug!(
                "Native dispatch to {} listeners still pending; it settles when the registry executor runs",
                listener_count
            );
        }
        task.detach();
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Run `callback` before any listener of each dispatch
    pub fn on_will_dispatch<F>(&self, callback: F) -> Disposable
    where
        F: Fn(&CommandEvent<'_>) + 'static,
    {
        let emitter = self.state.emitter.borrow().clone();
        emitter.on(HookKind::WillDispatch, Rc::new(callback))
    }

    /// Run `callback` after the walk of each dispatch ends
    pub fn on_did_dispatch<F>(&self, callback: F) -> Disposable
    where
        F: Fn(&CommandEvent<'_>) + 'static,
    {
        let emitter = self.state.emitter.borrow().clone();
        emitter.on(HookKind::DidDispatch, Rc::new(callback))
    }

    fn emit(&self, kind: HookKind, event: &CommandEvent<'_>) {
        let emitter = self.state.emitter.borrow().clone();
        emitter.emit(kind, event);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Commands available from `query.target`, nearest first, each name
    /// reported once
    pub fn find_commands(&self, query: FindCommandsQuery) -> Vec<CommandDescriptor> {
        let tree = &*self.state.tree;
        let mut seen = HashSet::new();
        let mut commands = Vec::new();
        let mut current = query.target;

        loop {
            for (command_name, by_element) in self.state.inline_listeners.borrow().iter() {
                let Some(listeners) = by_element.get(&current) else {
                    continue;
                };
                for listener in listeners {
                    if seen.insert(command_name.clone()) {
                        commands.push((*listener.descriptor).clone());
                    }
                }
            }

            if let Some(node) = current.node() {
                if tree.supports_selectors(current) {
                    for (command_name, listeners) in self.state.selector_listeners.borrow().iter() {
                        for listener in listeners {
                            if listener.matches_target(tree, node) && seen.insert(command_name.clone()) {
                                commands.push((*listener.descriptor).clone());
                            }
                        }
                    }
                }
            }

            if current.is_window() {
                break;
            }
            current = tree.parent_of(current);
        }

        commands
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Capture the selector-based registrations
    pub fn get_snapshot(&self) -> CommandSnapshot {
        CommandSnapshot {
            selector_listeners: self.state.selector_listeners.borrow().clone(),
        }
    }

    /// Replace the selector-based registrations with `snapshot`. Listeners
    /// bound to elements are kept.
    pub fn restore_snapshot(&self, snapshot: &CommandSnapshot) {
        *self.state.selector_listeners.borrow_mut() = snapshot.selector_listeners.clone();
        for command_name in snapshot.command_names() {
            self.command_registered(command_name);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch `command_name` from `target` as if a bubbling event had
    /// been fired there. Returns `None` when no listener ran.
    pub fn dispatch(
        &self,
        target: impl Into<EventTarget>,
        command_name: &str,
        detail: Option<Value>,
    ) -> Option<DispatchFuture> {
        let mut event = Event::custom(command_name, target.into(), detail);
        self.handle_command_event(&mut event)
    }

    /// Walk `event` from its target up to `Window`, invoking matching
    /// listeners. Propagation and default-prevention calls made by
    /// listeners are forwarded to `event`.
    pub fn handle_command_event(&self, event: &mut Event) -> Option<DispatchFuture> {
        let mut event = CommandEvent::wrap(event);
        let command_name = event.command_name().to_string();
        let mut results = Vec::new();

        self.emit(HookKind::WillDispatch, &event);

        let mut current = event.target();
        loop {
            event.set_current_target(current);
            let listeners = self.listeners_at(&command_name, current);

            for callback in listeners.iter().rev() {
                if event.is_immediate_propagation_stopped() {
                    break;
                }
                tracing::trace!("Invoking {} listener on {:?}", command_name, current);
                results.push(callback(&mut event).into_future());
            }

            if current.is_window() || event.is_propagation_stopped() {
                break;
            }
            current = self.state.tree.parent_of(current);
        }

        self.emit(HookKind::DidDispatch, &event);

        tracing::debug!("Dispatched {} to {} listeners", command_name, results.len());
        if results.is_empty() {
            None
        } else {
            Some(DispatchFuture::new(results))
        }
    }

    /// Listeners for one node in reverse invocation order: selector
    /// matches ascending, then element listeners oldest first
    fn listeners_at(&self, command_name: &str, current: EventTarget) -> Vec<Callback> {
        let tree = &*self.state.tree;
        let mut listeners = Vec::new();

        if let Some(node) = current.node() {
            if tree.supports_selectors(current) {
                let mut matching: Vec<SelectorBasedListener> = self
                    .state
                    .selector_listeners
                    .borrow()
                    .get(command_name)
                    .map(|list| {
                        list.iter()
                            .filter(|listener| listener.matches_target(tree, node))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                matching.sort_by_key(SelectorBasedListener::sort_key);
                listeners.extend(matching.into_iter().map(|listener| listener.callback));
            }
        }

        if let Some(inline) = self
            .state
            .inline_listeners
            .borrow()
            .get(command_name)
            .and_then(|by_element| by_element.get(&current))
        {
            listeners.extend(inline.iter().map(|listener| listener.callback.clone()));
        }

        listeners
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("root", &self.state.root.get())
            .field("commands", &self.registered_command_names())
            .field("installed", &self.state.installed.borrow().len())
            .finish()
    }
}
