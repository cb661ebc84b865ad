//! Listeners
//!
//! A listener is either a bare callback or an object carrying a
//! `did_dispatch` callback plus palette metadata. Callbacks report back
//! through a `Completion`, which is either settled already or still pending.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{InvalidListenerReason, ListenerError};
use crate::event::CommandEvent;

/// What a single listener settles to
pub type ListenerResult = Result<Value, ListenerError>;

/// Dispatch callback
pub type Callback = Rc<dyn Fn(&mut CommandEvent<'_>) -> Completion>;

/// A listener's return value
pub enum Completion {
    /// Settled during the call. `Err` is a synchronous failure.
    Ready(ListenerResult),
    /// Settles later
    Pending(LocalBoxFuture<'static, ListenerResult>),
}

impl Completion {
    /// Settled with `null`
    pub fn done() -> Self {
        Completion::Ready(Ok(Value::Null))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Completion::Ready(Ok(value.into()))
    }

    pub fn failed(err: impl Into<ListenerError>) -> Self {
        Completion::Ready(Err(err.into()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = ListenerResult> + 'static,
    {
        Completion::Pending(future.boxed_local())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending(_))
    }

    pub(crate) fn into_future(self) -> LocalBoxFuture<'static, ListenerResult> {
        match self {
            Completion::Ready(result) => future::ready(result).boxed_local(),
            Completion::Pending(future) => future,
        }
    }
}

impl From<()> for Completion {
    fn from(_: ()) -> Self {
        Completion::done()
    }
}

impl From<Value> for Completion {
    fn from(value: Value) -> Self {
        Completion::Ready(Ok(value))
    }
}

impl From<ListenerResult> for Completion {
    fn from(result: ListenerResult) -> Self {
        Completion::Ready(result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Palette metadata attached to a listener
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMetadata {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub hidden_in_command_palette: Option<bool>,
    pub tags: Option<Vec<String>>,
    /// Anything else, reported as-is by `find_commands`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Object-shaped listener. Metadata can be loaded from a command manifest;
/// the callback is attached in code.
#[derive(Clone, Default, Deserialize)]
pub struct ListenerObject {
    #[serde(skip)]
    pub did_dispatch: Option<Callback>,
    #[serde(flatten)]
    pub metadata: CommandMetadata,
}

impl ListenerObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn did_dispatch<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&mut CommandEvent<'_>) -> R + 'static,
        R: Into<Completion>,
    {
        self.did_dispatch = Some(wrap_callback(f));
        self
    }
}

impl fmt::Debug for ListenerObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerObject")
            .field("did_dispatch", &self.did_dispatch.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A command listener
#[derive(Clone)]
pub enum Listener {
    Callback(Callback),
    Object(ListenerObject),
}

fn wrap_callback<F, R>(f: F) -> Callback
where
    F: Fn(&mut CommandEvent<'_>) -> R + 'static,
    R: Into<Completion>,
{
    Rc::new(move |event: &mut CommandEvent<'_>| -> Completion { f(event).into() })
}

impl Listener {
    /// Listener from a closure returning anything convertible to a `Completion`
    pub fn callback<F, R>(f: F) -> Self
    where
        F: Fn(&mut CommandEvent<'_>) -> R + 'static,
        R: Into<Completion>,
    {
        Listener::Callback(wrap_callback(f))
    }

    pub fn display_name(self, display_name: &str) -> Self {
        self.with_metadata(|m| m.display_name = Some(display_name.to_string()))
    }

    pub fn description(self, description: &str) -> Self {
        self.with_metadata(|m| m.description = Some(description.to_string()))
    }

    pub fn hidden_in_command_palette(self, hidden: bool) -> Self {
        self.with_metadata(|m| m.hidden_in_command_palette = Some(hidden))
    }

    pub fn tags(self, tags: &[&str]) -> Self {
        self.with_metadata(|m| m.tags = Some(tags.iter().map(|t| t.to_string()).collect()))
    }

    pub fn with_extra(self, key: &str, value: Value) -> Self {
        self.with_metadata(|m| {
            m.extra.insert(key.to_string(), value);
        })
    }

    fn with_metadata(self, update: impl FnOnce(&mut CommandMetadata)) -> Self {
        let mut object = match self {
            Listener::Callback(callback) => ListenerObject {
                did_dispatch: Some(callback),
                metadata: CommandMetadata::default(),
            },
            Listener::Object(object) => object,
        };
        update(&mut object.metadata);
        Listener::Object(object)
    }

    /// Split into the callback to invoke and its metadata, rejecting
    /// objects without a callback
    pub(crate) fn into_parts(self) -> Result<(Callback, CommandMetadata), InvalidListenerReason> {
        match self {
            Listener::Callback(callback) => Ok((callback, CommandMetadata::default())),
            Listener::Object(ListenerObject {
                did_dispatch: Some(callback),
                metadata,
            }) => Ok((callback, metadata)),
            Listener::Object(_) => Err(InvalidListenerReason::MissingDidDispatch),
        }
    }
}

impl From<ListenerObject> for Listener {
    fn from(object: ListenerObject) -> Self {
        Listener::Object(object)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Callback(_) => f.write_str("Callback(..)"),
            Listener::Object(object) => f.debug_tuple("Object").field(object).finish(),
        }
    }
}

/// Command name to listener, in insertion order. A `None` entry is a null
/// listener and fails registration.
#[derive(Debug, Clone, Default)]
pub struct CommandMap(IndexMap<String, Option<Listener>>);

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command_name: &str, listener: impl Into<Option<Listener>>) -> Self {
        self.insert(command_name, listener);
        self
    }

    pub fn insert(&mut self, command_name: &str, listener: impl Into<Option<Listener>>) {
        self.0.insert(command_name.to_string(), listener.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl IntoIterator for CommandMap {
    type Item = (String, Option<Listener>);
    type IntoIter = indexmap::map::IntoIter<String, Option<Listener>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Listener)> for CommandMap {
    fn from_iter<I: IntoIterator<Item = (String, Listener)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, l)| (name, Some(l))).collect())
    }
}
