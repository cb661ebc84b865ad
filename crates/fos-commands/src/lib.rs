//! fOS Commands
//!
//! Command registry with DOM-style delegation:
//! - Listeners registered against CSS selectors or specific elements
//! - Bubbling dispatch from a target up to `Window`
//! - Specificity and recency ordering among competing listeners
//! - Aggregated asynchronous listener results
//! - Dispatch hooks, command queries and snapshots

mod descriptor;
mod disposable;
mod emitter;
mod error;
mod event;
mod listener;
mod registry;
mod tree;

pub use descriptor::{CommandDescriptor, humanize_command_name};
pub use disposable::{CompositeDisposable, Disposable};
pub use emitter::DispatchHook;
pub use error::{CommandError, InvalidListenerReason, ListenerError};
pub use event::CommandEvent;
pub use listener::{
    Callback, CommandMap, CommandMetadata, Completion, Listener, ListenerObject, ListenerResult,
};
pub use registry::{
    AddOptions, CommandRegistry, CommandSnapshot, CommandTarget, DispatchFuture, FindCommandsQuery,
};
pub use tree::{ElementTree, NativeListener};

pub use fos_dom::{Event, EventTarget, NodeId};
