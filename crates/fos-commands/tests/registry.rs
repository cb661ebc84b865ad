//! Registration, queries, snapshots and attachment

mod common;

use common::{calls, fixture, recorder};
use fos_commands::{
    AddOptions, CommandDescriptor, CommandError, CommandMap, FindCommandsQuery,
    InvalidListenerReason, Listener, ListenerObject,
};
use fos_dom::EventTarget;
use serde_json::json;

fn names(descriptors: &[CommandDescriptor]) -> Vec<&str> {
    descriptors.iter().map(|d| d.name.as_str()).collect()
}

fn noop() -> Listener {
    Listener::callback(|_event| ())
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_null_listener_is_rejected() {
    let f = fixture();
    let err = f.registry.add(".child", "command", None::<Listener>).unwrap_err();
    assert_eq!(err, CommandError::InvalidListener(InvalidListenerReason::NullListener));
    assert!(f.registry.registered_command_names().is_empty());
}

#[test]
fn test_object_without_callback_is_rejected() {
    let f = fixture();
    let listener = Listener::from(ListenerObject::new());
    let err = f.registry.add(f.child, "command", listener).unwrap_err();
    assert_eq!(err, CommandError::InvalidListener(InvalidListenerReason::MissingDidDispatch));
    assert!(err.to_string().contains("didDispatch"));
}

#[test]
fn test_invalid_selector_is_rejected() {
    let f = fixture();
    let err = f.registry.add("<>", "command", noop()).unwrap_err();
    assert!(matches!(&err, CommandError::InvalidSelector { selector, .. } if selector == "<>"));
    assert_eq!(err.to_string(), "'<>' is not a valid selector");
    assert!(f.registry.registered_command_names().is_empty());
    assert_eq!(f.doc.listener_count(f.parent.into(), "command"), 0);
}

#[test]
fn test_invalid_selector_accepted_without_validation() {
    let f = fixture();
    let calls = calls();
    let options = AddOptions {
        validate_selector: false,
    };
    f.registry
        .add_with_options("a, b", "command", recorder(&calls, "never"), options)
        .unwrap();

    assert_eq!(f.registry.registered_command_names(), vec!["command"]);
    assert!(f.registry.dispatch(f.grandchild, "command", None).is_none());
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_valid_selectors_register() {
    let f = fixture();
    for selector in [
        "button:hover",
        "a:active",
        "li:nth-child(2)",
        "input:disabled",
        "p:first-of-type",
        "div::before",
        "[title=\"a~=b\"]",
        ":is([title=\"a,b\"], .child)",
    ] {
        assert!(f.registry.add(selector, "command", noop()).is_ok(), "{}", selector);
    }
}

#[test]
fn test_state_pseudo_class_registers_without_matching() {
    let f = fixture();
    let calls = calls();
    f.registry.add(".grandchild:hover", "command", recorder(&calls, "hover")).unwrap();

    assert_eq!(f.registry.registered_command_names(), vec!["command"]);
    assert!(f.registry.dispatch(f.grandchild, "command", None).is_none());
    assert!(calls.borrow().is_empty());
}

// ============================================================================
// Disposal
// ============================================================================

#[test]
fn test_dispose_twice_is_harmless() {
    let f = fixture();
    let calls = calls();
    let first = f.registry.add(".child", "command", recorder(&calls, "first")).unwrap();
    f.registry.add(".child", "command", recorder(&calls, "second")).unwrap();

    first.dispose();
    first.dispose();

    f.registry.dispatch(f.grandchild, "command", None);
    assert_eq!(*calls.borrow(), vec!["second"]);
}

#[test]
fn test_inline_dispose_twice_is_harmless() {
    let f = fixture();
    let calls = calls();
    let first = f.registry.add(f.child, "command", recorder(&calls, "first")).unwrap();
    f.registry.add(f.child, "command", recorder(&calls, "second")).unwrap();

    first.dispose();
    first.dispose();

    f.registry.dispatch(f.child, "command", None);
    assert_eq!(*calls.borrow(), vec!["second"]);
}

// ============================================================================
// Batch registration
// ============================================================================

#[test]
fn test_add_commands() {
    let f = fixture();
    let calls = calls();
    let disposable = f
        .registry
        .add_commands(
            ".child",
            CommandMap::new()
                .with("namespace:one", recorder(&calls, "one"))
                .with("namespace:two", recorder(&calls, "two")),
        )
        .unwrap();
    assert_eq!(disposable.len(), 2);

    f.registry.dispatch(f.grandchild, "namespace:two", None);
    assert_eq!(*calls.borrow(), vec!["two"]);

    disposable.dispose();
    assert!(f.registry.registered_command_names().is_empty());
}

#[test]
fn test_add_commands_rolls_back_on_failure() {
    let f = fixture();
    let result = f.registry.add_commands(
        f.child,
        CommandMap::new()
            .with("namespace:one", noop())
            .with("namespace:two", None::<Listener>)
            .with("namespace:three", noop()),
    );

    assert!(matches!(result, Err(CommandError::InvalidListener(_))));
    assert!(f.registry.registered_command_names().is_empty());
}

// ============================================================================
// find_commands
// ============================================================================

#[test]
fn test_find_commands_order_and_dedup() {
    let f = fixture();
    f.registry.add(".parent", "namespace:command-1", noop()).unwrap();
    f.registry.add(".child", "namespace:command-2", noop()).unwrap();
    f.registry.add(".grandchild", "namespace:command-3", noop()).unwrap();
    f.registry.add(".grandchild", "namespace:command-2", noop()).unwrap();
    f.registry.add(f.grandchild, "namespace:inline-1", noop()).unwrap();
    f.registry.add(f.child, "namespace:inline-2", noop()).unwrap();
    f.registry.add(f.child, "namespace:inline-1", noop()).unwrap();

    let commands = f.registry.find_commands(FindCommandsQuery::new(f.grandchild));
    assert_eq!(
        names(&commands),
        vec![
            "namespace:inline-1",
            "namespace:command-2",
            "namespace:command-3",
            "namespace:inline-2",
            "namespace:command-1",
        ]
    );
}

#[test]
fn test_find_commands_descriptors() {
    let f = fixture();
    f.registry
        .add(f.grandchild, "namespace:inline-command-1", noop())
        .unwrap();
    f.registry
        .add(
            ".grandchild",
            "namespace:command-2",
            noop()
                .display_name("Custom Command 2")
                .with_extra("metadata", json!({"some": "other", "object": "data"})),
        )
        .unwrap();
    f.registry
        .add(
            ".grandchild",
            "namespace:command-3",
            noop()
                .display_name("Custom Command 3")
                .description("Does the third thing")
                .with_extra("name", json!("some:other:incorrect:commandname")),
        )
        .unwrap();

    let commands = f.registry.find_commands(FindCommandsQuery::new(f.grandchild));
    assert_eq!(
        commands,
        vec![
            CommandDescriptor::new("namespace:inline-command-1"),
            CommandDescriptor::new("namespace:command-2")
                .with_display_name("Custom Command 2")
                .with_extra("metadata", json!({"some": "other", "object": "data"})),
            CommandDescriptor {
                description: Some("Does the third thing".to_string()),
                ..CommandDescriptor::new("namespace:command-3").with_display_name("Custom Command 3")
            },
        ]
    );
    assert_eq!(commands[0].display_name, "Namespace: Inline Command 1");
}

#[test]
fn test_find_commands_from_window() {
    let f = fixture();
    f.registry.add(".child", "namespace:child", noop()).unwrap();
    f.registry.add(EventTarget::Window, "namespace:global", noop()).unwrap();

    let commands = f.registry.find_commands(FindCommandsQuery::new(EventTarget::Window));
    assert_eq!(names(&commands), vec!["namespace:global"]);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_restore_snapshot_drops_later_selector_listeners() {
    let f = fixture();
    f.registry.add(".grandchild", "namespace:existing", noop()).unwrap();
    let snapshot = f.registry.get_snapshot();

    f.registry.add(".grandchild", "namespace:added-later", noop()).unwrap();
    f.registry.add(f.grandchild, "namespace:inline", noop()).unwrap();
    f.registry.restore_snapshot(&snapshot);

    let commands = f.registry.find_commands(FindCommandsQuery::new(f.grandchild));
    assert_eq!(names(&commands), vec!["namespace:inline", "namespace:existing"]);
}

#[test]
fn test_restored_listener_can_be_disposed() {
    let f = fixture();
    let disposable = f.registry.add(".grandchild", "namespace:existing", noop()).unwrap();
    let snapshot = f.registry.get_snapshot();
    f.registry.clear();
    f.registry.restore_snapshot(&snapshot);
    assert_eq!(f.registry.registered_command_names(), vec!["namespace:existing"]);

    disposable.dispose();
    assert!(f.registry.registered_command_names().is_empty());
}

#[test]
fn test_snapshot_reports_selectors() {
    let f = fixture();
    f.registry.add(".child", "namespace:a", noop()).unwrap();
    f.registry.add(".grandchild", "namespace:a", noop()).unwrap();
    f.registry.add(".parent", "namespace:b", noop()).unwrap();

    let snapshot = f.registry.get_snapshot();
    assert_eq!(snapshot.selectors("namespace:a"), vec![".child", ".grandchild"]);
    assert!(snapshot.selectors("namespace:missing").is_empty());

    let debug = format!("{:?}", snapshot);
    assert!(debug.contains("\".grandchild\""));
    assert!(debug.contains("namespace:b"));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_clear_drops_all_registrations() {
    let f = fixture();
    f.registry.add(".child", "namespace:selector", noop()).unwrap();
    f.registry.add(f.child, "namespace:inline", noop()).unwrap();

    f.registry.clear();
    assert!(f.registry.registered_command_names().is_empty());
    assert!(f.registry.dispatch(f.grandchild, "namespace:selector", None).is_none());
    assert!(f.registry.is_attached());
}

#[test]
fn test_release_element() {
    let f = fixture();
    f.registry.add(f.child, "namespace:inline", noop()).unwrap();
    f.registry.add(f.parent, "namespace:inline", noop()).unwrap();

    f.registry.release_element(f.child);
    let commands = f.registry.find_commands(FindCommandsQuery::new(f.grandchild));
    assert_eq!(names(&commands), vec!["namespace:inline"]);
    assert!(f.registry.dispatch(f.child, "namespace:inline", None).is_some());

    f.registry.release_element(f.parent);
    assert!(f.registry.registered_command_names().is_empty());
}

#[test]
fn test_attach_installs_each_command_once() {
    let f = fixture();
    f.registry.destroy();
    f.registry.add(".child", "namespace:one", noop()).unwrap();
    f.registry.add(f.child, "namespace:two", noop()).unwrap();
    assert_eq!(f.doc.listener_count(f.parent.into(), "namespace:one"), 0);

    f.registry.attach(f.parent);
    f.registry.add(".parent", "namespace:one", noop()).unwrap();
    f.registry.add(".parent", "namespace:three", noop()).unwrap();
    assert_eq!(f.registry.root(), Some(EventTarget::Node(f.parent)));
    for name in ["namespace:one", "namespace:two", "namespace:three"] {
        assert_eq!(f.doc.listener_count(f.parent.into(), name), 1);
    }
}

#[test]
fn test_attach_is_additive_until_destroy() {
    let f = fixture();
    f.registry.add(".child", "command", noop()).unwrap();
    f.registry.attach(EventTarget::Window);

    assert_eq!(f.doc.listener_count(f.parent.into(), "command"), 1);
    assert_eq!(f.doc.listener_count(EventTarget::Window, "command"), 1);

    f.registry.destroy();
    assert_eq!(f.doc.listener_count(f.parent.into(), "command"), 0);
    assert_eq!(f.doc.listener_count(EventTarget::Window, "command"), 0);
}
