use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use page_context::dom::{Document, Event, MutationKind, NodeId};

use crate::common::utils::{doc, node, page};

mod common;

// =========================================================================
// HTML loading
// =========================================================================

#[test]
fn parse_html_builds_tree_with_title_and_body() {
    let doc = page("login.html");

    assert_eq!(doc.title(), "Sign in", "Title from <title>");
    assert!(doc.url().starts_with("file://"), "URL set from the fixture path");
    assert!(doc.body().is_some(), "Body present");

    let email = node(&doc, "#email");
    assert_eq!(doc.tag_name(email), Some("input"));
    assert_eq!(doc.input_type(email).as_deref(), Some("email"));
    assert_eq!(doc.value(email).as_deref(), Some(""), "Empty value by default");
}

#[test]
fn parse_html_initial_checked_and_selected_state() {
    let doc = doc(r#"
        <input type="checkbox" id="a" checked>
        <select id="s"><option value="x">X</option><option value="y" selected>Y</option></select>
    "#);

    assert!(doc.checked(node(&doc, "#a")), "checked attribute seeds state");
    assert_eq!(doc.value(node(&doc, "#s")).as_deref(), Some("y"), "selected option wins");
}

// =========================================================================
// Events
// =========================================================================

#[test]
fn events_bubble_to_ancestors_in_order() {
    let mut doc = doc(r#"<form id="f"><input id="i"></form>"#);
    let input = node(&doc, "#i");
    let form = node(&doc, "#f");
    let body = doc.body().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for (target, name) in [(input, "input"), (form, "form"), (body, "body")] {
        let seen = Rc::clone(&seen);
        doc.add_event_listener(target, "input", move |_, _| seen.borrow_mut().push(name));
    }

    doc.dispatch_event(input, Event::bubbling("input"));
    assert_eq!(*seen.borrow(), vec!["input", "form", "body"]);

    seen.borrow_mut().clear();
    doc.dispatch_event(input, Event::new("input"));
    assert_eq!(*seen.borrow(), vec!["input"], "Non-bubbling event stays on target");
}

#[test]
fn click_toggles_checkbox_and_prevent_default_reverts() {
    let mut doc = doc(r#"<input type="checkbox" id="c">"#);
    let checkbox = node(&doc, "#c");

    doc.click(checkbox);
    assert!(doc.checked(checkbox), "Click checks");

    doc.add_event_listener(checkbox, "click", |_, event| event.prevent_default());
    doc.click(checkbox);
    assert!(doc.checked(checkbox), "Prevented click leaves state unchanged");
}

#[test]
fn click_submit_button_submits_owner_form() {
    let mut doc = doc(r#"<form id="f"><button id="b">Go</button></form>"#);
    let form = node(&doc, "#f");

    doc.click(node(&doc, "#b"));
    assert_eq!(doc.submissions(), &[form], "Button without type submits");

    doc.add_event_listener(form, "submit", |_, event| event.prevent_default());
    doc.click(node(&doc, "#b"));
    assert_eq!(doc.submissions().len(), 1, "Prevented submit does not submit");
}

#[test]
fn click_link_records_navigation_and_disabled_ignores_click() {
    let mut doc = doc(r#"<a id="l" href="/next">Next</a><button id="d" disabled>D</button>"#);
    let clicks = Rc::new(RefCell::new(0));
    let disabled = node(&doc, "#d");
    {
        let clicks = Rc::clone(&clicks);
        doc.add_event_listener(disabled, "click", move |_, _| *clicks.borrow_mut() += 1);
    }

    doc.click(node(&doc, "#l"));
    doc.click(disabled);

    assert_eq!(doc.navigations(), &["/next".to_string()]);
    assert_eq!(*clicks.borrow(), 0, "Disabled controls ignore click()");
}

// =========================================================================
// Value setters
// =========================================================================

#[test]
fn native_setter_bypasses_instance_interceptor() {
    let mut doc = doc(r#"<input id="i">"#);
    let input = node(&doc, "#i");
    let intercepted = Rc::new(RefCell::new(Vec::new()));
    {
        let intercepted = Rc::clone(&intercepted);
        doc.intercept_value(
            input,
            Rc::new(move |_: &mut Document, _: NodeId, value: &str| intercepted.borrow_mut().push(value.to_string())),
        );
    }

    doc.assign_value(input, "through interceptor").unwrap();
    assert_eq!(doc.value(input).as_deref(), Some(""), "Interceptor swallowed the assignment");
    assert_eq!(*intercepted.borrow(), vec!["through interceptor"]);

    doc.set_value_native(input, "native").unwrap();
    assert_eq!(doc.value(input).as_deref(), Some("native"));
    assert_eq!(intercepted.borrow().len(), 1, "Native setter skips interceptor");
}

#[test]
fn radio_group_is_exclusive() {
    let mut doc = doc(r#"
        <input type="radio" name="size" id="s" value="s">
        <input type="radio" name="size" id="m" value="m" checked>
    "#);
    let small = node(&doc, "#s");
    let medium = node(&doc, "#m");

    doc.set_checked(small, true).unwrap();
    assert!(doc.checked(small));
    assert!(!doc.checked(medium), "Checking one radio unchecks the group");
}

// =========================================================================
// Virtual clock
// =========================================================================

#[test]
fn timers_run_in_due_order_and_microtasks_first() {
    let mut doc = Document::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    for (delay, name) in [(30, "late"), (10, "early")] {
        let log = Rc::clone(&log);
        doc.set_timeout(Duration::from_millis(delay), move |_| log.borrow_mut().push(name));
    }
    let cancelled = {
        let log = Rc::clone(&log);
        doc.set_timeout(Duration::from_millis(20), move |_| log.borrow_mut().push("cancelled"))
    };
    {
        let log = Rc::clone(&log);
        doc.queue_microtask(move |_| log.borrow_mut().push("micro"));
    }

    assert!(doc.clear_timeout(cancelled));
    assert_eq!(doc.pending_timers(), 2);
    assert_eq!(doc.next_timer_due(), Some(Duration::from_millis(10)));

    doc.advance(Duration::from_millis(15));
    assert_eq!(*log.borrow(), vec!["micro", "early"]);
    assert_eq!(doc.now(), Duration::from_millis(15), "Clock parks at the target");

    doc.advance(Duration::from_millis(100));
    assert_eq!(*log.borrow(), vec!["micro", "early", "late"]);
    assert!(!doc.clear_timeout(cancelled), "Already cleared");
}

#[test]
fn animation_frame_moves_clock_to_frame_boundary() {
    let mut doc = Document::new();
    let ran = Rc::new(RefCell::new(false));
    {
        let ran = Rc::clone(&ran);
        doc.request_animation_frame(move |_| *ran.borrow_mut() = true);
    }

    doc.run_animation_frame();
    assert!(*ran.borrow());
    assert_eq!(doc.now(), Duration::from_millis(16));
}

// =========================================================================
// Mutation observers
// =========================================================================

#[test]
fn observer_records_subtree_mutations_until_disconnected() {
    let mut doc = doc(r#"<div id="root"><span id="leaf">a</span></div>"#);
    let root = node(&doc, "#root");
    let leaf = node(&doc, "#leaf");
    let observer = doc.observe(root, true);

    doc.set_attribute(leaf, "class", "active").unwrap();
    let child = doc.create_element("em");
    doc.append_child(root, child).unwrap();

    let records = doc.take_records(observer);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].target, leaf);
    assert_eq!(records[0].kind, MutationKind::Attributes { name: "class".into() });
    assert_eq!(records[1].kind, MutationKind::ChildList);
    assert!(doc.take_records(observer).is_empty(), "Records are drained");

    doc.disconnect(observer);
    doc.set_attribute(leaf, "class", "idle").unwrap();
    assert!(doc.take_records(observer).is_empty(), "Disconnected observer sees nothing");
}

// =========================================================================
// Style and layout
// =========================================================================

#[test]
fn hidden_ancestor_hides_descendants() {
    let doc = doc(r#"
        <div style="display: none"><button id="inner">x</button></div>
        <button id="ghost" style="opacity: 0">y</button>
        <button id="shown">z</button>
    "#);

    let inner = node(&doc, "#inner");
    assert!(!doc.is_rendered(inner));
    assert!(doc.bounding_box(inner).is_empty(), "Non-rendered element has no box");

    let ghost = node(&doc, "#ghost");
    assert!(doc.is_rendered(ghost));
    assert!(!doc.computed_style(ghost).is_visible(), "Zero opacity is invisible");

    assert!(doc.computed_style(node(&doc, "#shown")).is_visible());
}
