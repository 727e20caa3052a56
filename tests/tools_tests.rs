use std::time::Duration;

use page_context::tools::{PageSession, tool_definitions};
use serde_json::json;

use crate::common::utils::{doc, page};

mod common;

fn session() -> PageSession {
    PageSession::new(page("login.html"))
}

// =========================================================================
// Catalog
// =========================================================================

#[test]
fn catalog_lists_every_tool_with_object_schema() {
    let tools = tool_definitions();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

    for expected in [
        "scan", "click", "type", "select", "check", "uncheck", "submit", "scroll", "focus", "hover",
        "wait_for", "screenshot", "get_state", "get_context", "get_element", "execute_batch",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }
    for tool in &tools {
        assert_eq!(tool.input_schema["type"], "object", "{} schema", tool.name);
        assert!(!tool.description.is_empty());
    }
}

#[test]
fn every_catalog_tool_is_dispatched() {
    let mut session = session();
    for tool in tool_definitions() {
        let response = session.call_tool(&tool.name, json!({}));
        let error = response.error.unwrap_or_default();
        assert!(!error.starts_with("unknown tool"), "{} is not dispatched", tool.name);
    }
}

// =========================================================================
// Dispatch
// =========================================================================

#[test]
fn unknown_and_unsupported_tools_fail() {
    let mut session = session();

    let unknown = session.call_tool("teleport", json!({}));
    assert!(!unknown.success);
    assert_eq!(unknown.error.as_deref(), Some("unknown tool 'teleport'"));

    let screenshot = session.call_tool("screenshot", json!({}));
    assert!(!screenshot.success);
    assert!(screenshot.error.unwrap().contains("not supported"));
}

#[test]
fn scan_and_context_tools() {
    let mut session = session();

    let scanned = session.call_tool("scan", json!({ "includeHidden": true, "excludeSelectors": "nav" }));
    assert!(scanned.success, "{:?}", scanned.error);
    let data = scanned.data.unwrap();
    let selectors: Vec<&str> = data["elements"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["selector"].as_str())
        .collect();
    assert!(selectors.contains(&"div.banner"), "includeHidden honored");
    assert!(!selectors.contains(&"#top"), "excludeSelectors honored");

    let context = session.call_tool("get_context", json!({}));
    assert_eq!(context.data.unwrap()["id"], data["id"], "Context is the last scan");

    let natural = session.call_tool("get_context", json!({ "format": "natural" }));
    assert!(natural.data.unwrap().as_str().unwrap().starts_with("Page: Sign in"));

    let bad = session.call_tool("get_context", json!({ "format": "yaml" }));
    assert!(!bad.success);

    let bad_scan = session.call_tool("scan", json!({ "depth": "deep" }));
    assert!(bad_scan.error.unwrap().starts_with("invalid scan options"));
}

#[test]
fn action_tools_drive_the_executor() {
    let mut session = session();

    let typed = session.call_tool("type", json!({ "selector": "#email", "text": "ada@example.com" }));
    assert!(typed.success, "{:?}", typed.error);
    assert_eq!(typed.data.unwrap()["message"], "set value of #email");

    let checked = session.call_tool("check", json!({ "selector": "#remember" }));
    assert!(checked.success);

    let selected = session.call_tool("select", json!({ "selector": "#country", "value": "us" }));
    assert!(selected.success);

    let submitted = session.call_tool("submit", json!({ "selector": "#login" }));
    assert!(submitted.success);

    let state = session.call_tool("get_state", json!({})).data.unwrap();
    assert_eq!(state["title"], "Sign in");
    assert_eq!(state["submissions"], json!(["#login"]));

    let missing_text = session.call_tool("type", json!({ "selector": "#email" }));
    assert_eq!(missing_text.error.as_deref(), Some("missing argument 'text'"));

    let missing_selector = session.call_tool("click", json!({}));
    assert_eq!(missing_selector.error.as_deref(), Some("missing argument 'selector'"));

    let disabled = session.call_tool("click", json!({ "selector": "#unavailable" }));
    assert!(!disabled.success);
    assert!(disabled.error.unwrap().contains("is disabled"));
}

#[test]
fn get_element_describes_hidden_elements_too() {
    let mut session = session();

    let banner = session.call_tool("get_element", json!({ "selector": ".banner" }));
    assert!(banner.success);
    let data = banner.data.unwrap();
    assert_eq!(data["selector"], "div.banner");
    assert_eq!(data["visible"], false);

    let missing = session.call_tool("get_element", json!({ "selector": "#ghost" }));
    assert!(missing.error.unwrap().starts_with("element not found"));
}

#[test]
fn wait_for_polls_virtual_clock() {
    let mut document = doc(r#"<div id="app"></div>"#);
    document.set_timeout(Duration::from_millis(250), |doc| {
        let app = doc.get_element_by_id("app").unwrap();
        let toast = doc.create_element("div");
        doc.set_attribute(toast, "id", "toast").unwrap();
        doc.append_child(app, toast).unwrap();
    });
    let mut session = PageSession::new(document);

    let early = session.call_tool("wait_for", json!({ "selector": "#toast", "timeout": 200 }));
    assert!(!early.success);
    assert_eq!(early.error.as_deref(), Some("timed out after 200ms waiting for '#toast'"));

    let found = session.call_tool("wait_for", json!({ "selector": "#toast" }));
    assert!(found.success, "{:?}", found.error);
    let data = found.data.unwrap();
    assert_eq!(data["selector"], "#toast");
    assert_eq!(data["waitedMs"], 100);
}

#[test]
fn wait_for_visible_requires_rendering() {
    let mut session = PageSession::new(doc(r#"<p id="msg" hidden>Saved</p>"#));

    let present = session.call_tool("wait_for", json!({ "selector": "#msg", "timeout": 0 }));
    assert!(present.success, "Present is enough without visible");

    let visible = session.call_tool("wait_for", json!({ "selector": "#msg", "timeout": 300, "visible": true }));
    assert!(!visible.success);
}

#[test]
fn execute_batch_reports_progress() {
    let mut session = session();

    let response = session.call_tool(
        "execute_batch",
        json!({
            "commands": [
                { "action": "check", "target": "#remember" },
                { "action": "click", "target": "#missing" },
                { "action": "focus", "target": "#email" }
            ]
        }),
    );

    assert!(!response.success);
    assert!(response.error.unwrap().contains("not found"));
    let data = response.data.unwrap();
    assert_eq!(data["completed"], 2);
    assert_eq!(data["total"], 3);
    assert_eq!(data["results"][0]["success"], true);

    let malformed = session.call_tool("execute_batch", json!({ "commands": [{ "target": "#x" }] }));
    assert!(malformed.error.unwrap().starts_with("command 0: invalid command"));
}
