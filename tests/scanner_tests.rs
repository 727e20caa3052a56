use std::time::Duration;

use page_context::scan::{
    ElementType, ElementValue, PatternList, ScanConfig, ScanOutput, Scanner, StringList, classify,
};

use crate::common::utils::{doc, node, page};

mod common;

fn scan(doc: &page_context::dom::Document, config: &ScanConfig) -> ScanOutput {
    Scanner::new().scan(doc, config)
}

fn tags(output: &ScanOutput) -> Vec<&str> {
    output.elements.iter().map(|e| e.tag.as_str()).collect()
}

// =========================================================================
// Classification
// =========================================================================

#[test]
fn classify_native_tags_and_input_types() {
    let doc = doc(r#"
        <button id="b">Go</button>
        <a id="a" href="/">Home</a>
        <input id="t">
        <input id="s" type="submit">
        <input id="c" type="checkbox">
        <input id="r" type="radio">
        <textarea id="ta"></textarea>
        <select id="sel"><option>x</option></select>
        <form id="f"></form>
    "#);

    let cases = [
        ("#b", ElementType::Button),
        ("#a", ElementType::Link),
        ("#t", ElementType::Input),
        ("#s", ElementType::Button),
        ("#c", ElementType::Checkbox),
        ("#r", ElementType::Radio),
        ("#ta", ElementType::Textarea),
        ("#sel", ElementType::Select),
        ("#f", ElementType::Form),
    ];
    for (selector, expected) in cases {
        assert_eq!(classify(&doc, node(&doc, selector)), expected, "{selector}");
    }
}

#[test]
fn classify_roles_override_tags() {
    let doc = doc(r#"
        <div id="d" role="button">Fake button</div>
        <a id="a" role="checkbox" href="/">Toggle</a>
        <span id="s" role="combobox">Pick</span>
        <div id="e" contenteditable="true">Edit me</div>
        <div id="n" contenteditable="false">Read only</div>
    "#);

    assert_eq!(classify(&doc, node(&doc, "#d")), ElementType::Button);
    assert_eq!(classify(&doc, node(&doc, "#a")), ElementType::Checkbox);
    assert_eq!(classify(&doc, node(&doc, "#s")), ElementType::Select);
    assert_eq!(classify(&doc, node(&doc, "#e")), ElementType::Input, "contenteditable is an input");
    assert_eq!(classify(&doc, node(&doc, "#n")), ElementType::Text, "contenteditable=false is plain text");
}

#[test]
fn classify_click_handlers_containers_and_text() {
    let mut doc = doc(r#"
        <div id="handler">Open</div>
        <div id="inline" onclick="go()">Inline</div>
        <section id="box"><p id="para">Hello</p></section>
        <span id="empty"></span>
        <p id="wrapper">Text <button>inside</button></p>
    "#);
    let handler = node(&doc, "#handler");
    doc.add_event_listener(handler, "click", |_, _| {});

    assert_eq!(classify(&doc, handler), ElementType::Button, "click listener");
    assert_eq!(classify(&doc, node(&doc, "#inline")), ElementType::Button, "onclick attribute");
    assert_eq!(classify(&doc, node(&doc, "#box")), ElementType::Container);
    assert_eq!(classify(&doc, node(&doc, "#para")), ElementType::Text);
    assert_eq!(classify(&doc, node(&doc, "#empty")), ElementType::Other);
    assert_eq!(
        classify(&doc, node(&doc, "#wrapper")),
        ElementType::Other,
        "Text with interactive descendant is not text"
    );
    assert_eq!(classify(&doc, doc.body().unwrap()), ElementType::Container);
}

// =========================================================================
// Descriptors
// =========================================================================

#[test]
fn login_page_descriptors() {
    let doc = page("login.html");
    let output = scan(&doc, &ScanConfig::default());

    let email = output.find_by_selector("#email").expect("email input scanned");
    assert_eq!(email.id, "email");
    assert_eq!(email.element_type, ElementType::Input);
    assert_eq!(email.label, "Email address", "label[for] wins");
    assert_eq!(email.attributes.get("placeholder").map(String::as_str), Some("you@example.com"));
    assert!(email.attributes.contains_key("required"));
    assert_eq!(email.value, Some(ElementValue::Text(String::new())));
    assert!(email.visible && email.enabled);
    assert!(email.bounds.is_some());

    let password = output
        .find_by_selector(r#"input[name="password"]"#)
        .expect("password input scanned");
    assert_eq!(password.label, "Password", "wrapping label text");
    assert!(password.id.starts_with("pc-"), "Generated id for element without id");

    let remember = output.find_by_selector("#remember").unwrap();
    assert_eq!(remember.element_type, ElementType::Checkbox);
    assert_eq!(remember.value, Some(ElementValue::Bool(false)));

    let unavailable = output.find_by_selector("#unavailable").unwrap();
    assert!(!unavailable.enabled, "Disabled elements are included by default");

    assert!(
        !output.elements.iter().any(|e| e.text.as_deref() == Some("Hidden promo")),
        "Hidden banner is skipped"
    );
    assert!(!output.metadata.partial);
    assert_eq!(output.metadata.element_count, output.elements.len());
}

#[test]
fn descriptor_selectors_resolve_to_their_nodes() {
    let doc = page("login.html");
    let output = scan(&doc, &ScanConfig::default());

    for descriptor in &output.elements {
        let found = doc.query_selector_all(&descriptor.selector).unwrap();
        assert_eq!(
            found,
            vec![descriptor.node.unwrap()],
            "{} resolves to exactly its element",
            descriptor.selector
        );
    }
}

#[test]
fn select_is_followed_by_its_options() {
    let doc = page("login.html");
    let output = scan(&doc, &ScanConfig::default());

    let index = output
        .elements
        .iter()
        .position(|e| e.selector == "#country")
        .unwrap();
    let select = &output.elements[index];
    assert_eq!(select.value, Some(ElementValue::Text("ca".into())));

    let metadata = select.select_metadata.as_ref().unwrap();
    assert!(!metadata.multiple);
    assert_eq!(metadata.option_count, 2);
    assert_eq!(metadata.selected_values, vec!["ca"]);

    let options = select.options.as_ref().unwrap();
    assert_eq!(options[0].label, "United States");
    assert!(options[1].selected);

    let first = &output.elements[index + 1];
    let second = &output.elements[index + 2];
    assert_eq!(first.selector, "#country > option:nth-child(1)");
    assert_eq!(second.selector, "#country > option:nth-child(2)");
    assert_eq!(first.element_type, ElementType::Other);
    assert_eq!(first.label, "United States");
    assert_eq!(second.value, Some(ElementValue::Text("ca".into())));
    assert_eq!(first.metadata.depth, select.metadata.depth + 1);
}

#[test]
fn multi_select_reports_value_list() {
    let doc = doc(r#"
        <select id="m" multiple>
            <optgroup label="Letters">
                <option value="a" selected>A</option>
                <option value="b">B</option>
            </optgroup>
            <option value="c" selected>C</option>
        </select>
    "#);
    let output = scan(&doc, &ScanConfig::default());

    let select = output.find_by_selector("#m").unwrap();
    assert_eq!(
        select.value,
        Some(ElementValue::List(vec!["a".into(), "c".into()]))
    );
    assert!(output.find_by_selector("#m > optgroup:nth-child(1) > option:nth-child(2)").is_some());
    assert!(output.find_by_selector("#m > option:nth-child(2)").is_some());
}

// =========================================================================
// Filters
// =========================================================================

#[test]
fn exclude_selector_prunes_whole_subtree() {
    let doc = page("login.html");
    let config = ScanConfig {
        exclude_selectors: StringList::from("nav, .banner"),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);

    assert!(!tags(&output).contains(&"nav"));
    assert!(!tags(&output).contains(&"a"), "Links inside nav are pruned with it");
}

#[test]
fn type_and_pattern_filters_only_skip_the_element() {
    let doc = doc(r#"
        <nav><a href="/a">A</a></nav>
        <div class="promo"><button>Buy</button></div>
    "#);
    let config = ScanConfig {
        exclude_elements: StringList::from(vec!["NAV"]),
        exclude_patterns: PatternList::from("promo"),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);
    let tags = tags(&output);

    assert!(!tags.contains(&"nav"), "nav skipped");
    assert!(tags.contains(&"a"), "nav's link still scanned");
    assert!(!tags.contains(&"div"), "promo div skipped");
    assert!(tags.contains(&"button"), "promo's button still scanned");
}

#[test]
fn include_filters_keep_walking_through_non_matches() {
    let doc = page("login.html");
    let config = ScanConfig {
        include_elements: StringList::from("input,button"),
        include_patterns: PatternList::from(vec!["email|remember|button"]),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);

    let selectors: Vec<&str> = output.elements.iter().map(|e| e.selector.as_str()).collect();
    assert!(selectors.contains(&"#email"));
    assert!(selectors.contains(&"#remember"));
    assert!(selectors.contains(&"#unavailable"), "buttons match the tag pattern");
    assert!(!selectors.iter().any(|s| s.contains("password")), "password input matches no pattern");
    assert!(output.elements.iter().all(|e| e.tag == "input" || e.tag == "button"));
}

#[test]
fn hidden_and_disabled_toggles() {
    let doc = page("login.html");

    let with_hidden = scan(&doc, &ScanConfig { include_hidden: true, ..ScanConfig::default() });
    let banner = with_hidden.find_by_selector("div.banner").expect("hidden banner included");
    assert!(!banner.visible);
    assert!(banner.bounds.is_none(), "No bounds for hidden elements");

    let without_disabled = scan(&doc, &ScanConfig { include_disabled: false, ..ScanConfig::default() });
    assert!(without_disabled.find_by_selector("#unavailable").is_none());
}

#[test]
fn hidden_inputs_are_not_rendered() {
    let doc = doc(r#"<form><input type="hidden" name="csrf" value="tok"><input name="q"></form>"#);

    let output = scan(&doc, &ScanConfig::default());
    assert!(output.find_by_selector("input[name=\"csrf\"]").is_none(), "type=hidden is never displayed");
    assert!(output.find_by_selector("input[name=\"q\"]").is_some());

    let with_hidden = scan(&doc, &ScanConfig { include_hidden: true, ..ScanConfig::default() });
    let csrf = with_hidden
        .find_by_selector("input[name=\"csrf\"]")
        .expect("hidden input included on request");
    assert!(!csrf.visible);
    assert!(csrf.bounds.is_none());
}

#[test]
fn predicate_runs_last() {
    let doc = page("login.html");
    let config = ScanConfig::default().with_predicate(|doc, node| doc.tag_name(node) != Some("a"));
    let output = scan(&doc, &config);

    assert!(!tags(&output).contains(&"a"));
    assert!(tags(&output).contains(&"nav"));
}

#[test]
fn invalid_patterns_and_selectors_are_dropped() {
    let doc = page("login.html");
    let config = ScanConfig {
        exclude_patterns: PatternList::from("(unclosed"),
        exclude_selectors: StringList::from(vec!["div[", "nav"]),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);

    assert!(output.find_by_selector("#email").is_some(), "Bad pattern excludes nothing");
    assert!(!tags(&output).contains(&"nav"), "Valid selector in the list still applies");
}

#[test]
fn extreme_nth_selectors_do_not_abort_the_scan() {
    let doc = doc("<ul><li>one</li><li>two</li></ul><button>Go</button>");
    let config = ScanConfig {
        exclude_selectors: StringList::from("li:nth-child(n-9223372036854775808)"),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);

    assert!(!tags(&output).contains(&"li"), "n-MIN matches every positive position");
    assert!(tags(&output).contains(&"button"));
}

// =========================================================================
// Bounds: roots, depth, cap
// =========================================================================

#[test]
fn root_selectors_and_explicit_root() {
    let doc = page("login.html");
    let config = ScanConfig {
        root_selectors: StringList::from("#login"),
        ..ScanConfig::default()
    };
    let output = scan(&doc, &config);
    assert_eq!(output.elements[0].selector, "#login");
    assert_eq!(output.elements[0].metadata.depth, 0);
    assert!(output.find_by_selector("#top").is_none());

    let nav = node(&doc, "#top");
    let output = Scanner::new().scan_from(&doc, nav, &ScanConfig::default());
    assert_eq!(tags(&output), vec!["nav", "a", "a"]);
}

#[test]
fn depth_limit_is_inclusive() {
    let doc = page("login.html");
    let output = scan(&doc, &ScanConfig { depth: 1, ..ScanConfig::default() });

    assert_eq!(tags(&output), vec!["body", "nav", "main"]);
    assert!(output.elements.iter().all(|e| e.metadata.depth <= 1));
    assert_eq!(output.metadata.depth_used, 1);
}

#[test]
fn element_cap_sets_partial_only_when_something_was_dropped() {
    let doc = doc(r#"<button>1</button><button>2</button><button>3</button>"#);

    let capped = scan(&doc, &ScanConfig { max_elements: 2, ..ScanConfig::default() });
    assert_eq!(capped.elements.len(), 2);
    assert!(capped.metadata.partial);

    // body + three buttons
    let exact = scan(&doc, &ScanConfig { max_elements: 4, ..ScanConfig::default() });
    assert_eq!(exact.elements.len(), 4);
    assert!(!exact.metadata.partial);
}

// =========================================================================
// Change-detection cache
// =========================================================================

#[test]
fn unchanged_elements_come_from_cache() {
    let mut doc = page("login.html");
    let mut scanner = Scanner::new();
    let config = ScanConfig::default();

    let first = scanner.scan(&doc, &config);
    assert_eq!(scanner.cache_hits(), 0, "Cold cache");
    doc.advance(Duration::from_millis(1000));
    let second = scanner.scan(&doc, &config);

    // options travel with their select's entry
    let described = second.elements.iter().filter(|e| e.tag != "option").count();
    assert_eq!(scanner.cache_hits(), described, "Every element served from the cache");
    assert_eq!(first.elements.len(), second.elements.len());
    for (a, b) in first.elements.iter().zip(&second.elements) {
        assert_eq!(b.metadata.last_updated, 1000, "Cache hit refreshes last_updated");
        let mut b = b.clone();
        b.metadata.last_updated = a.metadata.last_updated;
        assert_eq!(*a, b, "Descriptor otherwise identical");
    }
}

#[test]
fn content_changes_invalidate_cache_entry() {
    let mut doc = page("login.html");
    let mut scanner = Scanner::new();
    let config = ScanConfig::default();
    let email = node(&doc, "#email");
    let first_link = node(&doc, "#top > a:nth-of-type(1)");

    let before = scanner.scan(&doc, &config);
    doc.set_value_native(email, "ada@example.com").unwrap();
    doc.set_text(first_link, "Start").unwrap();
    doc.set_attribute(node(&doc, "#unavailable"), "class", "ghost").unwrap();
    let after = scanner.scan(&doc, &config);

    let hash = |output: &ScanOutput, selector: &str| {
        output.find_by_selector(selector).unwrap().metadata.hash.clone()
    };
    assert_ne!(hash(&before, "#email"), hash(&after, "#email"), "value change");
    assert_eq!(
        after.find_by_selector("#email").unwrap().value,
        Some(ElementValue::Text("ada@example.com".into()))
    );
    assert_ne!(
        before.find_by_node(first_link).unwrap().metadata.hash,
        after.find_by_node(first_link).unwrap().metadata.hash,
        "text change"
    );
    assert_ne!(hash(&before, "#unavailable"), hash(&after, "#unavailable"), "class change");
    assert_eq!(hash(&before, "#login"), hash(&after, "#login"), "untouched form keeps its hash");
}

#[test]
fn cache_hits_recheck_selectors_after_tree_changes() {
    let mut doc = page("login.html");
    let mut scanner = Scanner::new();
    let config = ScanConfig::default();
    let password = node(&doc, "input[name=password]");

    let before = scanner.scan(&doc, &config);
    let old_selector = before.find_by_node(password).unwrap().selector.clone();
    assert_eq!(old_selector, "input[name=\"password\"]");

    let twin = doc.create_element("input");
    doc.set_attribute(twin, "name", "password").unwrap();
    let body = doc.body().unwrap();
    doc.append_child(body, twin).unwrap();

    let after = scanner.scan(&doc, &config);
    let rebuilt = after.find_by_node(password).unwrap();
    assert_ne!(rebuilt.selector, old_selector, "Name selector is no longer unique");
    assert_eq!(doc.query_selector_all(&rebuilt.selector).unwrap(), vec![password]);
    assert_eq!(
        rebuilt.metadata.hash,
        before.find_by_node(password).unwrap().metadata.hash,
        "Content unchanged, only the selector was re-synthesized"
    );
}

#[test]
fn removed_nodes_leave_the_cache() {
    let mut doc = page("login.html");
    let mut scanner = Scanner::new();
    let config = ScanConfig::default();

    scanner.scan(&doc, &config);
    let cached = scanner.cache_len();
    doc.remove(node(&doc, "#top"));
    scanner.scan(&doc, &config);

    assert_eq!(scanner.cache_len(), cached - 3, "nav and both links pruned");

    scanner.clear_cache();
    assert_eq!(scanner.cache_len(), 0);
}

#[test]
fn describe_ignores_filters() {
    let doc = page("login.html");
    let mut scanner = Scanner::new();

    let banner = scanner.describe(&doc, node(&doc, ".banner")).unwrap();
    assert!(!banner.visible);
    assert_eq!(banner.selector, "div.banner");
    assert!(scanner.describe(&doc, doc.root()).is_none(), "Document node is not an element");
}
