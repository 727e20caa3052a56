use crate::{
    context::{PageContext, build_page_context},
    dom::Document,
    scan::{ScanConfig, Scanner},
};

pub mod action;
pub mod cli;
pub mod context;
pub mod dom;
pub mod locator;
pub mod scan;
pub mod tools;
pub mod tracker;
pub mod trace;

/// Scan a document with a fresh scanner and aggregate the result.
pub fn snapshot(doc: &Document, config: &ScanConfig) -> PageContext {
    let mut scanner = Scanner::new();
    let output = scanner.scan(doc, config);
    build_page_context(doc, &output)
}
