use std::path::Path;

use serde_json::{Value, json};

use crate::action::{ActionCommand, ActionExecutor, ExecutorConfig};
use crate::context::{Format, build_page_context, serialize};
use crate::dom::Document;
use crate::scan::{ScanConfig, Scanner};
use crate::tools::tool_definitions;
use crate::trace::TraceLogger;

/// Read an HTML file into a document. The document URL defaults to the
/// file's `file://` path.
pub fn load_document(path: &Path, url: Option<&str>) -> Result<Document, Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let url = url
        .map(str::to_string)
        .unwrap_or_else(|| format!("file://{}", path.display()));
    Ok(Document::parse_html_with_url(&html, &url))
}

/// Parse a command file: a JSON array of commands or `{"commands": [...]}`.
pub fn parse_commands(json_text: &str) -> Result<Vec<ActionCommand>, Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(json_text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("commands") {
            Some(Value::Array(items)) => items,
            _ => return Err("command file object must have a \"commands\" array".into()),
        },
        _ => return Err("command file must be a JSON array of commands".into()),
    };

    let mut commands = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let command = ActionCommand::from_value(item).map_err(|e| format!("command {i}: {e}"))?;
        commands.push(command);
    }
    Ok(commands)
}

// ============================================================================
// scan subcommand
// ============================================================================

pub fn render_scan(doc: &Document, config: &ScanConfig, format: Format) -> Result<String, Box<dyn std::error::Error>> {
    let mut scanner = Scanner::new();
    let output = scanner.scan(doc, config);
    let context = build_page_context(doc, &output);
    Ok(serialize(&context, format)?)
}

pub fn cmd_scan(
    html: &Path,
    url: Option<&str>,
    format: &str,
    config: &ScanConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let format: Format = format.parse()?;
    let doc = load_document(html, url)?;
    println!("{}", render_scan(&doc, config, format)?);
    Ok(())
}

// ============================================================================
// exec subcommand
// ============================================================================

/// Run the command file and print results plus the rescanned context.
/// Returns whether every command succeeded.
pub fn cmd_exec(
    html: &Path,
    url: Option<&str>,
    commands_path: &Path,
    trace: Option<&Path>,
    format: &str,
    scan_config: &ScanConfig,
    executor_config: ExecutorConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let format: Format = format.parse()?;
    let mut doc = load_document(html, url)?;
    let commands_text = std::fs::read_to_string(commands_path)
        .map_err(|e| format!("cannot read {}: {e}", commands_path.display()))?;
    let commands = parse_commands(&commands_text)?;

    let mut executor = ActionExecutor::new(executor_config);
    if let Some(path) = trace {
        executor = executor.with_tracer(TraceLogger::new(path));
    }

    let results = executor.execute_batch(&mut doc, &commands);
    let all_succeeded = results.len() == commands.len() && results.iter().all(|r| r.success);
    tracing::info!(
        executed = results.len(),
        total = commands.len(),
        all_succeeded,
        "batch finished"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "results": results }))?
    );
    println!("{}", render_scan(&doc, scan_config, format)?);
    Ok(all_succeeded)
}

// ============================================================================
// tools subcommand
// ============================================================================

pub fn cmd_tools() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&tool_definitions())?);
    Ok(())
}
