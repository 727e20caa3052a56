use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::{Document, NodeId};

/// Runs the `script` of a `custom` command. `element` is the resolved
/// target, if the command had one. An `Err` is the script's thrown error.
pub trait ScriptHost {
    fn run(&self, doc: &mut Document, element: Option<NodeId>, script: &str) -> Result<Option<Value>, String>;
}

pub type ScriptFn = Rc<dyn Fn(&mut Document, Option<NodeId>) -> Result<Option<Value>, String>>;

/// Named scripts registered ahead of time. The command's `script` field is
/// the name to run.
#[derive(Clone, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, ScriptFn>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        script: impl Fn(&mut Document, Option<NodeId>) -> Result<Option<Value>, String> + 'static,
    ) -> &mut Self {
        self.scripts.insert(name.to_string(), Rc::new(script));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("scripts", &self.names())
            .finish()
    }
}

impl ScriptHost for ScriptRegistry {
    fn run(&self, doc: &mut Document, element: Option<NodeId>, script: &str) -> Result<Option<Value>, String> {
        let script = script.trim();
        let f = self
            .scripts
            .get(script)
            .cloned()
            .ok_or_else(|| format!("no script registered as '{script}'"))?;
        f(doc, element)
    }
}
