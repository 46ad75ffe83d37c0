use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{InstrumentError, Result};

// -----------------------------------------------------------------------------
// Reserved names
// -----------------------------------------------------------------------------

const DEFAULT_ACTIVATION: &str = "__qp_activation";
const DEFAULT_FRAME_STACK: &str = "__qp_function";

const KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"))
}

/// True when `name` can be written as a bare JavaScript identifier.
pub fn is_identifier(name: &str) -> bool {
    ident_re().is_match(name) && !KEYWORDS.contains(&name)
}

// -----------------------------------------------------------------------------
// Config
// -----------------------------------------------------------------------------

/// Names the generated code relies on, plus a few emission knobs.
///
/// Deserialized from the same kind of JSON blob a bundler hands to a plugin;
/// missing keys fall back to the Querypoint runtime defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentConfig {
    /// Local holding the per-scope activation record.
    pub activation_name: String,
    /// Global array every activation record is pushed onto.
    pub frame_stack_name: String,
    /// `window.__qp.trace`, always three segments.
    pub trace_path: Vec<String>,
    /// Member path of the runtime turn counter.
    pub turn_path: Vec<String>,
    /// Value of the source map's `file` field.
    pub output_name: String,
    /// Run the validate-before-splice gate on synthesized subtrees.
    pub validate: bool,
    pub new_line: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            activation_name: DEFAULT_ACTIVATION.to_string(),
            frame_stack_name: DEFAULT_FRAME_STACK.to_string(),
            trace_path: vec!["window".into(), "__qp".into(), "trace".into()],
            turn_path: vec!["window".into(), "__qp".into(), "turn".into()],
            output_name: "generated.js".to_string(),
            validate: cfg!(debug_assertions),
            new_line: "\n".to_string(),
        }
    }
}

impl InstrumentConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        config.check()?;
        Ok(config)
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Rejects names the generated code could not spell.
    pub fn check(&self) -> Result<()> {
        for (key, name) in [
            ("activationName", &self.activation_name),
            ("frameStackName", &self.frame_stack_name),
        ] {
            if !is_identifier(name) {
                return Err(InstrumentError::Config(format!(
                    "{key} `{name}` is not a valid identifier"
                )));
            }
        }
        if self.trace_path.len() != 3 {
            return Err(InstrumentError::Config(format!(
                "tracePath must have exactly 3 segments, got {}",
                self.trace_path.len()
            )));
        }
        if self.turn_path.is_empty() {
            return Err(InstrumentError::Config("turnPath is empty".to_string()));
        }
        for (key, path) in [("tracePath", &self.trace_path), ("turnPath", &self.turn_path)] {
            if let Some(bad) = path.iter().find(|seg| !is_identifier(seg)) {
                return Err(InstrumentError::Config(format!(
                    "{key} segment `{bad}` is not a valid identifier"
                )));
            }
        }
        if self.new_line != "\n" && self.new_line != "\r\n" {
            return Err(InstrumentError::Config(format!(
                "newLine must be \\n or \\r\\n, got {:?}",
                self.new_line
            )));
        }
        Ok(())
    }
}
