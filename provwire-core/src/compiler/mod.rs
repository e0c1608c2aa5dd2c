// Stack document parsing.
//
// Parsing never fails the process: syntax problems and unsupported formats
// are reported to a `DiagSink` and the parse yields no stack.

pub mod diag;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::resource::PropertyMap;

pub use diag::{CollectingSink, DiagSink, Diagnostic, Position, Severity};

/// Raw source of a stack definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file: PathBuf,
    pub body: Vec<u8>,
}

impl Document {
    pub fn new(file: impl AsRef<Path>, body: impl Into<Vec<u8>>) -> Self {
        Document {
            file: file.as_ref().to_path_buf(),
            body: body.into(),
        }
    }

    /// Lowercased file extension without the dot.
    pub fn ext(&self) -> Option<String> {
        self.file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Typed stack definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: JsonMap<String, JsonValue>,
}

impl Stack {
    /// The stack's properties in the engine's value model.
    pub fn property_map(&self) -> PropertyMap {
        PropertyMap::from_mappable(self.properties.clone())
    }
}

/// Decodes one document format into a stack.
pub trait DocumentMarshaler: Send + Sync + fmt::Debug {
    fn unmarshal(&self, body: &[u8]) -> Result<Stack, Diagnostic>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

impl DocumentMarshaler for JsonMarshaler {
    fn unmarshal(&self, body: &[u8]) -> Result<Stack, Diagnostic> {
        serde_json::from_slice(body).map_err(|e| {
            Diagnostic::error(format!("illegal stack document syntax: {}", e)).at(e.line(), e.column())
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlMarshaler;

impl DocumentMarshaler for YamlMarshaler {
    fn unmarshal(&self, body: &[u8]) -> Result<Stack, Diagnostic> {
        serde_yaml::from_slice(body).map_err(|e| {
            let diag = Diagnostic::error(format!("illegal stack document syntax: {}", e));
            match e.location() {
                Some(loc) => diag.at(loc.line(), loc.column()),
                None => diag,
            }
        })
    }
}

#[derive(Debug)]
pub struct Parser {
    marshalers: HashMap<String, Box<dyn DocumentMarshaler>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Parser with the built-in JSON and YAML formats registered.
    pub fn new() -> Self {
        let mut parser = Parser {
            marshalers: HashMap::new(),
        };
        parser.register("json", JsonMarshaler);
        parser.register("yaml", YamlMarshaler);
        parser.register("yml", YamlMarshaler);
        parser
    }

    pub fn register(&mut self, ext: &str, marshaler: impl DocumentMarshaler + 'static) {
        self.marshalers
            .insert(ext.to_ascii_lowercase(), Box::new(marshaler));
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.marshalers.contains_key(&ext.to_ascii_lowercase())
    }

    /// Parse a document, reporting problems to `sink`. Returns `None` if any
    /// error was reported.
    pub fn parse(&self, doc: &Document, sink: &mut dyn DiagSink) -> Option<Stack> {
        info!(
            "Parsing stack document: {} (len(body)={})",
            doc.file.display(),
            doc.body.len()
        );

        let ext = doc.ext().unwrap_or_default();
        let Some(marshaler) = self.marshalers.get(&ext) else {
            sink.report(
                Diagnostic::error(format!(
                    "no marshaler registered for stack document extension: {:?}",
                    ext
                ))
                .with_document(&doc.file),
            );
            return None;
        };

        let result = match marshaler.unmarshal(&doc.body) {
            Ok(stack) => Some(stack),
            Err(diag) => {
                sink.report(diag.with_document(&doc.file));
                None
            }
        };
        debug!(
            "Parsing {} completed with {} warnings and {} errors",
            doc.file.display(),
            sink.warnings(),
            sink.errors()
        );
        result
    }
}
