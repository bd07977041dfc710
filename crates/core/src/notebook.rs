//! Serde model of nbformat 4 notebooks.
//!
//! Every field defaults so that a notebook truncated mid-stream (and closed by
//! [`crate::repair_notebook`]) still deserializes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Current major nbformat version written when the model omits it.
pub const NBFORMAT_MAJOR: u32 = 4;

/// Default cell metadata name assigned during validation.
const DEFAULT_CELL_NAME: &str = "cell";

/// A Jupyter notebook document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub nbformat_minor: u32,
    #[serde(default)]
    pub nbformat: u32,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Parses notebook JSON without repairing it.
    ///
    /// # Errors
    /// Returns an error if `json` is not a valid notebook document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalizes fields that nbconvert refuses to render without.
    pub fn validate(&mut self) {
        self.metadata.validate();
        if self.nbformat == 0 {
            self.nbformat = NBFORMAT_MAJOR;
        }
        for cell in &mut self.cells {
            cell.validate();
        }
    }

    /// Compact JSON encoding.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Two-space indented JSON encoding, as written to `.ipynb` files.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Title from metadata, falling back to the first markdown heading.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(title.trim().to_owned());
        }
        self.cells
            .iter()
            .filter(|c| c.cell_type == CellType::Markdown)
            .filter_map(|c| c.source.as_ref())
            .flat_map(|s| s.to_text().lines().map(str::to_owned).collect::<Vec<_>>())
            .find_map(|line| line.strip_prefix('#').map(|h| h.trim_start_matches('#').trim().to_owned()))
            .filter(|t| !t.is_empty())
    }
}

/// Notebook-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_info: Option<LanguageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_nbformat: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// Keys the model produced that nbformat does not name.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    fn validate(&mut self) {
        if let Some(ref mut spec) = self.kernelspec {
            if spec.display_name.is_empty() {
                spec.display_name.clone_from(&spec.name);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codemirror_mode: Option<serde_json::Value>,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub pygments_lexer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
}

/// Cell kind. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Code,
    Markdown,
    Raw,
    #[serde(untagged)]
    Other(String),
}

impl CellType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub cell_type: CellType,
    #[serde(default)]
    pub metadata: CellMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MultilineString>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, MimeBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,
    #[serde(default)]
    pub execution_count: Option<i64>,
}

impl Cell {
    fn validate(&mut self) {
        self.metadata.validate();
        if self.cell_type == CellType::Code && self.outputs.is_none() {
            self.outputs = Some(Vec::new());
        }
        for output in self.outputs.iter_mut().flatten() {
            output.validate();
        }
    }

    /// Source text with array-form lines joined.
    #[must_use]
    pub fn source_text(&self) -> String {
        self.source.as_ref().map(MultilineString::to_text).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jupyter: Option<JupyterFlags>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub execution: BTreeMap<String, String>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrolled: Option<serde_json::Value>,
}

impl CellMetadata {
    fn validate(&mut self) {
        if self.name.is_empty() {
            DEFAULT_CELL_NAME.clone_into(&mut self.name);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JupyterFlags {
    #[serde(default)]
    pub source_hidden: bool,
    #[serde(default)]
    pub outputs_hidden: bool,
}

/// A cell output (`stream`, `execute_result`, `display_data` or `error`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub output_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: MimeBundle,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<MultilineString>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub evalue: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traceback: Vec<String>,
}

impl Output {
    fn validate(&mut self) {
        if self.output_type == "stream" && self.name.is_empty() {
            "stdout".clone_into(&mut self.name);
        }
    }
}

pub type MimeBundle = BTreeMap<String, MultilineString>;

/// nbformat text field: either one string or a list of lines. Mime bundles
/// may also carry structured JSON (`application/json`), kept as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineString {
    Text(String),
    Lines(Vec<String>),
    Json(serde_json::Value),
}

impl Default for MultilineString {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MultilineString {
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Lines(lines) => lines.concat(),
            Self::Json(value) => value.to_string(),
        }
    }
}

impl From<&str> for MultilineString {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiline_string_accepts_both_forms() {
        let text: MultilineString = serde_json::from_str(r#""a\nb""#).unwrap();
        let lines: MultilineString = serde_json::from_str(r#"["a\n", "b"]"#).unwrap();
        assert_eq!(text.to_text(), "a\nb");
        assert_eq!(lines.to_text(), "a\nb");
    }

    #[test]
    fn test_multiline_string_keeps_its_shape() {
        let lines = MultilineString::Lines(vec!["x\n".to_owned(), "y".to_owned()]);
        assert_eq!(serde_json::to_string(&lines).unwrap(), r#"["x\n","y"]"#);
        assert_eq!(serde_json::to_string(&MultilineString::from("z")).unwrap(), r#""z""#);
    }

    #[test]
    fn test_validate_fills_defaults() {
        let mut nb: Notebook =
            serde_json::from_str(r#"{"cells":[{"cell_type":"code","source":"print(1)"}]}"#)
                .unwrap();
        nb.validate();
        assert_eq!(nb.nbformat, 4);
        assert_eq!(nb.cells[0].metadata.name, "cell");
        assert_eq!(nb.cells[0].outputs, Some(Vec::new()));
    }

    #[test]
    fn test_validate_leaves_markdown_outputs_absent() {
        let mut nb: Notebook =
            serde_json::from_str(r##"{"cells":[{"cell_type":"markdown","source":"# Hi"}]}"##)
                .unwrap();
        nb.validate();
        assert!(nb.cells[0].outputs.is_none());
        let json = nb.to_json().unwrap();
        assert!(!json.contains("outputs"));
    }

    #[test]
    fn test_unknown_cell_type_round_trips() {
        let cell: Cell = serde_json::from_str(r#"{"cell_type":"heading"}"#).unwrap();
        assert_eq!(cell.cell_type, CellType::Other("heading".to_owned()));
        assert!(serde_json::to_string(&cell).unwrap().contains(r#""cell_type":"heading""#));
    }

    #[test]
    fn test_metadata_preserves_unknown_keys() {
        let nb: Notebook =
            serde_json::from_str(r#"{"metadata":{"colab":{"provenance":[]}},"cells":[]}"#).unwrap();
        assert!(nb.metadata.extra.contains_key("colab"));
        assert!(nb.to_json().unwrap().contains("colab"));
    }

    #[test]
    fn test_title_prefers_metadata_then_heading() {
        let mut nb: Notebook = serde_json::from_str(
            r###"{"cells":[{"cell_type":"markdown","source":["intro\n","## Fine-tuning Llama\n"]}]}"###,
        )
        .unwrap();
        assert_eq!(nb.title().as_deref(), Some("Fine-tuning Llama"));
        nb.metadata.title = Some("Explicit".to_owned());
        assert_eq!(nb.title().as_deref(), Some("Explicit"));
    }

    #[test]
    fn test_structured_mime_data_is_accepted() {
        let nb = Notebook::from_json(
            r#"{"cells":[{"cell_type":"code","outputs":[{"output_type":"display_data","data":{"application/json":{"loss":0.5},"text/plain":["{'loss': 0.5}"]}}]}]}"#,
        )
        .unwrap();
        let data = &nb.cells[0].outputs.as_ref().unwrap()[0].data;
        assert_eq!(data["application/json"].to_text(), r#"{"loss":0.5}"#);
        assert_eq!(data["text/plain"].to_text(), "{'loss': 0.5}");
    }

    #[test]
    fn test_stream_output_gets_default_name() {
        let mut nb: Notebook = serde_json::from_str(
            r#"{"cells":[{"cell_type":"code","outputs":[{"output_type":"stream","text":"hi"}]}]}"#,
        )
        .unwrap();
        nb.validate();
        let outputs = nb.cells[0].outputs.as_ref().unwrap();
        assert_eq!(outputs[0].name, "stdout");
    }
}
