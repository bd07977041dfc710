//! Names of the files a generation produces.
//!
//! Every requested path maps to a stable key, `gen-<md5 of path>`, and every
//! file derived from that generation lives next to the others in the
//! generation directory.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        Self(format!("gen-{:x}", md5::compute(path.as_bytes())))
    }

    /// Wraps an already computed base name (e.g. `generated` for the REPL).
    #[must_use]
    pub fn from_base(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repaired, pretty-printed notebook.
    #[must_use]
    pub fn notebook_file(&self) -> String {
        format!("{}.ipynb", self.0)
    }

    /// Raw model output, exactly as streamed.
    #[must_use]
    pub fn raw_file(&self) -> String {
        format!("{}-raw.ipynb", self.0)
    }

    #[must_use]
    pub fn final_file(&self) -> String {
        format!("{}-final.ipynb", self.0)
    }

    /// Rendered notebook; this is the URL handed back to viewers.
    #[must_use]
    pub fn html_file(&self) -> String {
        format!("{}.html", self.0)
    }

    #[must_use]
    pub fn log_file(&self) -> String {
        format!("{}.claude.log", self.0)
    }

    #[must_use]
    pub fn notebook_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.notebook_file())
    }

    #[must_use]
    pub fn raw_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.raw_file())
    }

    #[must_use]
    pub fn final_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.final_file())
    }

    #[must_use]
    pub fn html_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.html_file())
    }

    #[must_use]
    pub fn log_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.log_file())
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        let key = ArtifactKey::for_path("/foo/bar");
        assert!(key.as_str().starts_with("gen-"));
        assert!(key.as_str()["gen-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.as_str().len(), "gen-".len() + 32);
    }

    #[test]
    fn test_key_is_stable_and_distinct() {
        assert_eq!(ArtifactKey::for_path("/a"), ArtifactKey::for_path("/a"));
        assert_ne!(ArtifactKey::for_path("/a"), ArtifactKey::for_path("/b"));
    }

    #[test]
    fn test_empty_path_hash() {
        assert_eq!(ArtifactKey::for_path("").as_str(), "gen-d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_derived_file_names() {
        let key = ArtifactKey::from_base("generated");
        assert_eq!(key.notebook_file(), "generated.ipynb");
        assert_eq!(key.raw_file(), "generated-raw.ipynb");
        assert_eq!(key.final_file(), "generated-final.ipynb");
        assert_eq!(key.html_file(), "generated.html");
        assert_eq!(key.log_file(), "generated.claude.log");
        assert_eq!(key.html_path(Path::new("out")), Path::new("out").join("generated.html"));
    }
}
