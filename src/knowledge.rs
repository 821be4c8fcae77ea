//! Markdown knowledge base: project conventions and past review summaries,
//! stored as plain files so they survive between runs and stay greppable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to access knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("knowledge file not found: {0}")]
    NotFound(String),
}

/// File-backed note store rooted at a single directory. Review summaries
/// live under `reviews/`, free-form notes anywhere else.
pub struct KnowledgeBase {
    root: PathBuf,
}

impl KnowledgeBase {
    /// Open (creating if needed) a knowledge base at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<KnowledgeBase, KnowledgeError> {
        let root = root.into();
        fs::create_dir_all(root.join("reviews"))?;
        Ok(KnowledgeBase { root })
    }

    /// Load every markdown note, keyed by path relative to the root.
    pub fn load_all(&self) -> Result<BTreeMap<String, String>, KnowledgeError> {
        let mut notes = BTreeMap::new();
        for path in self.markdown_paths()? {
            let key = self.relative_key(&path);
            notes.insert(key, fs::read_to_string(&path)?);
        }
        Ok(notes)
    }

    /// Load one note by its root-relative name.
    pub fn load_file(&self, name: &str) -> Result<String, KnowledgeError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(KnowledgeError::NotFound(name.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Persist a review summary for a PR under `reviews/pr-{n}.md`.
    pub fn save_review(
        &self,
        pr_number: u64,
        title: &str,
        summary: &str,
    ) -> Result<PathBuf, KnowledgeError> {
        let path = self.root.join("reviews").join(format!("pr-{pr_number}.md"));
        fs::write(&path, format!("# PR #{pr_number}: {title}\n\n{summary}\n"))?;
        debug!(path = %path.display(), "review summary saved");
        Ok(path)
    }

    /// Create or overwrite a note. A missing `.md` extension is appended;
    /// intermediate directories are created.
    pub fn add_note(&self, filename: &str, content: &str) -> Result<PathBuf, KnowledgeError> {
        let mut name = filename.to_string();
        if !name.ends_with(".md") {
            name.push_str(".md");
        }
        let path = self.root.join(&name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        debug!(path = %path.display(), "note saved");
        Ok(path)
    }

    /// Sorted root-relative names of every markdown note.
    pub fn list_files(&self) -> Result<Vec<String>, KnowledgeError> {
        Ok(self
            .markdown_paths()?
            .iter()
            .map(|p| self.relative_key(p))
            .collect())
    }

    fn markdown_paths(&self) -> Result<Vec<PathBuf>, KnowledgeError> {
        let mut paths = Vec::new();
        collect_markdown(&self.root, &mut paths)?;
        paths.sort();
        Ok(paths)
    }

    fn relative_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_kb(tag: &str) -> KnowledgeBase {
        let root = std::env::temp_dir().join(format!("pr-reviewer-kb-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&root).ok();
        KnowledgeBase::open(root).unwrap()
    }

    #[test]
    fn test_save_review_layout_and_content() {
        let kb = temp_kb("save");
        let path = kb.save_review(42, "Add OAuth2 login flow", "Looks solid overall.").unwrap();
        assert!(path.ends_with("reviews/pr-42.md"));
        let content = kb.load_file("reviews/pr-42.md").unwrap();
        assert!(content.starts_with("# PR #42: Add OAuth2 login flow\n"));
        assert!(content.contains("Looks solid overall."));
        fs::remove_dir_all(&kb.root).ok();
    }

    #[test]
    fn test_add_note_appends_extension_and_creates_dirs() {
        let kb = temp_kb("note");
        let path = kb.add_note("conventions/errors", "Use thiserror.").unwrap();
        assert!(path.ends_with("conventions/errors.md"));
        assert_eq!(kb.load_file("conventions/errors.md").unwrap(), "Use thiserror.");
        fs::remove_dir_all(&kb.root).ok();
    }

    #[test]
    fn test_load_all_and_list_are_sorted_and_relative() {
        let kb = temp_kb("list");
        kb.add_note("zeta", "z").unwrap();
        kb.add_note("alpha", "a").unwrap();
        kb.save_review(7, "t", "s").unwrap();

        let names = kb.list_files().unwrap();
        assert_eq!(names, vec!["alpha.md", "reviews/pr-7.md", "zeta.md"]);

        let all = kb.load_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.get("alpha.md").map(String::as_str), Some("a"));
        fs::remove_dir_all(&kb.root).ok();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let kb = temp_kb("missing");
        assert!(matches!(
            kb.load_file("nope.md"),
            Err(KnowledgeError::NotFound(_))
        ));
        fs::remove_dir_all(&kb.root).ok();
    }

    #[test]
    fn test_non_markdown_files_ignored() {
        let kb = temp_kb("ignore");
        fs::write(kb.root.join("scratch.txt"), "not a note").unwrap();
        kb.add_note("real", "yes").unwrap();
        assert_eq!(kb.list_files().unwrap(), vec!["real.md"]);
        fs::remove_dir_all(&kb.root).ok();
    }
}
