// View definition cache and view-definition documents
// All .view files are read once at startup and kept as raw text. The cache
// deliberately stores pre-parse text: building the element tree runs a
// controller's one-time setup, so every navigation must re-parse from
// pristine text into a brand-new tree instead of reusing a parsed one.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Recognized extension for view-definition files.
pub const VIEW_EXTENSION: &str = "view";

#[derive(Debug, thiserror::Error)]
pub enum ViewCacheError {
    #[error("cannot enumerate view directory {path}: {source}")]
    DirAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read view definition {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no view definition named \"{0}\" was loaded")]
    UnknownView(String),
}

/// Raw text of every view definition found at startup, keyed by file name
/// (extension included). Populated exactly once per process; files added
/// to the directory later are not picked up.
#[derive(Debug)]
pub struct ViewCache {
    definitions: HashMap<String, String>,
}

impl ViewCache {
    /// Read every `.view` file in `dir` into the cache. One unreadable
    /// file fails the whole load; navigation must not start from a
    /// partial cache.
    pub fn load_all(dir: &Path) -> Result<ViewCache, ViewCacheError> {
        let entries = fs::read_dir(dir).map_err(|source| ViewCacheError::DirAccess {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut definitions = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| ViewCacheError::DirAccess {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(VIEW_EXTENSION) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let text = fs::read_to_string(&path)
                .map_err(|source| ViewCacheError::ReadFile { path, source })?;
            definitions.insert(name, text);
        }

        info!(count = definitions.len(), ?dir, "view definitions cached");
        Ok(ViewCache { definitions })
    }

    /// Raw text of a cached definition. Names never loaded always fail,
    /// they are never answered with stale or partial data.
    pub fn get(&self, name: &str) -> Result<&str, ViewCacheError> {
        self.definitions
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ViewCacheError::UnknownView(name.to_string()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

/// A parsed view definition: the controller type it declares plus the
/// root of its element tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewDoc {
    pub controller: String,
    pub root: ViewNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Vertical container; renders its children top to bottom.
    Column,
    /// A line (or lines) of text.
    Label,
    /// Selectable list; children are its items.
    Menu,
    /// One entry of a menu.
    Item,
    /// Blank line.
    Spacer,
}

/// One element of a view tree. `text` values starting with `%` are
/// locale-message references, resolved during navigation.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<ViewNode>,
    /// Runtime cursor for menus; never part of the definition file.
    #[serde(skip)]
    pub selected: usize,
}

impl ViewNode {
    /// Depth-first lookup of a named element.
    pub fn find(&self, id: &str) -> Option<&ViewNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ViewNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }
}

/// Parse raw view-definition text into a fresh document. Called on every
/// navigation; the result is never memoized.
pub fn parse_view(raw: &str) -> Result<ViewDoc, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MAIN_VIEW: &str = "controller = \"main-menu\"\n\n[root]\nkind = \"column\"\n";
    const OPTIONS_VIEW: &str = "controller = \"options\"\n\n[root]\nkind = \"column\"\n";

    fn view_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.view"), MAIN_VIEW).unwrap();
        fs::write(dir.path().join("options.view"), OPTIONS_VIEW).unwrap();
        dir
    }

    #[test]
    fn load_all_keeps_each_file_byte_for_byte() {
        let dir = view_dir();
        let cache = ViewCache::load_all(dir.path()).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("main.view").unwrap(), MAIN_VIEW);
        assert_eq!(cache.get("options.view").unwrap(), OPTIONS_VIEW);
    }

    #[test]
    fn load_all_ignores_files_without_the_view_extension() {
        let dir = view_dir();
        fs::write(dir.path().join("readme.txt"), "not a view").unwrap();
        fs::write(dir.path().join("viewless"), "no extension").unwrap();
        fs::create_dir(dir.path().join("nested.view")).unwrap();

        let cache = ViewCache::load_all(dir.path()).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get("readme.txt").is_err());
    }

    #[test]
    fn cache_is_debug_formattable() {
        let dir = view_dir();
        let cache = ViewCache::load_all(dir.path()).unwrap();
        assert!(format!("{:?}", cache).contains("main.view"));
    }

    #[test]
    fn get_on_unknown_name_fails() {
        let dir = view_dir();
        let cache = ViewCache::load_all(dir.path()).unwrap();
        let err = cache.get("missing.view").unwrap_err();
        assert!(matches!(err, ViewCacheError::UnknownView(name) if name == "missing.view"));
    }

    #[test]
    fn load_all_fails_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = ViewCache::load_all(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ViewCacheError::DirAccess { .. }));
    }

    #[test]
    fn one_unreadable_file_fails_the_whole_load() {
        let dir = view_dir();
        // Invalid UTF-8 cannot be read to a string
        fs::write(dir.path().join("broken.view"), [0xff, 0xfe, 0x00]).unwrap();

        let err = ViewCache::load_all(dir.path()).unwrap_err();
        assert!(matches!(err, ViewCacheError::ReadFile { .. }));
    }

    #[test]
    fn parse_view_reads_controller_and_tree() {
        let raw = concat!(
            "controller = \"main-menu\"\n",
            "\n",
            "[root]\n",
            "kind = \"column\"\n",
            "\n",
            "[[root.children]]\n",
            "kind = \"label\"\n",
            "id = \"title\"\n",
            "text = \"%menu.title\"\n",
            "\n",
            "[[root.children]]\n",
            "kind = \"menu\"\n",
            "id = \"menu\"\n",
            "\n",
            "[[root.children.children]]\n",
            "kind = \"item\"\n",
            "id = \"item-exit\"\n",
            "text = \"%menu.exit\"\n",
        );

        let doc = parse_view(raw).unwrap();
        assert_eq!(doc.controller, "main-menu");
        assert_eq!(doc.root.kind, NodeKind::Column);
        assert_eq!(doc.root.children.len(), 2);

        let title = doc.root.find("title").unwrap();
        assert_eq!(title.kind, NodeKind::Label);
        assert_eq!(title.text.as_deref(), Some("%menu.title"));

        let menu = doc.root.find("menu").unwrap();
        assert_eq!(menu.children.len(), 1);
        assert_eq!(menu.selected, 0);
        assert!(doc.root.find("item-exit").is_some());
        assert!(doc.root.find("item-play").is_none());
    }

    #[test]
    fn parse_view_rejects_malformed_text() {
        assert!(parse_view("this is not a view definition").is_err());
        assert!(parse_view("controller = \"x\"\n").is_err()); // no root
        assert!(parse_view("[root]\nkind = \"column\"\n").is_err()); // no controller
    }

    #[test]
    fn find_mut_reaches_nested_elements() {
        let raw = concat!(
            "controller = \"options\"\n",
            "[root]\n",
            "kind = \"column\"\n",
            "[[root.children]]\n",
            "kind = \"menu\"\n",
            "[[root.children.children]]\n",
            "kind = \"item\"\n",
            "id = \"item-lang\"\n",
        );
        let mut doc = parse_view(raw).unwrap();
        doc.root.find_mut("item-lang").unwrap().text = Some("Language: en".to_string());
        assert_eq!(
            doc.root.find("item-lang").unwrap().text.as_deref(),
            Some("Language: en")
        );
    }
}
