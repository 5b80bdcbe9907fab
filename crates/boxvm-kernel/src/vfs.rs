//! In-memory virtual filesystem.
//!
//! The namespace is a tree of [`Node`]s rooted at `/`. Paths are absolute
//! and `/`-separated; empty components (leading, trailing or doubled
//! slashes) are discarded before resolution. Every intermediate component
//! must already exist as a directory, otherwise resolution fails with
//! [`FsError::PathNotFound`]. Directory entries keep creation order.
//!
//! # Example
//!
//! ```rust
//! # use boxvm_kernel::vfs::VirtualFilesystem;
//! let mut fs = VirtualFilesystem::new();
//! fs.make_dir("/docs").unwrap();
//! fs.write_file("/docs/readme.txt", "hello").unwrap();
//! assert_eq!(fs.read_file("/docs/readme.txt").unwrap(), "hello");
//! assert_eq!(fs.list_dir("/docs").unwrap(), vec!["readme.txt"]);
//! ```

use crate::error::FsError;

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A filesystem entry: exactly one of file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File { content: String },
    Directory(Directory),
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

/// Ordered mapping of unique entry names to nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<(String, Node)>,
}

impl Directory {
    fn get(&self, name: &str) -> Option<&Node> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    fn insert(&mut self, name: &str, node: Node) {
        self.entries.push((name.to_owned(), node));
    }

    fn remove(&mut self, name: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Entry names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Path handling
// ---------------------------------------------------------------------------

/// Split an absolute path into its non-empty components.
fn components(path: &str) -> Result<Vec<&str>, FsError> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidPath {
            path: path.to_owned(),
            reason: "only absolute paths are allowed".into(),
        });
    }
    Ok(path.split('/').filter(|c| !c.is_empty()).collect())
}

fn not_found(path: &str) -> FsError {
    FsError::PathNotFound {
        path: path.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Hierarchical in-memory namespace. The root always exists.
#[derive(Debug, Clone, Default)]
pub struct VirtualFilesystem {
    root: Directory,
}

impl VirtualFilesystem {
    /// Create a filesystem containing only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the intermediate components and return the parent directory.
    fn parent(&self, path: &str, intermediate: &[&str]) -> Result<&Directory, FsError> {
        let mut current = &self.root;
        for part in intermediate {
            match current.get(part) {
                Some(Node::Directory(dir)) => current = dir,
                _ => return Err(not_found(path)),
            }
        }
        Ok(current)
    }

    fn parent_mut(&mut self, path: &str, intermediate: &[&str]) -> Result<&mut Directory, FsError> {
        let mut current = &mut self.root;
        for part in intermediate {
            match current.get_mut(part) {
                Some(Node::Directory(dir)) => current = dir,
                _ => return Err(not_found(path)),
            }
        }
        Ok(current)
    }

    /// Entry names of the directory at `path`, in creation order.
    pub fn list_dir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let parts = components(path)?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Ok(self.root.names());
        };
        match self.parent(path, intermediate)?.get(leaf) {
            Some(Node::Directory(dir)) => Ok(dir.names()),
            Some(Node::File { .. }) => Err(FsError::NotADirectory {
                path: path.to_owned(),
            }),
            None => Err(not_found(path)),
        }
    }

    /// Content of the file at `path`.
    pub fn read_file(&self, path: &str) -> Result<String, FsError> {
        let parts = components(path)?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Err(FsError::IsADirectory {
                path: path.to_owned(),
            });
        };
        match self.parent(path, intermediate)?.get(leaf) {
            Some(Node::File { content }) => Ok(content.clone()),
            Some(Node::Directory(_)) => Err(FsError::IsADirectory {
                path: path.to_owned(),
            }),
            None => Err(not_found(path)),
        }
    }

    /// Create or overwrite the file at `path`. The parent must exist.
    pub fn write_file(&mut self, path: &str, content: impl Into<String>) -> Result<(), FsError> {
        let parts = components(path)?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Err(FsError::IsADirectory {
                path: path.to_owned(),
            });
        };
        let parent = self.parent_mut(path, intermediate)?;
        match parent.get_mut(leaf) {
            Some(Node::File { content: existing }) => *existing = content.into(),
            Some(Node::Directory(_)) => {
                return Err(FsError::IsADirectory {
                    path: path.to_owned(),
                });
            }
            None => parent.insert(
                leaf,
                Node::File {
                    content: content.into(),
                },
            ),
        }
        tracing::trace!(path, "file written");
        Ok(())
    }

    /// Create a directory. No-op if it already exists as a directory.
    pub fn make_dir(&mut self, path: &str) -> Result<(), FsError> {
        let parts = components(path)?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Ok(());
        };
        let parent = self.parent_mut(path, intermediate)?;
        match parent.get(leaf) {
            Some(Node::Directory(_)) => Ok(()),
            Some(Node::File { .. }) => Err(FsError::AlreadyExists {
                path: path.to_owned(),
            }),
            None => {
                parent.insert(leaf, Node::Directory(Directory::default()));
                tracing::trace!(path, "directory created");
                Ok(())
            }
        }
    }

    /// Remove the file or directory (with its contents) at `path`.
    pub fn delete(&mut self, path: &str) -> Result<(), FsError> {
        let parts = components(path)?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Err(FsError::InvalidPath {
                path: path.to_owned(),
                reason: "the root directory cannot be deleted".into(),
            });
        };
        self.parent_mut(path, intermediate)?
            .remove(leaf)
            .map(|_| tracing::trace!(path, "entry deleted"))
            .ok_or_else(|| not_found(path))
    }

    /// Whether anything exists at `path`. Resolution failures read as `false`.
    ///
    /// The root always exists, so `file_exists("/")` is `true`.
    pub fn file_exists(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Whether `path` names a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(|node| match node {
            Lookup::Root => true,
            Lookup::Node(node) => node.is_dir(),
        })
    }

    fn lookup(&self, path: &str) -> Option<Lookup<'_>> {
        let parts = components(path).ok()?;
        let Some((leaf, intermediate)) = parts.split_last() else {
            return Some(Lookup::Root);
        };
        self.parent(path, intermediate)
            .ok()?
            .get(leaf)
            .map(Lookup::Node)
    }

    /// Every absolute path in the tree, depth-first in creation order.
    /// Directories carry a trailing `/`.
    pub fn tree(&self) -> Vec<String> {
        fn walk(dir: &Directory, prefix: &str, out: &mut Vec<String>) {
            for (name, node) in &dir.entries {
                let path = format!("{prefix}/{name}");
                match node {
                    Node::Directory(child) => {
                        out.push(format!("{path}/"));
                        walk(child, &path, out);
                    }
                    Node::File { .. } => out.push(path),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, "", &mut out);
        out
    }
}

enum Lookup<'a> {
    Root,
    Node(&'a Node),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trip() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/a.txt", "hi").unwrap();
        assert_eq!(fs.read_file("/a.txt").unwrap(), "hi");
    }

    #[test]
    fn overwrite_keeps_entry_position() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/one", "1").unwrap();
        fs.write_file("/two", "2").unwrap();
        fs.write_file("/one", "uno").unwrap();
        assert_eq!(fs.list_dir("/").unwrap(), vec!["one", "two"]);
        assert_eq!(fs.read_file("/one").unwrap(), "uno");
    }

    #[test]
    fn list_dir_preserves_creation_order() {
        let mut fs = VirtualFilesystem::new();
        for name in ["zeta", "alpha", "mid"] {
            fs.write_file(&format!("/{name}"), "").unwrap();
        }
        fs.make_dir("/beta").unwrap();
        assert_eq!(fs.list_dir("/").unwrap(), vec!["zeta", "alpha", "mid", "beta"]);
    }

    #[test]
    fn root_is_always_listable() {
        let fs = VirtualFilesystem::new();
        assert!(fs.list_dir("/").unwrap().is_empty());
        assert!(fs.list_dir("//").unwrap().is_empty());
    }

    #[test]
    fn empty_components_are_ignored() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/d/").unwrap();
        fs.write_file("//d//f.txt", "x").unwrap();
        assert_eq!(fs.read_file("/d/f.txt").unwrap(), "x");
        assert_eq!(fs.list_dir("/d///").unwrap(), vec!["f.txt"]);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let mut fs = VirtualFilesystem::new();
        assert!(matches!(
            fs.write_file("a.txt", "x"),
            Err(FsError::InvalidPath { .. })
        ));
        assert!(matches!(fs.list_dir(""), Err(FsError::InvalidPath { .. })));
        assert!(!fs.file_exists("a.txt"));
    }

    #[test]
    fn write_requires_existing_parent() {
        let mut fs = VirtualFilesystem::new();
        assert_eq!(
            fs.write_file("/nope/f.txt", "x"),
            Err(FsError::PathNotFound {
                path: "/nope/f.txt".into()
            })
        );
    }

    #[test]
    fn file_as_intermediate_is_not_found() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/f", "x").unwrap();
        assert!(matches!(
            fs.read_file("/f/inner"),
            Err(FsError::PathNotFound { .. })
        ));
        assert!(matches!(fs.make_dir("/f/sub"), Err(FsError::PathNotFound { .. })));
    }

    #[test]
    fn write_over_directory_fails() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/d").unwrap();
        assert!(matches!(
            fs.write_file("/d", "x"),
            Err(FsError::IsADirectory { .. })
        ));
        assert!(matches!(
            fs.write_file("/", "x"),
            Err(FsError::IsADirectory { .. })
        ));
    }

    #[test]
    fn read_errors() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/d").unwrap();
        assert!(matches!(fs.read_file("/d"), Err(FsError::IsADirectory { .. })));
        assert!(matches!(fs.read_file("/"), Err(FsError::IsADirectory { .. })));
        assert!(matches!(
            fs.read_file("/missing"),
            Err(FsError::PathNotFound { .. })
        ));
    }

    #[test]
    fn list_dir_errors() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/f", "x").unwrap();
        assert!(matches!(fs.list_dir("/f"), Err(FsError::NotADirectory { .. })));
        assert!(matches!(
            fs.list_dir("/missing"),
            Err(FsError::PathNotFound { .. })
        ));
    }

    #[test]
    fn make_dir_is_idempotent_but_refuses_files() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/d").unwrap();
        fs.write_file("/d/keep", "k").unwrap();
        fs.make_dir("/d").unwrap();
        assert_eq!(fs.list_dir("/d").unwrap(), vec!["keep"]);
        fs.make_dir("/").unwrap();

        fs.write_file("/f", "x").unwrap();
        assert_eq!(
            fs.make_dir("/f"),
            Err(FsError::AlreadyExists { path: "/f".into() })
        );
    }

    #[test]
    fn delete_removes_entry_and_children() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/d").unwrap();
        fs.write_file("/d/a", "1").unwrap();
        fs.delete("/d").unwrap();
        assert!(!fs.file_exists("/d"));
        assert!(!fs.file_exists("/d/a"));
        assert!(fs.list_dir("/").unwrap().is_empty());
    }

    #[test]
    fn delete_then_read_is_not_found() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/a.txt", "hi").unwrap();
        fs.delete("/a.txt").unwrap();
        assert!(!fs.file_exists("/a.txt"));
        assert!(matches!(
            fs.read_file("/a.txt"),
            Err(FsError::PathNotFound { .. })
        ));
        assert!(matches!(fs.delete("/a.txt"), Err(FsError::PathNotFound { .. })));
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut fs = VirtualFilesystem::new();
        assert!(matches!(fs.delete("/"), Err(FsError::InvalidPath { .. })));
        assert!(fs.file_exists("/"));
        assert!(fs.is_dir("/"));
    }

    #[test]
    fn root_always_exists() {
        let mut fs = VirtualFilesystem::new();
        assert!(fs.file_exists("/"));
        fs.make_dir("/docs").unwrap();
        fs.delete("/docs").unwrap();
        assert!(fs.file_exists("/"));
        assert!(fs.list_dir("/").unwrap().is_empty());
    }

    #[test]
    fn file_exists_swallows_resolution_errors() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/f", "x").unwrap();
        assert!(fs.file_exists("/f"));
        assert!(!fs.file_exists("/f/child"));
        assert!(!fs.file_exists("/missing/child"));
        assert!(!fs.is_dir("/f"));
    }

    #[test]
    fn tree_walks_depth_first() {
        let mut fs = VirtualFilesystem::new();
        fs.make_dir("/a").unwrap();
        fs.write_file("/a/x", "").unwrap();
        fs.make_dir("/a/b").unwrap();
        fs.write_file("/top", "").unwrap();
        assert_eq!(fs.tree(), vec!["/a/", "/a/x", "/a/b/", "/top"]);
    }

    #[test]
    fn write_read_list_delete() {
        let mut fs = VirtualFilesystem::new();
        fs.write_file("/a.txt", "hi").unwrap();
        assert_eq!(fs.read_file("/a.txt").unwrap(), "hi");
        fs.make_dir("/d").unwrap();
        fs.write_file("/d/b.txt", "x").unwrap();
        assert_eq!(fs.list_dir("/d").unwrap(), vec!["b.txt"]);
        fs.delete("/a.txt").unwrap();
        assert!(!fs.file_exists("/a.txt"));
    }
}
