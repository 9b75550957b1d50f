//! The file namespace: resolves on-wire path lists against a configured
//! root, lists directories, and computes recursive size/item counts for
//! folder transfers.

use std::fs;
use std::path::{Path, PathBuf};

use htln_proto::PathList;

use crate::error::Error;

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// File or directory name.
    pub name: String,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// One entry produced by a depth-first folder walk, in the order the
/// folder-download subprotocol sends file-header records for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path segments from the walked root, inclusive of the root's own name.
    pub rel_path: Vec<String>,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Absolute filesystem path.
    pub abs_path: PathBuf,
}

/// Resolves client-supplied path lists against a served root directory.
#[derive(Debug, Clone)]
pub struct FsNamespace {
    root: PathBuf,
}

impl FsNamespace {
    /// Serve files out of `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The served root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an on-wire path list to an absolute path under the root,
    /// rejecting any attempt to escape it.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if any segment is unsafe; rejection
    /// must not touch the filesystem.
    pub fn resolve(&self, path: &PathList) -> Result<PathBuf, Error> {
        Ok(path.resolve(&self.root)?)
    }

    /// Resolve a list of already-decoded segment strings, the same way
    /// [`Self::resolve`] does for raw on-wire path lists.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if any segment is unsafe.
    pub fn resolve_segments(&self, segments: &[String]) -> Result<PathBuf, Error> {
        let mut resolved = self.root.clone();
        for segment in segments {
            htln_proto::validate_segment(segment)
                .map_err(|e| Error::NotFound(e.to_string()))?;
            resolved.push(segment);
        }
        Ok(resolved)
    }

    /// List the immediate contents of `dir`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `dir` does not exist, or `Error::Io`
    /// for any other read failure.
    pub fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntryInfo>, Error> {
        let mut entries = Vec::new();
        let read_dir = fs::read_dir(dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found("No such file or folder.")
            } else {
                Error::from(e)
            }
        })?;

        for entry in read_dir {
            let entry = entry?;
            let metadata = entry.metadata()?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Recursively compute the total byte size and file count under `dir`
    /// (directories themselves are not counted).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if any entry cannot be read.
    pub fn recursive_size_and_count(&self, dir: &Path) -> Result<(u64, u64), Error> {
        let mut total_size = 0u64;
        let mut total_count = 0u64;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                let (size, count) = self.recursive_size_and_count(&entry.path())?;
                total_size += size;
                total_count += count;
            } else {
                total_size += metadata.len();
                total_count += 1;
            }
        }
        Ok((total_size, total_count))
    }

    /// Walk `root_rel` depth-first, directories emitted immediately
    /// before their contents, siblings in name-sorted order — the order
    /// the folder-download subprotocol streams file-header records in.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `root_rel` is unsafe, or `Error::Io`
    /// for any read failure.
    pub fn walk_depth_first(&self, root_rel: &[String]) -> Result<Vec<WalkEntry>, Error> {
        let root_abs = self.resolve_segments(root_rel)?;
        let mut out = vec![WalkEntry {
            rel_path: root_rel.to_vec(),
            is_dir: true,
            abs_path: root_abs.clone(),
        }];
        self.walk_inner(&root_abs, root_rel.to_vec(), &mut out)?;
        Ok(out)
    }

    fn walk_inner(
        &self,
        dir_abs: &Path,
        rel_prefix: Vec<String>,
        out: &mut Vec<WalkEntry>,
    ) -> Result<(), Error> {
        let mut children: Vec<_> = fs::read_dir(dir_abs)?.collect::<std::io::Result<_>>()?;
        children.sort_by_key(std::fs::DirEntry::file_name);

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let mut rel = rel_prefix.clone();
            rel.push(name);
            let abs_path = child.path();
            let is_dir = child.file_type()?.is_dir();

            out.push(WalkEntry {
                rel_path: rel.clone(),
                is_dir,
                abs_path: abs_path.clone(),
            });
            if is_dir {
                self.walk_inner(&abs_path, rel, out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn walk_visits_root_then_children_depth_first_name_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let ns = FsNamespace::new(dir.path());
        write_file(&dir.path().join("foo/a.txt"), b"a");
        write_file(&dir.path().join("foo/bar/b.txt"), b"b");

        let entries = ns.walk_depth_first(&["foo".to_string()]).unwrap();
        let paths: Vec<String> = entries
            .iter()
            .map(|e| e.rel_path.join("/"))
            .collect();

        assert_eq!(
            paths,
            vec!["foo", "foo/a.txt", "foo/bar", "foo/bar/b.txt"]
        );
        assert!(!entries[1].is_dir);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn recursive_size_and_count_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let ns = FsNamespace::new(dir.path());
        write_file(&dir.path().join("a.txt"), b"hello");
        write_file(&dir.path().join("sub/b.txt"), b"world!");

        let (size, count) = ns.recursive_size_and_count(dir.path()).unwrap();
        assert_eq!(size, 5 + 6);
        assert_eq!(count, 2);
    }

    #[test]
    fn list_dir_is_name_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let ns = FsNamespace::new(dir.path());
        write_file(&dir.path().join("zeta.txt"), b"z");
        write_file(&dir.path().join("alpha.txt"), b"a");

        let entries = ns.list_dir(dir.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "zeta.txt"]);
    }

    #[test]
    fn resolve_rejects_unsafe_segments_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ns = FsNamespace::new(dir.path());
        let unsafe_list = PathList::new(vec![b"..".to_vec()]);
        assert!(matches!(ns.resolve(&unsafe_list), Err(Error::NotFound(_))));
    }
}
