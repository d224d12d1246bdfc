//! Working/staged file lists and their directory trees

use std::cmp::Ordering;

use super::FileEntry;

/// Working-tree and staged change lists
///
/// Both lists are kept sorted by path, case-insensitively. The trees are
/// derived once by [`FileDict::finalize`] after the lists are populated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileDict {
    pub working: Vec<FileEntry>,
    pub staged: Vec<FileEntry>,
    pub working_tree: FileTree,
    pub staged_tree: FileTree,
}

impl FileDict {
    /// Sort both lists and build their trees
    pub fn finalize(&mut self) {
        sort_entries(&mut self.working);
        sort_entries(&mut self.staged);
        self.working_tree = FileTree::build(&self.working);
        self.staged_tree = FileTree::build(&self.staged);
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty() && self.staged.is_empty()
    }

    /// Total number of entries across both lists
    pub fn len(&self) -> usize {
        self.working.len() + self.staged.len()
    }
}

/// Case-insensitive path ordering used by every file list
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Stable sort by path, case-insensitive
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| compare_paths(&a.path, &b.path));
}

/// Directory node of a file list
///
/// Leaves are indices into the list the tree was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileTree {
    /// Directory name (empty for the root)
    pub name: String,

    pub dirs: Vec<FileTree>,

    pub files: Vec<usize>,
}

impl FileTree {
    /// Build a tree from a path-sorted list
    pub fn build(entries: &[FileEntry]) -> Self {
        let mut root = FileTree::default();
        for (index, entry) in entries.iter().enumerate() {
            let mut components: Vec<&str> =
                entry.path.split('/').filter(|c| !c.is_empty()).collect();
            // The last component is the file itself
            components.pop();
            root.insert(&components, index);
        }
        root.sort();
        root
    }

    fn insert(&mut self, dirs: &[&str], index: usize) {
        match dirs.split_first() {
            None => self.files.push(index),
            Some((head, rest)) => {
                let pos = match self.dirs.iter().position(|d| d.name == *head) {
                    Some(pos) => pos,
                    None => {
                        self.dirs.push(FileTree {
                            name: head.to_string(),
                            ..Default::default()
                        });
                        self.dirs.len() - 1
                    }
                };
                self.dirs[pos].insert(rest, index);
            }
        }
    }

    fn sort(&mut self) {
        self.dirs.sort_by(|a, b| compare_paths(&a.name, &b.name));
        for dir in &mut self.dirs {
            dir.sort();
        }
    }

    /// Number of files below this node
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.iter().map(FileTree::file_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileKind, FileStatus, Rev};
    use std::path::PathBuf;

    fn entry(path: &str) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            old_path: None,
            absolute_path: PathBuf::from("/repo").join(path),
            status: FileStatus::Modified,
            stats: None,
            kind: FileKind::Working,
            left: Rev::Index,
            right: Rev::Local,
            commit: None,
        }
    }

    #[test]
    fn test_finalize_sorts_case_insensitively() {
        let mut dict = FileDict {
            working: vec![entry("b.rs"), entry("A.rs"), entry("a/c.rs")],
            ..Default::default()
        };
        dict.finalize();

        let paths: Vec<&str> = dict.working.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["A.rs", "a/c.rs", "b.rs"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut entries = vec![entry("README"), entry("readme")];
        sort_entries(&mut entries);
        assert_eq!(entries[0].path, "README");
        assert_eq!(entries[1].path, "readme");
    }

    #[test]
    fn test_tree_groups_directories() {
        let entries = vec![
            entry("src/git/job.rs"),
            entry("src/lib.rs"),
            entry("Cargo.toml"),
        ];
        let tree = FileTree::build(&entries);

        assert_eq!(tree.files, vec![2]);
        assert_eq!(tree.dirs.len(), 1);
        let src = &tree.dirs[0];
        assert_eq!(src.name, "src");
        assert_eq!(src.files, vec![1]);
        assert_eq!(src.dirs[0].name, "git");
        assert_eq!(src.dirs[0].files, vec![0]);
        assert_eq!(tree.file_count(), 3);
    }

    #[test]
    fn test_empty_dict() {
        let mut dict = FileDict::default();
        dict.finalize();
        assert!(dict.is_empty());
        assert_eq!(dict.len(), 0);
        assert_eq!(dict.working_tree.file_count(), 0);
    }
}
