use std::path::{Path, PathBuf};

use crate::namespace::Namespace;

/// Directory holding chat records, relative to the data root.
pub const CHATS_DIR: &str = "chats";
/// Directory holding rate-limit counters, relative to the data root.
pub const LIMITS_DIR: &str = "limits";
/// Directory holding uploaded files, relative to the data root.
pub const UPLOADS_DIR: &str = "uploads";
/// Extension appended to every key-value file.
pub const VALUE_EXTENSION: &str = "json";

/// On-disk layout of the local backends.
///
/// ```text
/// <root>/chats/<id>.json
/// <root>/limits/<id>.json
/// <root>/<key>.json
/// <root>/uploads/<generated id><ext>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chats_dir(&self) -> PathBuf {
        self.root.join(CHATS_DIR)
    }

    pub fn limits_dir(&self) -> PathBuf {
        self.root.join(LIMITS_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Directory where values of the given namespace live.
    pub fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        match namespace {
            Namespace::Chat => self.chats_dir(),
            Namespace::Limit => self.limits_dir(),
            Namespace::Default => self.root.clone(),
        }
    }

    /// Directories the key-value backend needs before its first operation.
    pub fn value_dirs(&self) -> [PathBuf; 3] {
        [self.root.clone(), self.chats_dir(), self.limits_dir()]
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_dirs() {
        let layout = DataLayout::new("/srv/csvchat");
        assert_eq!(
            layout.namespace_dir(Namespace::Chat),
            PathBuf::from("/srv/csvchat/chats")
        );
        assert_eq!(
            layout.namespace_dir(Namespace::Limit),
            PathBuf::from("/srv/csvchat/limits")
        );
        assert_eq!(
            layout.namespace_dir(Namespace::Default),
            PathBuf::from("/srv/csvchat")
        );
        assert_eq!(layout.uploads_dir(), PathBuf::from("/srv/csvchat/uploads"));
    }

    #[test]
    fn default_root() {
        assert_eq!(DataLayout::default().root(), Path::new("data"));
    }
}
