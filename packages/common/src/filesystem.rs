use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Content-root file access used by loaders and resource validators.
///
/// Paths are resource paths relative to the content root, written with a
/// leading slash (`/main/player.go`).
pub trait FileSystem {
    /// Check if a resource exists
    fn exists(&self, path: &str) -> bool;

    /// Read the raw bytes of a resource
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Replace the contents of a resource
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// Read a resource as UTF-8 text
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Normalize a resource path to its canonical `/a/b.ext` form.
pub fn normalize_resource_path(path: &str) -> String {
    let trimmed = path.trim().replace('\\', "/");
    let parts: Vec<&str> = trimmed
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    format!("/{}", parts.join("/"))
}

/// Extension of a resource path, without the dot
pub fn resource_extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Real file system rooted at a project directory
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a resource path to a location on disk
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let normalized = normalize_resource_path(path);
        let relative = Path::new(normalized.trim_start_matches('/'));

        // Reject anything that would escape the content root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource path escapes content root: {}", path),
            ));
        }

        Ok(self.root.join(relative))
    }

    /// Map an absolute file path back to a resource path, if it lies under the root
    pub fn to_resource_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            return None;
        }
        Some(format!("/{}", segments.join("/")))
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)
    }
}

/// In-memory file system for testing
#[derive(Debug, Default)]
pub struct MockFileSystem {
    files: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files
            .borrow_mut()
            .insert(normalize_resource_path(path), contents.into());
    }

    pub fn remove_file(&self, path: &str) -> bool {
        self.files
            .borrow_mut()
            .remove(&normalize_resource_path(path))
            .is_some()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &str) -> bool {
        self.files
            .borrow()
            .contains_key(&normalize_resource_path(path))
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .borrow()
            .get(&normalize_resource_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        self.add_file(path, contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_resource_path() {
        assert_eq!(normalize_resource_path("main/a.go"), "/main/a.go");
        assert_eq!(normalize_resource_path("/main//./a.go"), "/main/a.go");
        assert_eq!(normalize_resource_path("\\main\\a.go"), "/main/a.go");
    }

    #[test]
    fn test_resource_extension() {
        assert_eq!(resource_extension("/main/level.collection"), Some("collection"));
        assert_eq!(resource_extension("/main.dir/file"), None);
        assert_eq!(resource_extension("/main/file."), None);
    }

    #[test]
    fn test_mock_file_system() {
        let fs = MockFileSystem::new();
        fs.add_file("main/a.go", "components {}");

        assert!(fs.exists("/main/a.go"));
        assert!(!fs.exists("/main/b.go"));
        assert_eq!(fs.read_to_string("/main/a.go").unwrap(), "components {}");

        fs.write("/main/b.go", b"").unwrap();
        assert!(fs.exists("/main/b.go"));
        assert!(fs.remove_file("/main/a.go"));
        assert!(fs.read("/main/a.go").is_err());
    }

    #[test]
    fn test_real_file_system_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());

        fs.write("/main/level.collection", b"name: \"level\"\n").unwrap();
        assert!(fs.exists("/main/level.collection"));
        assert_eq!(
            fs.read_to_string("main/level.collection").unwrap(),
            "name: \"level\"\n"
        );

        let on_disk = dir.path().join("main").join("level.collection");
        assert_eq!(
            fs.to_resource_path(&on_disk),
            Some("/main/level.collection".to_string())
        );
    }

    #[test]
    fn test_real_file_system_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());
        assert!(fs.resolve("../outside.go").is_err());
        assert!(!fs.exists("../outside.go"));
    }
}
