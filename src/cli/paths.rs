use crate::error::{Result, WhisperError};
use crate::metadata::MAX_FILENAME_LEN;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub(crate) fn require_regular_file(path: &Path, role: &str) -> Result<()> {
    if !path.exists() {
        return Err(WhisperError::Path(format!(
            "{} not found: {}",
            role,
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(WhisperError::Path(format!(
            "{} must be a regular file: {}",
            role,
            path.display()
        )));
    }
    Ok(())
}

pub(crate) fn require_directory(path: &Path, role: &str) -> Result<()> {
    if !path.exists() {
        return Err(WhisperError::Path(format!(
            "{} does not exist: {}",
            role,
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(WhisperError::Path(format!(
            "{} is not a directory: {}",
            role,
            path.display()
        )));
    }
    Ok(())
}

pub(crate) fn require_absent(path: &Path, role: &str) -> Result<()> {
    if path.exists() {
        return Err(WhisperError::Path(format!(
            "{} already exists: {}",
            role,
            path.display()
        )));
    }
    Ok(())
}

/// Best-effort absolute form of a path, which need not exist yet
fn identity(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Every path must name a different file
pub(crate) fn require_distinct(paths: &[(&Path, &str)]) -> Result<()> {
    let resolved: Vec<PathBuf> = paths.iter().map(|(p, _)| identity(p)).collect();
    for i in 0..resolved.len() {
        for j in (i + 1)..resolved.len() {
            if resolved[i] == resolved[j] {
                return Err(WhisperError::Path(format!(
                    "{} and {} must be different files ({})",
                    paths[i].1,
                    paths[j].1,
                    paths[i].0.display()
                )));
            }
        }
    }
    Ok(())
}

/// Name recorded for the payload: its final path component
pub(crate) fn payload_file_name(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            WhisperError::Path(format!(
                "payload name is not valid UTF-8: {}",
                path.display()
            ))
        })?;
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return Err(WhisperError::Path(format!(
            "payload filename must be 1 to {} bytes long, got {}",
            MAX_FILENAME_LEN,
            name.len()
        )));
    }
    Ok(name.to_string())
}

/// Create a file that must not exist yet
pub(crate) fn create_new(path: &Path, role: &str) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => WhisperError::Path(format!(
                "{} already exists: {}",
                role,
                path.display()
            )),
            _ => WhisperError::Io(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_regular_file_checks() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.wav");
        assert!(require_regular_file(&file, "input").is_err());
        std::fs::write(&file, b"x").unwrap();
        assert!(require_regular_file(&file, "input").is_ok());
        assert!(require_regular_file(dir.path(), "input").is_err());
        assert!(require_directory(dir.path(), "output").is_ok());
        assert!(require_directory(&file, "output").is_err());
        assert!(require_absent(&file, "output").is_err());
    }

    #[test]
    fn test_distinct_paths() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.wav");
        std::fs::write(&a, b"x").unwrap();
        let dotted = dir.path().join(".").join("a.wav");
        let b = dir.path().join("b.wav");

        assert!(require_distinct(&[(a.as_path(), "input"), (b.as_path(), "output")]).is_ok());
        let err =
            require_distinct(&[(a.as_path(), "input"), (dotted.as_path(), "payload")]).unwrap_err();
        assert!(err.to_string().contains("input and payload"));
    }

    #[test]
    fn test_payload_file_name() {
        assert_eq!(
            payload_file_name(Path::new("/tmp/dir/notes.txt")).unwrap(),
            "notes.txt"
        );
        let long = "n".repeat(MAX_FILENAME_LEN + 1);
        assert!(payload_file_name(Path::new(&long)).is_err());
        assert!(payload_file_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_create_new_refuses_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        create_new(&path, "output").unwrap();
        assert!(matches!(
            create_new(&path, "output"),
            Err(WhisperError::Path(_))
        ));
    }
}
