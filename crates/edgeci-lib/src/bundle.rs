//! Proxy bundle packaging
//!
//! Bundles are zip archives of a proxy source directory. Packaging walks the
//! source tree; extraction unpacks into a destination and refuses entries
//! that would escape it.

use crate::error::{SyncError, SyncResult};
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Packs and unpacks proxy bundles
pub trait BundleCodec: Send + Sync {
    /// Zip the contents of `source_dir` into `staging_path` and return the archive bytes
    fn package(&self, source_dir: &Path, staging_path: &Path) -> SyncResult<Vec<u8>>;

    /// Unpack an archive into `dest_dir`, creating it if needed
    fn extract(&self, bundle: &[u8], dest_dir: &Path) -> SyncResult<()>;
}

/// Zip implementation of [`BundleCodec`]
#[derive(Debug, Clone, Default)]
pub struct ZipBundleCodec;

impl ZipBundleCodec {
    pub fn new() -> Self {
        Self
    }

    /// Collect every file and directory below `root`, sorted for stable archives
    fn collect_entries(root: &Path) -> SyncResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let listing = fs::read_dir(&dir).map_err(|e| SyncError::path_io("read", &dir, e))?;
            for entry in listing {
                let entry = entry.map_err(|e| SyncError::path_io("read", &dir, e))?;
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .map_err(|e| SyncError::path_io("inspect", &path, e))?;

                if file_type.is_dir() {
                    pending.push(path.clone());
                } else if file_type.is_symlink() && path.is_dir() {
                    // Linked directories are not followed
                    debug!(path = %path.display(), "Skipping symlinked directory");
                    continue;
                }
                entries.push(path);
            }
        }

        entries.sort();
        Ok(entries)
    }

    /// Archive name of `path` relative to `root`, always with forward slashes
    fn entry_name(root: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    fn write_archive(source_dir: &Path) -> SyncResult<Vec<u8>> {
        let zip_error = |e: zip::result::ZipError| {
            SyncError::local_io(
                format!("failed to package {}", source_dir.display()),
                std::io::Error::other(e),
            )
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for path in Self::collect_entries(source_dir)? {
                let Some(name) = Self::entry_name(source_dir, &path) else {
                    continue;
                };

                if path.is_dir() {
                    zip.add_directory(name, options).map_err(zip_error)?;
                } else {
                    let contents =
                        fs::read(&path).map_err(|e| SyncError::path_io("read", &path, e))?;
                    zip.start_file(name, options).map_err(zip_error)?;
                    zip.write_all(&contents)
                        .map_err(|e| SyncError::path_io("archive", &path, e))?;
                }
            }

            zip.finish().map_err(zip_error)?;
        }

        Ok(buffer.into_inner())
    }
}

impl BundleCodec for ZipBundleCodec {
    fn package(&self, source_dir: &Path, staging_path: &Path) -> SyncResult<Vec<u8>> {
        if !source_dir.is_dir() {
            return Err(SyncError::path_io(
                "package",
                source_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory missing"),
            ));
        }

        if staging_path.exists() {
            fs::remove_file(staging_path)
                .map_err(|e| SyncError::path_io("remove", staging_path, e))?;
        }

        let bytes = Self::write_archive(source_dir)?;
        fs::write(staging_path, &bytes).map_err(|e| SyncError::path_io("write", staging_path, e))?;

        debug!(
            source = %source_dir.display(),
            staging = %staging_path.display(),
            size = bytes.len(),
            "Packaged proxy bundle"
        );
        Ok(bytes)
    }

    fn extract(&self, bundle: &[u8], dest_dir: &Path) -> SyncResult<()> {
        let zip_error = |e: zip::result::ZipError| {
            SyncError::local_io(
                format!("failed to extract bundle into {}", dest_dir.display()),
                std::io::Error::other(e),
            )
        };

        fs::create_dir_all(dest_dir).map_err(|e| SyncError::path_io("create", dest_dir, e))?;

        let mut archive = ZipArchive::new(Cursor::new(bundle)).map_err(zip_error)?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(zip_error)?;

            let outpath = match file.enclosed_name() {
                Some(path) => dest_dir.join(path),
                None => {
                    debug!(entry = %file.name(), "Skipping bundle entry outside destination");
                    continue;
                }
            };

            if file.is_dir() {
                fs::create_dir_all(&outpath)
                    .map_err(|e| SyncError::path_io("create", &outpath, e))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| SyncError::path_io("create", parent, e))?;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)
                .map_err(|e| SyncError::path_io("read bundle entry for", &outpath, e))?;

            let mut outfile =
                File::create(&outpath).map_err(|e| SyncError::path_io("create", &outpath, e))?;
            outfile
                .write_all(&contents)
                .map_err(|e| SyncError::path_io("write", &outpath, e))?;
        }

        debug!(dest = %dest_dir.display(), entries = archive.len(), "Extracted proxy bundle");
        Ok(())
    }
}

/// Remove a previous extraction target; a missing directory is not an error
pub fn clear_directory(path: &Path) -> SyncResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::path_io("remove", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn proxy_source(root: &Path) -> PathBuf {
        let source = root.join("orders-api");
        write(
            &source.join("apiproxy/orders-api.xml"),
            "<APIProxy name=\"orders-api\"/>",
        );
        write(
            &source.join("apiproxy/policies/quota.xml"),
            "<Quota name=\"quota\"/>",
        );
        fs::create_dir_all(source.join("apiproxy/resources")).unwrap();
        source
    }

    #[test]
    fn test_package_then_extract_reproduces_tree() {
        let temp = TempDir::new().unwrap();
        let source = proxy_source(temp.path());
        let staging = temp.path().join("orders-api.zip");
        let codec = ZipBundleCodec::new();

        let bytes = codec.package(&source, &staging).unwrap();
        assert!(staging.exists());
        assert_eq!(fs::read(&staging).unwrap(), bytes);

        let dest = temp.path().join("out");
        codec.extract(&bytes, &dest).unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("apiproxy/orders-api.xml")).unwrap(),
            "<APIProxy name=\"orders-api\"/>"
        );
        assert_eq!(
            fs::read_to_string(dest.join("apiproxy/policies/quota.xml")).unwrap(),
            "<Quota name=\"quota\"/>"
        );
        assert!(dest.join("apiproxy/resources").is_dir());
    }

    #[test]
    fn test_package_replaces_stale_staging_archive() {
        let temp = TempDir::new().unwrap();
        let source = proxy_source(temp.path());
        let staging = temp.path().join("orders-api.zip");
        fs::write(&staging, b"stale").unwrap();

        let bytes = ZipBundleCodec::new().package(&source, &staging).unwrap();
        assert_ne!(bytes, b"stale");
        assert_eq!(fs::read(&staging).unwrap(), bytes);
    }

    #[cfg(unix)]
    #[test]
    fn test_package_does_not_follow_directory_links() {
        let temp = TempDir::new().unwrap();
        let source = proxy_source(temp.path());
        std::os::unix::fs::symlink(&source, source.join("apiproxy/loop")).unwrap();
        std::os::unix::fs::symlink(
            source.join("apiproxy/orders-api.xml"),
            source.join("apiproxy/alias.xml"),
        )
        .unwrap();

        let bytes = ZipBundleCodec::new()
            .package(&source, &temp.path().join("orders-api.zip"))
            .unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"apiproxy/alias.xml"));
        assert!(!names.iter().any(|n| n.starts_with("apiproxy/loop")));
    }

    #[test]
    fn test_package_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let result = ZipBundleCodec::new()
            .package(&temp.path().join("missing"), &temp.path().join("missing.zip"));

        assert!(matches!(result, Err(SyncError::LocalIo { .. })));
    }

    #[test]
    fn test_extract_rejects_invalid_archive() {
        let temp = TempDir::new().unwrap();
        let result = ZipBundleCodec::new().extract(b"not a zip", temp.path());

        assert!(matches!(result, Err(SyncError::LocalIo { .. })));
    }

    #[test]
    fn test_extract_skips_escaping_entries() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();
            zip.start_file("../escape.txt", options).unwrap();
            zip.write_all(b"nope").unwrap();
            zip.start_file("apiproxy/ok.xml", options).unwrap();
            zip.write_all(b"ok").unwrap();
            zip.finish().unwrap();
        }

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        ZipBundleCodec::new()
            .extract(&buf.into_inner(), &dest)
            .unwrap();

        assert!(dest.join("apiproxy/ok.xml").exists());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_clear_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("orders-api");
        write(&target.join("apiproxy/a.xml"), "a");

        clear_directory(&target).unwrap();
        assert!(!target.exists());

        // Clearing twice is fine
        clear_directory(&target).unwrap();
    }
}
