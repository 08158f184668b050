//! Zip-format directory archiving

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::Archiver;
use crate::error::{Error, Result};

/// Archiver producing a zip file with deflate compression.
///
/// Entry names are rooted at the source directory's own name, so an archive
/// of `/data/photos` contains `photos/...` entries and unpacks into a single
/// top-level folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn make_archive(&self, source_dir: &Path, dest: &Path) -> Result<()> {
        if !source_dir.is_dir() {
            return Err(Error::ArchiveCreation(format!(
                "Not a directory: {}",
                source_dir.display()
            )));
        }

        let root_name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());

        let file = File::create(dest)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let mut entries = 0usize;
        for entry in WalkDir::new(source_dir).follow_links(false) {
            let entry = entry.map_err(|e| Error::ArchiveCreation(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| Error::ArchiveCreation(e.to_string()))?;

            // Always forward slashes inside the archive
            let mut name = root_name.clone();
            for component in relative.components() {
                name.push('/');
                name.push_str(&component.as_os_str().to_string_lossy());
            }

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)
                    .map_err(|e| Error::ArchiveCreation(e.to_string()))?;
            } else if entry.file_type().is_file() {
                zip.start_file(name, options)
                    .map_err(|e| Error::ArchiveCreation(e.to_string()))?;
                let mut f = File::open(entry.path())?;
                io::copy(&mut f, &mut zip)?;
                entries += 1;
            }
            // Symlinks and special files are skipped
        }

        zip.finish()
            .map_err(|e| Error::ArchiveCreation(e.to_string()))?;

        debug!(
            source = %source_dir.display(),
            files = entries,
            "Built zip archive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("nested/b.txt"), b"beta").unwrap();
        dir
    }

    #[test]
    fn test_archives_directory_tree() {
        let dir = sample_tree();
        let dest = dir.path().join("out.zip");

        ZipArchiver
            .make_archive(&dir.path().join("data"), &dest)
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "data/a.txt"));
        assert!(names.iter().any(|n| n == "data/nested/b.txt"));

        let mut contents = String::new();
        archive
            .by_name("data/nested/b.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "beta");
    }

    #[test]
    fn test_empty_directory_archives() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty");
        fs::create_dir(&root).unwrap();
        let dest = dir.path().join("out.zip");

        ZipArchiver.make_archive(&root, &dest).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn test_missing_source_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = ZipArchiver.make_archive(&dir.path().join("nope"), &dir.path().join("o.zip"));
        assert!(matches!(result, Err(Error::ArchiveCreation(_))));
    }
}
