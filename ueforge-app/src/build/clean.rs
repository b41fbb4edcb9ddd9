//! Removal of generated build and IDE artifacts
//!
//! Cleaning is best effort: every deletion is attempted on its own, a
//! failure is logged with its path, and the pass carries on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ueforge_core::log::LogChannel;

/// Folders removed from the project root
pub const ROOT_FOLDERS: &[&str] = &[".vs", ".idea", "Binaries", "DerivedDataCache", "Intermediate", "Saved"];

/// Folders removed at every level below `Plugins/`
pub const PLUGIN_FOLDERS: &[&str] = &[".vs", "Binaries", "DerivedDataCache", "Intermediate", "Saved"];

pub const PLUGINS_DIR: &str = "Plugins";

/// Files removed wherever the folder allow-list applies
pub fn artifact_files(project_name: &str) -> Vec<String> {
    vec![format!("{}.sln", project_name), ".vsconfig".to_string()]
}

/// Filesystem operations used by the cleaner
pub trait CleanerFs {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

pub struct RealFs;

impl CleanerFs for RealFs {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// What a cleaning pass did. Pipelines ignore it; cleaning never fails them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

pub struct ArtifactCleaner<F: CleanerFs = RealFs> {
    fs: F,
    log: LogChannel,
}

impl ArtifactCleaner<RealFs> {
    pub fn new(log: LogChannel) -> Self {
        Self { fs: RealFs, log }
    }
}

impl<F: CleanerFs> ArtifactCleaner<F> {
    pub fn with_fs(fs: F, log: LogChannel) -> Self {
        Self { fs, log }
    }

    /// Clean the project root, then every directory under `Plugins/`
    pub fn clean(&self, project_root: &Path, project_name: &str) -> CleanReport {
        let mut report = CleanReport::default();
        let files = artifact_files(project_name);

        self.log.enqueue("Cleaning project root folders...");
        for folder in ROOT_FOLDERS {
            self.remove_folder(&project_root.join(folder), &mut report);
        }

        self.log.enqueue("Cleaning project root files...");
        for file in &files {
            self.remove_file(&project_root.join(file), &mut report);
        }

        let plugins = project_root.join(PLUGINS_DIR);
        if is_symlink(&plugins) {
            self.log.enqueue(format!(
                "Skipping plugins folder {}: symbolic links are not followed.",
                plugins.display()
            ));
        } else if is_real_dir(&plugins) {
            self.log.enqueue("Cleaning plugin folders and files...");
            self.clean_plugin_dir(&plugins, &files, &mut report);
        } else {
            self.log
                .enqueue(format!("Plugins folder not found in {}.", project_root.display()));
        }

        self.log.enqueue("Cleanup completed successfully!");
        tracing::debug!(
            "cleaned {}: {} removed, {} failed",
            project_root.display(),
            report.removed.len(),
            report.failed.len()
        );
        report
    }

    fn clean_plugin_dir(&self, dir: &Path, files: &[String], report: &mut CleanReport) {
        for folder in PLUGIN_FOLDERS {
            self.remove_folder(&dir.join(folder), report);
        }
        for file in files {
            self.remove_file(&dir.join(file), report);
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.log
                    .enqueue(format!("Error reading folder {}: {}", dir.display(), e));
                return;
            }
        };

        let mut children: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_real_dir(path))
            .collect();
        children.sort();

        for child in children {
            self.clean_plugin_dir(&child, files, report);
        }
    }

    fn remove_folder(&self, path: &Path, report: &mut CleanReport) {
        if !is_real_dir(path) {
            return;
        }
        match self.fs.remove_dir_all(path) {
            Ok(()) => {
                self.log.enqueue(format!("Removed folder: {}", path.display()));
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!("failed to remove {}: {}", path.display(), e);
                self.log
                    .enqueue(format!("Error removing folder {}: {}", path.display(), e));
                report.failed.push(path.to_path_buf());
            }
        }
    }

    fn remove_file(&self, path: &Path, report: &mut CleanReport) {
        if !path.is_file() {
            return;
        }
        match self.fs.remove_file(path) {
            Ok(()) => {
                self.log.enqueue(format!("Removed file: {}", path.display()));
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!("failed to remove {}: {}", path.display(), e);
                self.log
                    .enqueue(format!("Error removing file {}: {}", path.display(), e));
                report.failed.push(path.to_path_buf());
            }
        }
    }
}

/// A directory that is not reached through a symlink; links are never
/// followed so cleaning stays inside the project tree
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Delegates to the real filesystem except for one path that always fails
    struct FailingFs {
        fail_on: PathBuf,
    }

    impl CleanerFs for FailingFs {
        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            if path == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            fs::remove_dir_all(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            if path == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            fs::remove_file(path)
        }
    }

    fn project_fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Binaries").join("Win64")).unwrap();
        fs::create_dir_all(root.join("Content").join("Maps")).unwrap();
        fs::create_dir_all(root.join("Source")).unwrap();
        fs::write(root.join("Game.sln"), "").unwrap();
        fs::write(root.join(".vsconfig"), "").unwrap();
        fs::write(root.join("Game.uproject"), "{}").unwrap();

        let plugin = root.join("Plugins").join("Weapons");
        fs::create_dir_all(plugin.join("Intermediate").join("Build")).unwrap();
        fs::create_dir_all(plugin.join("Source").join("Weapons")).unwrap();
        let nested = plugin.join("Source").join("ThirdParty");
        fs::create_dir_all(nested.join("Binaries")).unwrap();
        fs::write(nested.join("Game.sln"), "").unwrap();
        temp
    }

    #[test]
    fn test_clean_root_and_plugins() {
        let temp = project_fixture();
        let root = temp.path();
        let log = LogChannel::new();

        let report = ArtifactCleaner::new(log.clone()).clean(root, "Game");

        assert!(!root.join("Binaries").exists());
        assert!(!root.join("Game.sln").exists());
        assert!(!root.join(".vsconfig").exists());
        assert!(root.join("Content").join("Maps").exists());
        assert!(root.join("Source").exists());
        assert!(root.join("Game.uproject").exists());

        let plugin = root.join("Plugins").join("Weapons");
        assert!(!plugin.join("Intermediate").exists());
        assert!(plugin.join("Source").join("Weapons").exists());
        let nested = plugin.join("Source").join("ThirdParty");
        assert!(!nested.join("Binaries").exists());
        assert!(!nested.join("Game.sln").exists());
        assert!(nested.exists());

        assert_eq!(report.removed.len(), 6);
        assert!(report.failed.is_empty());
        let lines = log.drain_all();
        assert_eq!(lines.last().map(String::as_str), Some("Cleanup completed successfully!"));
    }

    #[test]
    fn test_failed_deletion_does_not_stop_pass() {
        let temp = project_fixture();
        let root = temp.path();
        let fail_on = root.join("Binaries");
        let log = LogChannel::new();

        let cleaner = ArtifactCleaner::with_fs(FailingFs { fail_on: fail_on.clone() }, log.clone());
        let report = cleaner.clean(root, "Game");

        assert!(fail_on.exists());
        assert_eq!(report.failed, vec![fail_on.clone()]);
        assert!(!root.join("Game.sln").exists());
        assert!(!root.join("Plugins").join("Weapons").join("Intermediate").exists());

        let lines = log.drain_all();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Error removing folder") && l.contains("locked")));
        assert_eq!(lines.last().map(String::as_str), Some("Cleanup completed successfully!"));
    }

    #[test]
    fn test_missing_plugins_and_artifacts_are_silent() {
        let temp = TempDir::new().unwrap();
        let log = LogChannel::new();

        let report = ArtifactCleaner::new(log.clone()).clean(temp.path(), "Empty");

        assert_eq!(report, CleanReport::default());
        let lines = log.drain_all();
        assert!(lines.iter().any(|l| l.starts_with("Plugins folder not found")));
        assert!(!lines.iter().any(|l| l.starts_with("Error")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_plugin_dirs_are_not_followed() {
        let outside = TempDir::new().unwrap();
        fs::create_dir_all(outside.path().join("Saved")).unwrap();

        let temp = TempDir::new().unwrap();
        let plugins = temp.path().join("Plugins");
        fs::create_dir_all(&plugins).unwrap();
        std::os::unix::fs::symlink(outside.path(), plugins.join("Linked")).unwrap();

        ArtifactCleaner::new(LogChannel::new()).clean(temp.path(), "Game");

        assert!(outside.path().join("Saved").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_plugins_root_is_reported_as_skipped() {
        let outside = TempDir::new().unwrap();
        fs::create_dir_all(outside.path().join("Tool").join("Binaries")).unwrap();

        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("Plugins")).unwrap();
        let log = LogChannel::new();

        ArtifactCleaner::new(log.clone()).clean(temp.path(), "Game");

        assert!(outside.path().join("Tool").join("Binaries").exists());
        let lines = log.drain_all();
        assert!(lines.iter().any(|l| l.starts_with("Skipping plugins folder")));
        assert!(!lines.iter().any(|l| l.starts_with("Plugins folder not found")));
    }
}
