use std::path::PathBuf;

#[cfg(not(feature = "portable"))]
use directories::ProjectDirs;

pub struct Directory {}

impl Directory {
    #[cfg(not(feature = "portable"))]
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "ueforge", "ueforge")
    }

    #[cfg(feature = "portable")]
    fn portable_dir() -> Option<PathBuf> {
        let dir = std::env::current_exe().ok()?.parent()?.join("ueforge-data");
        Some(dir)
    }

    /// Directory holding the user-level `settings.toml`.
    /// Not created here; a missing file simply means "use defaults".
    pub fn config_directory() -> Option<PathBuf> {
        #[cfg(feature = "portable")]
        {
            Self::portable_dir().map(|dir| dir.join("config"))
        }

        #[cfg(not(feature = "portable"))]
        {
            Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
        }
    }

    pub fn settings_file() -> Option<PathBuf> {
        Self::config_directory().map(|dir| dir.join("settings.toml"))
    }
}
