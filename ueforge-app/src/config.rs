//! Layered settings
//!
//! Later sources override earlier ones: built-in defaults, the user's
//! `settings.toml`, the project's `ueforge.toml`, then `UEFORGE_*`
//! environment variables. Command-line flags are applied on top by the
//! caller.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use ueforge_core::directory::Directory;

use crate::build::{
    default_install_root, get_current_platform, BuildConfig, StepPolicy, DEFAULT_EDITOR_IO_PORT,
};

pub const PROJECT_SETTINGS_FILE: &str = "ueforge.toml";
pub const ENV_PREFIX: &str = "UEFORGE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder holding `UE_<version>` launcher installs; used for the
    /// default engine path
    pub install_root: PathBuf,
    /// Platform passed to UBT and UAT
    pub platform: String,
    pub compile_configuration: BuildConfig,
    pub package_configuration: BuildConfig,
    /// Archive directory for packaging; `<project>/BuildOutput` when unset
    pub output_dir: Option<PathBuf>,
    pub editor_io_port: u16,
    /// What the compile pipeline does after a failed streamed step
    pub step_policy: StepPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            platform: get_current_platform().to_string(),
            compile_configuration: BuildConfig::Development,
            package_configuration: BuildConfig::Shipping,
            output_dir: None,
            editor_io_port: DEFAULT_EDITOR_IO_PORT,
            step_policy: StepPolicy::Continue,
        }
    }
}

impl Settings {
    /// Load settings for a project, reading the process environment
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_from(Directory::settings_file().as_deref(), project_dir, None)
    }

    /// Load from explicit sources. `env` replaces the process environment
    /// when given.
    pub fn load_from(
        user_file: Option<&Path>,
        project_dir: &Path,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(user_file) = user_file {
            builder = builder.add_source(File::from(user_file).format(FileFormat::Toml).required(false));
        }
        let settings = builder
            .add_source(
                File::from(project_dir.join(PROJECT_SETTINGS_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        tracing::debug!("loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Archive directory for packaging. A relative `output_dir` is taken
    /// from the project directory.
    pub fn output_dir_for(&self, project_dir: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => project_dir.join(dir),
            None => project_dir.join("BuildOutput"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    fn no_env() -> Option<Map<String, String>> {
        Some(Map::new())
    }

    #[test]
    fn test_defaults_without_sources() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from(None, temp.path(), no_env()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.output_dir_for(temp.path()), temp.path().join("BuildOutput"));
    }

    #[test]
    fn test_project_file_overrides_user_file() {
        let user = TempDir::new().unwrap();
        let user_file = user.path().join("settings.toml");
        fs::write(
            &user_file,
            "install_root = \"/mnt/engines\"\neditor_io_port = 40000\n",
        )
        .unwrap();

        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join(PROJECT_SETTINGS_FILE),
            "editor_io_port = 41000\npackage_configuration = \"Development\"\nstep_policy = \"abort\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&user_file), project.path(), no_env()).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/mnt/engines"));
        assert_eq!(settings.editor_io_port, 41000);
        assert_eq!(settings.package_configuration, BuildConfig::Development);
        assert_eq!(settings.step_policy, StepPolicy::Abort);
        assert_eq!(settings.compile_configuration, BuildConfig::Development);
    }

    #[test]
    fn test_environment_overrides_files() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join(PROJECT_SETTINGS_FILE),
            "output_dir = \"/builds/from-file\"\n",
        )
        .unwrap();

        let env: Map<String, String> = [
            ("UEFORGE_OUTPUT_DIR".to_string(), "/builds/from-env".to_string()),
            ("UEFORGE_EDITOR_IO_PORT".to_string(), "50000".to_string()),
        ]
        .into_iter()
        .collect();

        let settings = Settings::load_from(None, project.path(), Some(env)).unwrap();
        assert_eq!(settings.output_dir, Some(PathBuf::from("/builds/from-env")));
        assert_eq!(settings.editor_io_port, 50000);
    }

    #[test]
    fn test_relative_output_dir_is_under_project() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(PROJECT_SETTINGS_FILE), "output_dir = \"Archive\"\n").unwrap();

        let settings = Settings::load_from(None, project.path(), no_env()).unwrap();
        assert_eq!(settings.output_dir_for(project.path()), project.path().join("Archive"));
    }

    #[test]
    fn test_configuration_names_ignore_case() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join(PROJECT_SETTINGS_FILE),
            "package_configuration = \"shipping\"\n",
        )
        .unwrap();
        let env: Map<String, String> =
            [("UEFORGE_COMPILE_CONFIGURATION".to_string(), "debuggame".to_string())]
                .into_iter()
                .collect();

        let settings = Settings::load_from(None, project.path(), Some(env)).unwrap();
        assert_eq!(settings.package_configuration, BuildConfig::Shipping);
        assert_eq!(settings.compile_configuration, BuildConfig::DebugGame);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join(PROJECT_SETTINGS_FILE),
            "compile_configuration = \"Profile\"\n",
        )
        .unwrap();

        assert!(Settings::load_from(None, project.path(), no_env()).is_err());
    }
}
