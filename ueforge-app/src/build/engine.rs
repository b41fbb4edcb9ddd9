//! Engine discovery and path resolution

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use ueforge_core::log::LogChannel;

use super::error::BuildError;
use super::types::{EngineSource, InstalledEngine, ResolvedEngine};

#[cfg(target_os = "windows")]
use winreg::enums::*;
#[cfg(target_os = "windows")]
use winreg::RegKey;

/// Environment variable that short-circuits engine resolution
pub const ENGINE_PATH_ENV: &str = "UNREAL_ENGINE_PATH";

/// One installation known to the platform's install registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Version ("5.3") or GUID for source builds
    pub id: String,
    pub path: PathBuf,
    pub is_source_build: bool,
}

/// Platform lookup of installed engines, keyed by `EngineAssociation`.
///
/// Implementations report what the platform recorded; whether the path
/// still exists is decided by the caller.
pub trait InstallRegistry: Send + Sync {
    /// Human-readable name used in log lines
    fn name(&self) -> &'static str;

    /// Every installation the registry knows about
    fn entries(&self) -> Vec<RegistryEntry>;

    /// Installation directory recorded for `version`
    fn lookup(&self, version: &str) -> Option<PathBuf> {
        self.entries()
            .into_iter()
            .find(|entry| entry.id == version)
            .map(|entry| entry.path)
    }
}

/// Epic Games Launcher registrations (HKLM) and source builds (HKCU)
#[cfg(target_os = "windows")]
pub struct WindowsRegistry;

#[cfg(target_os = "windows")]
impl InstallRegistry for WindowsRegistry {
    fn name(&self) -> &'static str {
        "Windows registry"
    }

    fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries = Vec::new();

        if let Ok(hklm) = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey("SOFTWARE\\EpicGames\\Unreal Engine")
        {
            for key_name in hklm.enum_keys().filter_map(|k| k.ok()) {
                // Skip non-version keys
                if !key_name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    continue;
                }
                if let Ok(path) = hklm
                    .open_subkey(&key_name)
                    .and_then(|subkey| subkey.get_value::<String, _>("InstalledDirectory"))
                {
                    entries.push(RegistryEntry {
                        id: key_name,
                        path: PathBuf::from(path),
                        is_source_build: false,
                    });
                }
            }
        }

        if let Ok(hkcu) = RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey("SOFTWARE\\Epic Games\\Unreal Engine\\Builds")
        {
            for (name, _value) in hkcu.enum_values().filter_map(|v| v.ok()) {
                if let Ok(path) = hkcu.get_value::<String, _>(&name) {
                    entries.push(RegistryEntry {
                        id: name,
                        path: PathBuf::from(path),
                        is_source_build: true,
                    });
                }
            }
        }

        entries
    }

    fn lookup(&self, version: &str) -> Option<PathBuf> {
        if let Ok(key) = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey(format!("SOFTWARE\\EpicGames\\Unreal Engine\\{}", version))
        {
            if let Ok(path) = key.get_value::<String, _>("InstalledDirectory") {
                return Some(PathBuf::from(path));
            }
        }

        // GUID associations point at source builds
        RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey("SOFTWARE\\Epic Games\\Unreal Engine\\Builds")
            .and_then(|key| key.get_value::<String, _>(version))
            .ok()
            .map(PathBuf::from)
    }
}

/// `LauncherInstalled.dat` written by the Epic Games Launcher
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LauncherInstalled {
    #[serde(default)]
    installation_list: Vec<LauncherInstallation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LauncherInstallation {
    install_location: String,
    app_name: String,
}

/// Launcher manifest plus conventional install folders, for hosts
/// without a registry
pub struct LauncherManifest {
    manifest: PathBuf,
    /// (directory to scan, folder prefix, holds source builds)
    search_dirs: Vec<(PathBuf, &'static str, bool)>,
}

impl LauncherManifest {
    pub fn new(manifest: PathBuf) -> Self {
        Self {
            manifest,
            search_dirs: Vec::new(),
        }
    }

    /// Also treat `<dir>/<prefix><version>` folders as installations
    pub fn with_search_dir(mut self, dir: PathBuf, prefix: &'static str, source: bool) -> Self {
        self.search_dirs.push((dir, prefix, source));
        self
    }

    fn manifest_entries(&self) -> Vec<RegistryEntry> {
        let Ok(content) = fs::read_to_string(&self.manifest) else {
            return Vec::new();
        };
        match serde_json::from_str::<LauncherInstalled>(&content) {
            Ok(installed) => installed
                .installation_list
                .into_iter()
                .filter_map(|item| {
                    let id = item.app_name.strip_prefix("UE_")?.to_string();
                    Some(RegistryEntry {
                        id,
                        path: PathBuf::from(item.install_location),
                        is_source_build: false,
                    })
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", self.manifest.display(), e);
                Vec::new()
            }
        }
    }

    fn folder_entries(&self) -> Vec<RegistryEntry> {
        let mut entries = Vec::new();
        for (dir, prefix, is_source_build) in &self.search_dirs {
            let Ok(read) = fs::read_dir(dir) else {
                continue;
            };
            for entry in read.filter_map(|e| e.ok()) {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(id) = name.strip_prefix(prefix) {
                    if path.is_dir() && !id.is_empty() {
                        entries.push(RegistryEntry {
                            id: id.to_string(),
                            path,
                            is_source_build: *is_source_build,
                        });
                    }
                }
            }
        }
        entries
    }
}

impl InstallRegistry for LauncherManifest {
    fn name(&self) -> &'static str {
        "launcher manifest"
    }

    fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries = self.manifest_entries();
        for entry in self.folder_entries() {
            if !entries.iter().any(|e| e.path == entry.path) {
                entries.push(entry);
            }
        }
        entries
    }
}

/// Install registry for the current host
pub fn platform_registry() -> Box<dyn InstallRegistry> {
    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsRegistry)
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        Box::new(
            LauncherManifest::new(
                home.join("Library/Application Support/Epic/UnrealEngineLauncher/LauncherInstalled.dat"),
            )
            .with_search_dir(PathBuf::from("/Users/Shared/Epic Games"), "UE_", false)
            .with_search_dir(PathBuf::from("/Applications/Epic Games"), "UE_", false),
        )
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        Box::new(
            LauncherManifest::new(
                home.join(".config/Epic/UnrealEngineLauncher/LauncherInstalled.dat"),
            )
            .with_search_dir(home.clone(), "UnrealEngine-", true)
            .with_search_dir(home.join("Epic Games"), "UE_", false),
        )
    }
}

/// Folder that holds launcher installs named `UE_<version>`
pub fn default_install_root() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(r"C:\Program Files\Epic Games")
    }

    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Users/Shared/Epic Games")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join("Epic Games")
    }
}

/// Ordered fallback chain: environment override, install registry, default
pub struct EngineResolver {
    env_override: Option<PathBuf>,
    registry: Box<dyn InstallRegistry>,
    install_root: PathBuf,
}

impl EngineResolver {
    pub fn new(registry: Box<dyn InstallRegistry>, install_root: PathBuf) -> Self {
        Self {
            env_override: None,
            registry,
            install_root,
        }
    }

    /// Resolver for this host, honouring `UNREAL_ENGINE_PATH`
    pub fn from_env(install_root: PathBuf) -> Self {
        let env_override = std::env::var_os(ENGINE_PATH_ENV).map(PathBuf::from);
        Self::new(platform_registry(), install_root).with_override(env_override)
    }

    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.env_override = path.filter(|p| !p.as_os_str().is_empty());
        self
    }

    /// Pick the engine root for `version`.
    ///
    /// The override and the registry result are trusted only as described:
    /// the override verbatim, the registry only if its path exists. The
    /// synthesized default is returned unchecked; callers verify the tool
    /// files they need underneath it.
    pub fn resolve(&self, version: &str, log: &LogChannel) -> ResolvedEngine {
        if let Some(path) = &self.env_override {
            log.enqueue(format!("Path defined by environment variable: {}", path.display()));
            return ResolvedEngine {
                root: path.clone(),
                source: EngineSource::Environment,
            };
        }

        match self.registry.lookup(version) {
            Some(path) if path.exists() => {
                log.enqueue(format!("Path obtained from registry: {}", path.display()));
                return ResolvedEngine {
                    root: path,
                    source: EngineSource::Registry,
                };
            }
            Some(path) => log.enqueue(format!(
                "Unreal Engine {} found, but directory '{}' does not exist.",
                version,
                path.display()
            )),
            None => log.enqueue(format!(
                "Unreal Engine {} not found in {}.",
                version,
                self.registry.name()
            )),
        }

        let root = self.install_root.join(format!("UE_{}", version));
        log.enqueue(format!("Using default path: {}", root.display()));
        ResolvedEngine {
            root,
            source: EngineSource::Default,
        }
    }

    /// Discover all installed Unreal Engine versions, newest first
    pub fn list_installed_engines(&self) -> Vec<InstalledEngine> {
        let mut engines: Vec<InstalledEngine> = self
            .registry
            .entries()
            .into_iter()
            .filter(|entry| entry.path.exists())
            .map(|entry| {
                let version = get_engine_version(&entry.path);
                let display_name = match (&version, entry.is_source_build) {
                    (Some(v), true) => format!("UE {} (Source)", v),
                    (Some(v), false) => format!("UE {}", v),
                    (None, true) => "UE Source Build".to_string(),
                    (None, false) => format!("UE {}", entry.id),
                };
                InstalledEngine {
                    id: entry.id,
                    display_name,
                    path: entry.path,
                    version,
                    is_source_build: entry.is_source_build,
                    is_default: false,
                }
            })
            .collect();

        engines.sort_by(|a, b| {
            let va = version_key(a.version.as_deref().unwrap_or(&a.id));
            let vb = version_key(b.version.as_deref().unwrap_or(&b.id));
            vb.cmp(&va)
        });

        if let Some(first) = engines.first_mut() {
            first.is_default = true;
        }

        engines
    }
}

/// Numeric components of a dotted version, so "5.10" sorts after "5.9"
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Get engine version from Build.version file
pub fn get_engine_version(engine_path: &Path) -> Option<String> {
    let version_file = engine_path.join("Engine").join("Build").join("Build.version");
    let content = fs::read_to_string(&version_file).ok()?;
    let json = serde_json::from_str::<serde_json::Value>(&content).ok()?;
    let major = json.get("MajorVersion")?.as_u64()?;
    let minor = json.get("MinorVersion")?.as_u64()?;
    let patch = json.get("PatchVersion")?.as_u64()?;
    Some(format!("{}.{}.{}", major, minor, patch))
}

/// Tool locations under a resolved engine root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInstallation {
    pub root: PathBuf,
    pub source: EngineSource,
    /// UnrealBuildTool.dll, run through `dotnet`
    pub build_tool: PathBuf,
    /// Build script that also regenerates project files
    pub project_files_script: PathBuf,
    /// RunUAT script driving BuildCookRun
    pub automation_script: PathBuf,
    /// Commandlet editor used for cooking
    pub editor_cmd: PathBuf,
}

impl EngineInstallation {
    pub fn new(resolved: ResolvedEngine) -> Self {
        let root = resolved.root;
        Self {
            build_tool: get_build_tool(&root),
            project_files_script: get_build_script(&root),
            automation_script: get_automation_script(&root),
            editor_cmd: get_editor_cmd_executable(&root),
            source: resolved.source,
            root,
        }
    }

    /// Fail with `ToolNotFound` unless `path` exists
    pub fn require(tool: &'static str, path: &Path) -> Result<(), BuildError> {
        if path.exists() {
            Ok(())
        } else {
            Err(BuildError::ToolNotFound {
                tool,
                path: path.to_path_buf(),
            })
        }
    }
}

/// Get the UnrealBuildTool assembly for the engine
pub fn get_build_tool(engine_path: &Path) -> PathBuf {
    engine_path
        .join("Engine")
        .join("Binaries")
        .join("DotNET")
        .join("UnrealBuildTool")
        .join("UnrealBuildTool.dll")
}

/// Get the build script path for the engine
pub fn get_build_script(engine_path: &Path) -> PathBuf {
    engine_path
        .join("Engine")
        .join("Build")
        .join("BatchFiles")
        .join(if cfg!(windows) {
            "Build.bat"
        } else if cfg!(target_os = "macos") {
            "Mac/Build.sh"
        } else {
            "Linux/Build.sh"
        })
}

/// Get the RunUAT script path for the engine
pub fn get_automation_script(engine_path: &Path) -> PathBuf {
    engine_path
        .join("Engine")
        .join("Build")
        .join("BatchFiles")
        .join(if cfg!(windows) { "RunUAT.bat" } else { "RunUAT.sh" })
}

/// Get the commandlet editor executable used by BuildCookRun
pub fn get_editor_cmd_executable(engine_path: &Path) -> PathBuf {
    engine_path
        .join("Engine")
        .join("Binaries")
        .join(get_current_platform())
        .join(if cfg!(windows) {
            "UnrealEditor-Cmd.exe"
        } else {
            "UnrealEditor-Cmd"
        })
}

/// Get current platform name for UE
pub fn get_current_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "Win64"
    } else if cfg!(target_os = "macos") {
        "Mac"
    } else {
        "Linux"
    }
}
