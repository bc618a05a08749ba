use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Sub-directory of a package's metadata root that holds generated artifacts.
pub const ARTIFACT_SUBDIR: &str = "kiln_artifacts";

/// Declaration group for artifact builders.
pub const ARTIFACTS_GROUP: &str = "kiln.artifacts";

/// Declaration group for command runtimes.
pub const RUNTIME_GROUP: &str = "kiln.runtime";

/// Returns the kiln home directory, or None if the user's home cannot be resolved.
pub fn try_kiln_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("KILN_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".kiln"))
}

/// Default package root: ~/.kiln/packages
pub fn packages_path() -> Option<PathBuf> {
    try_kiln_home().map(|h| h.join("packages"))
}

/// Where a package's artifact named `name` is written.
pub fn artifact_path(metadata_root: &Path, name: &str) -> PathBuf {
    metadata_root.join(ARTIFACT_SUBDIR).join(name)
}

/// Whether artifact file names should be compared case-insensitively on
/// this platform.
pub fn platform_case_insensitive() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

/// Runtime settings collected from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directories scanned for packages, in priority order.
    pub search_paths: Vec<PathBuf>,
    /// Fold case when comparing artifact paths.
    pub case_insensitive: bool,
}

impl Settings {
    /// Load settings from `KILN_PATH`, `KILN_HOME` and `KILN_CASE_INSENSITIVE`.
    pub fn from_env() -> Self {
        let search_paths = match std::env::var_os("KILN_PATH") {
            Some(raw) => std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            None => packages_path().into_iter().collect(),
        };

        let case_insensitive = std::env::var("KILN_CASE_INSENSITIVE")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or_else(platform_case_insensitive);

        Self {
            search_paths,
            case_insensitive,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_layout() {
        let path = artifact_path(Path::new("/site/lib1-1.0.kiln-info"), "lib1.lib.js");
        assert_eq!(
            path,
            Path::new("/site/lib1-1.0.kiln-info/kiln_artifacts/lib1.lib.js")
        );
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
