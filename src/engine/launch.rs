//! Engine launch options and argument assembly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Flags always passed to the browser. They make headless rendering work in
/// containers and stop the disk cache from growing across renders.
pub const FIXED_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-web-security",
    "--disable-dev-shm-usage",
    "--disable-cache",
    "--disable-application-cache",
    "--disk-cache-size=0",
    "--aggressive-cache-discard",
];

/// Default timeout for individual DevTools requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_DATA_DIR_FLAG: &str = "--user-data-dir";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct LaunchOptions {
    /// Browser binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Extra browser flags. Flags that collide with [`FIXED_ARGS`] are dropped.
    pub args: Vec<String>,
    /// Persistent profile directory. Never removed at shutdown.
    pub user_data_dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            args: Vec::new(),
            user_data_dir: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Profile directory chosen for a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDir {
    pub path: PathBuf,
    /// Generated for this launch and owned by the engine handle.
    pub transient: bool,
}

impl LaunchOptions {
    /// Caller args with colliding flags removed, followed by the fixed flags.
    pub fn effective_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .filter(|arg| {
                let name = flag_name(arg);
                let collides = FIXED_ARGS.iter().any(|fixed| flag_name(fixed) == name);
                if collides {
                    warn!(arg = %arg, "dropping launch argument that overrides a fixed flag");
                }
                !collides
            })
            .cloned()
            .collect();
        args.extend(FIXED_ARGS.iter().map(|s| s.to_string()));
        args
    }

    /// Picks the profile directory: explicit args first, then the option,
    /// otherwise a fresh transient directory under the system temp dir.
    pub fn profile_dir(&self) -> ProfileDir {
        if let Some(path) = user_data_dir_from_args(&self.args) {
            return ProfileDir {
                path,
                transient: false,
            };
        }
        if let Some(path) = &self.user_data_dir {
            return ProfileDir {
                path: path.clone(),
                transient: false,
            };
        }
        ProfileDir {
            path: transient_profile_path(),
            transient: true,
        }
    }
}

/// Extracts `--user-data-dir=<path>` from a browser argument list. The last
/// occurrence wins, as it does for Chromium itself.
pub fn user_data_dir_from_args<S: AsRef<str>>(args: &[S]) -> Option<PathBuf> {
    args.iter()
        .filter_map(|arg| {
            let arg = arg.as_ref();
            let (name, value) = arg.split_once('=')?;
            (name == USER_DATA_DIR_FLAG && !value.is_empty())
                .then(|| PathBuf::from(value.trim_matches('"')))
        })
        .last()
}

fn flag_name(arg: &str) -> &str {
    arg.split_once('=').map(|(name, _)| name).unwrap_or(arg)
}

fn transient_profile_path() -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    std::env::temp_dir().join(format!(
        "pagerender-profile-{}-{}",
        std::process::id(),
        millis
    ))
}

pub(crate) fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "auto".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_args_are_appended_after_caller_args() {
        let opts = LaunchOptions {
            args: vec!["--lang=en-US".to_string()],
            ..LaunchOptions::default()
        };
        let args = opts.effective_args();
        assert_eq!(args[0], "--lang=en-US");
        assert_eq!(&args[1..], FIXED_ARGS);
    }

    #[test]
    fn conflicting_caller_flags_are_dropped() {
        let opts = LaunchOptions {
            args: vec![
                "--disk-cache-size=1048576".to_string(),
                "--no-sandbox".to_string(),
                "--window-size=800,600".to_string(),
            ],
            ..LaunchOptions::default()
        };
        let args = opts.effective_args();
        assert_eq!(args[0], "--window-size=800,600");
        assert_eq!(
            args.iter()
                .filter(|a| a.starts_with("--disk-cache-size"))
                .collect::<Vec<_>>(),
            vec!["--disk-cache-size=0"]
        );
        assert_eq!(args.iter().filter(|a| *a == "--no-sandbox").count(), 1);
    }

    #[test]
    fn user_data_dir_discovered_from_args() {
        let args = ["--headless", "--user-data-dir=/tmp/a", "--user-data-dir=/tmp/b"];
        assert_eq!(
            user_data_dir_from_args(&args),
            Some(PathBuf::from("/tmp/b"))
        );
        assert_eq!(user_data_dir_from_args(&["--user-data-dir="]), None);
        assert_eq!(user_data_dir_from_args::<&str>(&[]), None);
    }

    #[test]
    fn caller_profile_dirs_are_not_transient() {
        let from_args = LaunchOptions {
            args: vec!["--user-data-dir=/srv/profile".to_string()],
            ..LaunchOptions::default()
        };
        assert_eq!(
            from_args.profile_dir(),
            ProfileDir {
                path: PathBuf::from("/srv/profile"),
                transient: false
            }
        );

        let from_option = LaunchOptions {
            user_data_dir: Some(PathBuf::from("/srv/other")),
            ..LaunchOptions::default()
        };
        assert!(!from_option.profile_dir().transient);
    }

    #[test]
    fn generated_profile_dir_is_transient_and_under_temp() {
        let dir = LaunchOptions::default().profile_dir();
        assert!(dir.transient);
        assert!(dir.path.starts_with(std::env::temp_dir()));
        assert!(dir
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("pagerender-profile-")));
    }
}
