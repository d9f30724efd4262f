//! Location classification, routing policy and the I/O behind them.
//!
//! A location is either a network URL (`http://` or `https://`, any case) or a
//! local filesystem path. Classification and joining are pure string logic;
//! [`Transport`] does the actual reads.

mod fetch;
mod retry;

use std::path::{Component, Path, PathBuf};

pub use fetch::*;
pub use retry::*;

use crate::config::Environment;
use crate::error::{BootstrapError, Result};

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// True if `location` uses the `http://` or `https://` scheme.
pub fn is_network(location: &str) -> bool {
    has_prefix_ignore_case(location, HTTP) || has_prefix_ignore_case(location, HTTPS)
}

/// True only for `https://` locations.
pub fn is_secure_network(location: &str) -> bool {
    has_prefix_ignore_case(location, HTTPS)
}

/// Append `file` to `base` with exactly one separator.
///
/// Network bases use `/` (added only when `base` lacks a trailing one);
/// local bases use the platform separator.
pub fn join(base: &str, file: &str) -> String {
    if is_network(base) {
        if base.ends_with('/') {
            format!("{}{}", base, file)
        } else {
            format!("{}/{}", base, file)
        }
    } else {
        Path::new(base).join(file).to_string_lossy().into_owned()
    }
}

/// Turn a configured base into the location the run will use.
///
/// Blank bases are rejected. Network and absolute bases pass through; a
/// relative local base is anchored at `project_root` and normalised.
pub fn resolve_base(base: &str, project_root: &Path) -> Result<String> {
    if base.trim().is_empty() {
        return Err(BootstrapError::InvalidBase);
    }
    if is_network(base) || Path::new(base).is_absolute() {
        return Ok(base.to_string());
    }
    let joined = normalize(&project_root.join(base));
    Ok(joined.to_string_lossy().into_owned())
}

/// How a base may be read in a given environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Read straight from the filesystem.
    LocalFile,
    /// `GET` over HTTPS with retry.
    Network,
}

/// Apply the secure-transport policy to `base` before any I/O happens.
///
/// Network bases must be `https://` everywhere. Local bases are only
/// readable in development.
pub fn route(base: &str, environment: Environment) -> Result<Route> {
    if is_network(base) {
        if is_secure_network(base) {
            return Ok(Route::Network);
        }
    } else if environment.is_development() {
        return Ok(Route::LocalFile);
    }
    Err(BootstrapError::InsecureTransport {
        location: base.to_string(),
    })
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_check_ignores_case() {
        assert!(is_network("HTTP://cdn.example.com"));
        assert!(is_network("Https://cdn.example.com"));
        assert!(!is_network("ftp://cdn.example.com"));
        assert!(!is_network("http:/missing-slash"));
        assert!(!is_network(""));
    }

    #[test]
    fn only_https_is_secure() {
        assert!(is_secure_network("HTTPS://cdn.example.com/packs"));
        assert!(!is_secure_network("http://cdn.example.com/packs"));
        assert!(!is_secure_network("/var/content"));
    }

    #[test]
    fn join_adds_a_single_slash_for_urls() {
        assert_eq!(
            join("https://cdn.example.com/packs", "packs.json"),
            "https://cdn.example.com/packs/packs.json"
        );
        assert_eq!(
            join("https://cdn.example.com/packs/", "packs.json"),
            "https://cdn.example.com/packs/packs.json"
        );
    }

    #[test]
    fn join_uses_platform_separator_for_paths() {
        let expected = Path::new("content").join("packs.json");
        assert_eq!(join("content", "packs.json"), expected.to_string_lossy());
    }

    #[test]
    fn resolve_base_anchors_relative_paths() {
        let root = Path::new("/work/project");
        let resolved = resolve_base("../shared/content", root).expect("resolve");
        assert_eq!(Path::new(&resolved), Path::new("/work/shared/content"));
    }

    #[test]
    fn resolve_base_keeps_urls_and_absolute_paths() {
        let root = Path::new("/work/project");
        assert_eq!(
            resolve_base("https://cdn.example.com", root).expect("resolve"),
            "https://cdn.example.com"
        );
        assert_eq!(resolve_base("/srv/content", root).expect("resolve"), "/srv/content");
    }

    #[test]
    fn plain_http_is_refused_everywhere() {
        for env in [Environment::Development, Environment::Production] {
            assert!(matches!(
                route("http://cdn.example.com", env),
                Err(BootstrapError::InsecureTransport { .. })
            ));
        }
    }

    #[test]
    fn local_paths_only_route_in_development() {
        assert_eq!(route("/srv/content", Environment::Development).expect("route"), Route::LocalFile);
        assert!(route("/srv/content", Environment::Production).is_err());
        assert_eq!(
            route("https://cdn.example.com", Environment::Production).expect("route"),
            Route::Network
        );
    }

    #[test]
    fn resolve_base_rejects_blank() {
        assert!(matches!(
            resolve_base("   ", Path::new("/")),
            Err(BootstrapError::InvalidBase)
        ));
    }
}
