//! Repository URL normalization.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// Default GitHub organization for bare repository names.
pub const DEFAULT_ORGANIZATION: &str = "Caleydo";

/// Matches `https://host/path(.git)` and `git@host:path(.git)`.
static REPO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://([^/]+)/|git@(.+):)([\w\-/]+)(\.git)?")
        .expect("REPO_URL_REGEX must compile")
});

/// Host and path of a repository URL, e.g. `github.com` and `Caleydo/app`.
fn split_url(url: &str) -> Option<(String, String)> {
    let caps = REPO_URL_REGEX.captures(url)?;
    let host = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
    let path = caps.get(4)?.as_str().to_string();
    Some((host, path))
}

/// Produce a clonable URL in the requested transport.
///
/// - `git@host:path` is kept for SSH and rewritten to `https://host/path.git`
///   otherwise
/// - `https://host/path` is kept for HTTPS and rewritten to
///   `git@host:path.git` for SSH
/// - `name` becomes `Caleydo/name`, and `org/name` is expanded to a GitHub URL
pub fn to_repo_url(url: &str, use_ssh: bool) -> String {
    if url.starts_with("git@") {
        if use_ssh {
            return url.to_string();
        }
        return match split_url(url) {
            Some((host, path)) => format!("https://{}/{}.git", host, path),
            None => {
                warn!("cannot convert repository url {} to https", url);
                url.to_string()
            }
        };
    }

    if url.starts_with("http") {
        if !use_ssh {
            return url.to_string();
        }
        return match split_url(url) {
            Some((host, path)) => format!("git@{}:{}.git", host, path),
            None => {
                warn!("cannot convert repository url {} to ssh", url);
                url.to_string()
            }
        };
    }

    let slug = if url.contains('/') {
        url.to_string()
    } else {
        format!("{}/{}", DEFAULT_ORGANIZATION, url)
    };

    if use_ssh {
        format!("git@github.com:{}.git", slug)
    } else {
        format!("https://github.com/{}.git", slug)
    }
}

/// Repository name of a URL: its last path segment without `.git`.
pub fn from_repo_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Host part of an `http(s)://` URL.
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let host = rest.split('/').next()?;
    // strip any existing user info
    let host = host.rsplit('@').next()?;
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_url_kept_with_ssh() {
        let url = "git@github.com:Caleydo/app.git";
        assert_eq!(to_repo_url(url, true), url);
    }

    #[test]
    fn ssh_url_converted_to_https() {
        assert_eq!(
            to_repo_url("git@gitlab.example.org:team/app.git", false),
            "https://gitlab.example.org/team/app.git"
        );
    }

    #[test]
    fn https_url_kept_without_ssh() {
        let url = "https://github.com/Caleydo/app.git";
        assert_eq!(to_repo_url(url, false), url);
    }

    #[test]
    fn https_url_converted_to_ssh() {
        assert_eq!(
            to_repo_url("https://github.com/Caleydo/app", true),
            "git@github.com:Caleydo/app.git"
        );
        assert_eq!(
            to_repo_url("https://github.com/Caleydo/app.git", true),
            "git@github.com:Caleydo/app.git"
        );
    }

    #[test]
    fn bare_name_gets_default_organization() {
        assert_eq!(
            to_repo_url("phovea_core", false),
            "https://github.com/Caleydo/phovea_core.git"
        );
        assert_eq!(
            to_repo_url("phovea_core", true),
            "git@github.com:Caleydo/phovea_core.git"
        );
    }

    #[test]
    fn org_slug_expands_to_github() {
        assert_eq!(
            to_repo_url("phovea/phovea_server", false),
            "https://github.com/phovea/phovea_server.git"
        );
    }

    #[test]
    fn from_repo_url_strips_git_suffix() {
        assert_eq!(from_repo_url("https://github.com/Caleydo/app.git"), "app");
        assert_eq!(from_repo_url("git@github.com:Caleydo/app.git"), "app");
        assert_eq!(from_repo_url("Caleydo/app"), "app");
        assert_eq!(from_repo_url("app"), "app");
    }

    #[test]
    fn url_host_extracts_host() {
        assert_eq!(url_host("https://github.com/Caleydo/app.git"), Some("github.com"));
        assert_eq!(url_host("https://u:p@gitlab.com/x.git"), Some("gitlab.com"));
        assert_eq!(url_host("git@github.com:x.git"), None);
    }
}
