//! Credential lookup for HTTPS clones.
//!
//! Credentials come from the environment as `user:password`. The variable is
//! derived from the repository host, `github.com` reads
//! `GITHUB_COM_CREDENTIALS`, with `PHOVEA_GITHUB_CREDENTIALS` as fallback.

use super::url::{to_repo_url, url_host};

/// Fallback variable consulted when no host-specific one is set.
pub const FALLBACK_CREDENTIALS_VAR: &str = "PHOVEA_GITHUB_CREDENTIALS";

/// Environment variable holding credentials for `host`.
pub fn credentials_var(host: &str) -> String {
    format!("{}_CREDENTIALS", host.replace('.', "_").to_uppercase())
}

/// Guess credentials for an HTTPS repository URL.
pub fn guess_credentials<F>(repo_url: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let host = url_host(repo_url)?;
    lookup(&credentials_var(host))
        .filter(|v| !v.is_empty())
        .or_else(|| lookup(FALLBACK_CREDENTIALS_VAR).filter(|v| !v.is_empty()))
}

/// Clonable URL with credentials injected for HTTPS transports.
pub fn to_repo_url_with_user<F>(url: &str, use_ssh: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let repo = to_repo_url(url, use_ssh);
    if repo.starts_with("git@") {
        return repo;
    }
    match guess_credentials(&repo, lookup) {
        Some(user) => repo.replacen("://", &format!("://{}@", user), 1),
        None => repo,
    }
}

/// Reads variables from the process environment.
pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}
