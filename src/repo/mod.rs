//! Repository URL handling and credential lookup.

pub mod credentials;
pub mod url;

pub use credentials::{guess_credentials, process_env, to_repo_url_with_user};
pub use url::{from_repo_url, to_repo_url};
