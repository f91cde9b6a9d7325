pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::{
    load_config, parse_config, ContentConfig, EditorialConfig, GuardConfig, LlmConfig, Secrets,
    SiteConfig,
};
pub use error::DraftGuardError;
pub use text::{
    escape_link_text, normalize_text, normalize_url, title_overlap, unescape_link_text, url_domain,
};
pub use types::*;
