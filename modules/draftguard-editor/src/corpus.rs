// Previously published posts, read back for the similarity guard.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

static RE_PENDING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n*>\s*Status:\s*PENDING_APPROVAL\s*\n*").unwrap());

/// A published post with its front matter removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDocument {
    /// File name, used to name the closest match.
    pub name: String,
    pub body: String,
}

/// Split a `---`-fenced front matter block from the body. Returns an empty
/// front matter when the text does not open with a complete block. The
/// body is trimmed.
pub fn split_frontmatter(raw: &str) -> (&str, &str) {
    if let Some(rest) = raw.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---\n") {
            let split = 4 + end + 5;
            return (&raw[..split], raw[split..].trim());
        }
    }
    ("", raw.trim())
}

/// Drop the `> Status: PENDING_APPROVAL` banner pending drafts carry.
pub fn strip_pending_marker(body: &str) -> String {
    RE_PENDING_MARKER.replace_all(body, "\n\n").trim().to_string()
}

/// Load every `*.mdx` file in `dir`, sorted by file name. Unreadable files
/// are skipped with a warning; a missing directory is an error.
pub fn load_published(dir: &Path) -> Result<Vec<PublishedDocument>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read published content directory: {}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "mdx"))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable published file");
                continue;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (_, body) = split_frontmatter(&raw);
        documents.push(PublishedDocument {
            name,
            body: body.to_string(),
        });
    }

    info!(dir = %dir.display(), count = documents.len(), "Loaded published corpus");
    Ok(documents)
}
