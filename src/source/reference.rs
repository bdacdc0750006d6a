use crate::error::ParseError;

use super::SourceLocator;

/// URL schemes accepted for direct-URL sources.
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Parse a user-supplied source reference (`owner/repo[@rev]` or a URL).
///
/// Parsing is pure; nothing is looked up remotely.
pub fn parse_reference(text: &str) -> Result<SourceLocator, ParseError> {
    if let Some(locator) = parse_repository(text) {
        return Ok(locator);
    }

    if is_well_formed_url(text) {
        return Ok(SourceLocator::Url {
            url: text.to_string(),
        });
    }

    Err(ParseError::Malformed {
        text: text.to_string(),
    })
}

fn parse_repository(text: &str) -> Option<SourceLocator> {
    let (path, revision) = match text.split_once('@') {
        Some((path, revision)) => {
            if revision.is_empty() {
                return None;
            }
            (path, Some(revision.to_string()))
        }
        None => (text, None),
    };

    let (owner, repo) = path.split_once('/')?;
    if !is_repo_segment(owner) || !is_repo_segment(repo) {
        return None;
    }

    Some(SourceLocator::Repository {
        owner: owner.to_string(),
        repo: repo.to_string(),
        revision,
    })
}

fn is_repo_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn is_well_formed_url(text: &str) -> bool {
    let Ok(url) = url::Url::parse(text) else {
        return false;
    };

    URL_SCHEMES.contains(&url.scheme()) && (url.has_host() || url.scheme() == "file")
}
