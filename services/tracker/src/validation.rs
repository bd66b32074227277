//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_COMMENT_LENGTH: usize = 5_000;
pub const MAX_QUERY_LENGTH: usize = 200;
pub const MAX_MEDIA_URLS: usize = 10;

/// Validate card title
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.is_empty() {
        return Err("Title is required".to_string());
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title must be at most {} characters long",
            MAX_TITLE_LENGTH
        ));
    }

    Ok(())
}

/// Validate card description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description must be at most {} characters long",
            MAX_DESCRIPTION_LENGTH
        ));
    }

    Ok(())
}

/// Validate a list of attached media URLs
pub fn validate_media_urls(urls: &[String]) -> Result<(), String> {
    if urls.len() > MAX_MEDIA_URLS {
        return Err(format!("At most {} attachments are allowed", MAX_MEDIA_URLS));
    }

    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX
        .get_or_init(|| Regex::new(r#"^https?://[^\s<>"]+$"#).expect("Failed to compile URL regex"));

    if let Some(bad) = urls.iter().find(|url| !regex.is_match(url)) {
        return Err(format!("Invalid attachment URL: {}", bad));
    }

    Ok(())
}

/// Validate comment content; a comment needs text or at least one image
pub fn validate_comment(content: &str, images: &[String]) -> Result<(), String> {
    if content.is_empty() && images.is_empty() {
        return Err("Comment content is required".to_string());
    }

    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(format!(
            "Comment must be at most {} characters long",
            MAX_COMMENT_LENGTH
        ));
    }

    validate_media_urls(images)
}

/// Trim the search query; blank queries mean no search
pub fn normalize_search_query(query: Option<&str>) -> Result<Option<String>, String> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(None);
    };

    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(format!(
            "Search query must be at most {} characters long",
            MAX_QUERY_LENGTH
        ));
    }

    Ok(Some(query.to_string()))
}
