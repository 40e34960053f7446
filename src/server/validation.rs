use crate::server::response::ApiError;
use crate::types::Privacy;

const MAX_SLUG_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// First path segments already taken by the router. An owner with one of these
/// slugs could never be reached at `/{owner}/{repo}`.
const RESERVED_OWNER_SLUGS: &[&str] = &["account", "admin", "api", "health", "new", "repositories"];

fn is_valid_slug_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_slug(slug: &str, entity: &str, allow_period: bool) -> Result<(), String> {
    if slug.is_empty() {
        return Err(format!("{entity} slug cannot be empty"));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(format!("{entity} slug cannot exceed {MAX_SLUG_LEN} characters"));
    }
    if !slug.chars().all(|c| is_valid_slug_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(format!("{entity} slug can only contain {allowed}"));
    }
    if slug.starts_with('-') || slug.starts_with('_') || slug.starts_with('.') {
        return Err(format!("{entity} slug cannot start with a special character"));
    }
    Ok(())
}

pub fn validate_owner_slug(slug: &str) -> Result<(), String> {
    validate_slug(slug, "Account", false)?;
    if RESERVED_OWNER_SLUGS.contains(&slug.to_ascii_lowercase().as_str()) {
        return Err(format!("Account slug '{slug}' is reserved"));
    }
    Ok(())
}

pub fn validate_repo_slug(slug: &str) -> Result<(), String> {
    validate_slug(slug, "Repository", true)?;
    // Second segment of the repository path.
    if slug == "action" || slug == "settings" {
        return Err(format!("Repository slug '{slug}' is reserved"));
    }
    Ok(())
}

pub fn validate_doc_slug(slug: &str) -> Result<(), String> {
    validate_slug(slug, "Document", true)?;
    if slug == "action" || slug == "settings" {
        return Err(format!("Document slug '{slug}' is reserved"));
    }
    Ok(())
}

pub fn validate_name(name: &str, entity: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("{entity} name cannot exceed {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), String> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )),
        _ => Ok(()),
    }
}

/// Parses a privacy value, treating an absent or blank value as public.
pub fn parse_privacy(value: Option<&str>) -> Result<Privacy, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(Privacy::default()),
        Some(v) => Privacy::parse(v).ok_or_else(|| format!("Invalid privacy: {v}")),
    }
}

/// Account validation for the admin API.
pub fn validate_account(slug: &str, name: &str) -> Result<(), ApiError> {
    validate_owner_slug(slug).map_err(ApiError::bad_request)?;
    validate_name(name, "Account").map_err(ApiError::bad_request)
}
