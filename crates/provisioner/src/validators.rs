//! Name validation and sanitization for resource groups and repositories.
//!
//! Pure functions, no I/O. Names reach the orchestrator only as
//! [`ResourceName`], which can only be built by sanitizing and validating.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Maximum Azure resource group name length.
pub const MAX_CLOUD_NAME_LEN: usize = 90;

/// Maximum GitHub repository name length.
pub const MAX_REPOSITORY_NAME_LEN: usize = 100;

/// Substituted when sanitization leaves nothing.
pub const FALLBACK_NAME: &str = "unnamed-resource";

static CLOUD_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\(\)\.]+$").expect("valid regex"));

static REPOSITORY_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\.]+$").expect("valid regex"));

static CLOUD_NAME_INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_\-\(\)\.]").expect("valid regex"));

/// Validate an Azure resource group name.
///
/// Rules: 1-90 characters, no trailing period, only alphanumerics,
/// underscores, parentheses, hyphens and periods.
pub fn validate_resource_group_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::CloudNameEmpty);
    }
    if name.chars().count() > MAX_CLOUD_NAME_LEN {
        return Err(ValidationError::CloudNameTooLong);
    }
    if name.ends_with('.') {
        return Err(ValidationError::CloudNameTrailingPeriod);
    }
    if !CLOUD_NAME_PATTERN.is_match(name) {
        return Err(ValidationError::CloudNameInvalidCharacters);
    }
    Ok(())
}

/// Validate a GitHub repository name.
///
/// Rules: 1-100 characters, must not start with `-` or `_`, only
/// alphanumerics, hyphens, underscores and periods.
pub fn validate_repository_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::RepositoryNameEmpty);
    }
    if name.chars().count() > MAX_REPOSITORY_NAME_LEN {
        return Err(ValidationError::RepositoryNameTooLong);
    }
    if name.starts_with('-') || name.starts_with('_') {
        return Err(ValidationError::RepositoryNameLeadingSeparator);
    }
    if !REPOSITORY_NAME_PATTERN.is_match(name) {
        return Err(ValidationError::RepositoryNameInvalidCharacters);
    }
    Ok(())
}

/// Turn arbitrary text into a usable resource name.
///
/// Spaces become hyphens, characters outside the resource group alphabet
/// are dropped, leading/trailing `-_.` are trimmed, the result is cut to
/// `max_length` and any trailing period removed. Empty results fall back
/// to [`FALLBACK_NAME`].
#[must_use]
pub fn sanitize_name(name: &str, max_length: usize) -> String {
    let hyphenated = name.replace(' ', "-");
    let allowed = CLOUD_NAME_INVALID_CHARS.replace_all(&hyphenated, "");
    let trimmed = allowed.trim_matches(|c| matches!(c, '-' | '_' | '.'));
    let truncated: String = trimmed.chars().take(max_length).collect();
    let sanitized = truncated.trim_end_matches('.');

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized.to_string()
    }
}

/// A sanitized, validated resource group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Sanitize `raw` and validate the result as a resource group name.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let sanitized = sanitize_name(raw, MAX_CLOUD_NAME_LEN);
        validate_resource_group_name(&sanitized)?;
        Ok(Self(sanitized))
    }

    /// Check that the name is also usable as a repository name.
    pub fn validate_for_repository(&self) -> Result<(), ValidationError> {
        validate_repository_name(&self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_resource_group_names() {
        for name in ["rg-myproject-dev", "a", "My_Group(1).v2", &"x".repeat(90)] {
            assert_eq!(validate_resource_group_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn test_resource_group_rejections() {
        assert_eq!(
            validate_resource_group_name(""),
            Err(ValidationError::CloudNameEmpty)
        );
        assert_eq!(
            validate_resource_group_name(&"x".repeat(91)),
            Err(ValidationError::CloudNameTooLong)
        );
        assert_eq!(
            validate_resource_group_name("rg-name."),
            Err(ValidationError::CloudNameTrailingPeriod)
        );
        assert_eq!(
            validate_resource_group_name("rg name"),
            Err(ValidationError::CloudNameInvalidCharacters)
        );
        assert_eq!(
            validate_resource_group_name("rg/name"),
            Err(ValidationError::CloudNameInvalidCharacters)
        );
    }

    #[test]
    fn test_valid_repository_names() {
        for name in ["repo", "my-repo.rs", "Repo_2", &"r".repeat(100)] {
            assert_eq!(validate_repository_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn test_repository_rejections() {
        assert_eq!(
            validate_repository_name(""),
            Err(ValidationError::RepositoryNameEmpty)
        );
        assert_eq!(
            validate_repository_name(&"r".repeat(101)),
            Err(ValidationError::RepositoryNameTooLong)
        );
        assert_eq!(
            validate_repository_name("-repo"),
            Err(ValidationError::RepositoryNameLeadingSeparator)
        );
        assert_eq!(
            validate_repository_name("_repo"),
            Err(ValidationError::RepositoryNameLeadingSeparator)
        );
        assert_eq!(
            validate_repository_name("repo(1)"),
            Err(ValidationError::RepositoryNameInvalidCharacters)
        );
    }

    #[test]
    fn test_sanitize_replaces_spaces_and_drops_invalid() {
        assert_eq!(sanitize_name("My Project!!", 90), "My-Project");
        assert_eq!(sanitize_name("  rg: data/lake  ", 90), "rg-datalake");
    }

    #[test]
    fn test_sanitize_trims_separators() {
        assert_eq!(sanitize_name("--_name_.", 90), "name");
        assert_eq!(sanitize_name(".hidden.", 90), "hidden");
    }

    #[test]
    fn test_sanitize_truncates_then_strips_trailing_period() {
        assert_eq!(sanitize_name("abcd.efgh", 5), "abcd");
        assert_eq!(sanitize_name("abcdefgh", 3), "abc");
    }

    #[test]
    fn test_sanitize_fallback() {
        assert_eq!(sanitize_name("...", 90), FALLBACK_NAME);
        assert_eq!(sanitize_name("", 90), FALLBACK_NAME);
        assert_eq!(sanitize_name("!!!", 90), FALLBACK_NAME);
    }

    #[test]
    fn test_sanitized_names_are_valid_resource_group_names() {
        for raw in ["My Project!!", "...", "ünïcödé name", &"long ".repeat(40), "a.b.c."] {
            let sanitized = sanitize_name(raw, MAX_CLOUD_NAME_LEN);
            assert_eq!(validate_resource_group_name(&sanitized), Ok(()), "{raw}");
        }
    }

    #[test]
    fn test_resource_name_parse() {
        let name = ResourceName::parse("Data Platform (dev)").unwrap();
        assert_eq!(name.as_str(), "Data-Platform-(dev)");
        assert_eq!(
            name.validate_for_repository(),
            Err(ValidationError::RepositoryNameInvalidCharacters)
        );

        let name = ResourceName::parse("analytics dev").unwrap();
        assert_eq!(name.validate_for_repository(), Ok(()));
    }
}
