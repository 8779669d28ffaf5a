use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;

pub const SOCIAL_TITLE_MAX: usize = 70;
pub const SOCIAL_DESCRIPTION_MAX: usize = 200;

/// A link configuration record from the `links` table.
///
/// This is also the value serialized into the resolution cache, so the JSON
/// shape doubles as the cache format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfig {
    pub id: i64,
    pub short_code: String,
    /// Dashboard-only; never consulted when resolving.
    pub description: Option<String>,

    pub ios_bundle_id: Option<String>,
    pub ios_app_store_id: Option<String>,
    pub ios_deep_link: Option<String>,

    pub android_package_name: Option<String>,
    pub android_deep_link: Option<String>,

    pub web_fallback_url: String,

    pub social_title: Option<String>,
    pub social_description: Option<String>,
    pub social_image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkConfig {
    /// Assemble a record from validated fields. Used by stores that build
    /// rows in memory.
    pub fn from_fields(
        id: i64,
        short_code: impl Into<String>,
        fields: LinkFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            short_code: short_code.into(),
            description: fields.description,
            ios_bundle_id: fields.ios_bundle_id,
            ios_app_store_id: fields.ios_app_store_id,
            ios_deep_link: fields.ios_deep_link,
            android_package_name: fields.android_package_name,
            android_deep_link: fields.android_deep_link,
            web_fallback_url: fields.web_fallback_url,
            social_title: fields.social_title,
            social_description: fields.social_description,
            social_image_url: fields.social_image_url,
            created_at,
            updated_at,
        }
    }
}

/// The mutable part of a link configuration, after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkFields {
    pub description: Option<String>,
    pub ios_bundle_id: Option<String>,
    pub ios_app_store_id: Option<String>,
    pub ios_deep_link: Option<String>,
    pub android_package_name: Option<String>,
    pub android_deep_link: Option<String>,
    pub web_fallback_url: String,
    pub social_title: Option<String>,
    pub social_description: Option<String>,
    pub social_image_url: Option<String>,
}

// ── Request body ───────────────────────────────────────────────────────────

/// JSON body accepted by the create and update endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInput {
    pub description: Option<String>,
    pub ios_bundle_id: Option<String>,
    pub ios_app_store_id: Option<String>,
    pub ios_deep_link: Option<String>,
    pub android_package_name: Option<String>,
    pub android_deep_link: Option<String>,
    pub web_fallback_url: Option<String>,
    pub social_title: Option<String>,
    pub social_description: Option<String>,
    pub social_image_url: Option<String>,
}

impl LinkInput {
    /// Trim every field, drop empty ones, and check the constraints.
    /// All field errors are collected rather than stopping at the first.
    pub fn validate(self) -> Result<LinkFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let web_fallback_url = match clean(self.web_fallback_url) {
            None => {
                errors.insert("webFallbackUrl", "Web fallback URL is required.".into());
                String::new()
            }
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                errors.insert(
                    "webFallbackUrl",
                    "Web fallback URL must start with http:// or https://".into(),
                );
                url
            }
            Some(url) => url,
        };

        let social_title = clean(self.social_title);
        if social_title
            .as_deref()
            .is_some_and(|t| t.chars().count() > SOCIAL_TITLE_MAX)
        {
            errors.insert(
                "socialTitle",
                format!("Social title must be at most {SOCIAL_TITLE_MAX} characters."),
            );
        }

        let social_description = clean(self.social_description);
        if social_description
            .as_deref()
            .is_some_and(|d| d.chars().count() > SOCIAL_DESCRIPTION_MAX)
        {
            errors.insert(
                "socialDescription",
                format!("Social description must be at most {SOCIAL_DESCRIPTION_MAX} characters."),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(LinkFields {
            description: clean(self.description),
            ios_bundle_id: clean(self.ios_bundle_id),
            ios_app_store_id: clean(self.ios_app_store_id),
            ios_deep_link: clean(self.ios_deep_link),
            android_package_name: clean(self.android_package_name),
            android_deep_link: clean(self.android_deep_link),
            web_fallback_url,
            social_title,
            social_description,
            social_image_url: clean(self.social_image_url),
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fallback_is_a_field_error() {
        let errors = LinkInput::default().validate().unwrap_err();
        assert!(errors.contains_key("webFallbackUrl"));
    }

    #[test]
    fn whitespace_only_fallback_counts_as_missing() {
        let input = LinkInput {
            web_fallback_url: Some("   ".into()),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors["webFallbackUrl"], "Web fallback URL is required.");
    }

    #[test]
    fn fields_are_trimmed_and_empty_ones_dropped() {
        let input = LinkInput {
            web_fallback_url: Some("  https://ex.com ".into()),
            android_package_name: Some(" com.ex.app ".into()),
            ios_deep_link: Some("".into()),
            ..Default::default()
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.web_fallback_url, "https://ex.com");
        assert_eq!(fields.android_package_name.as_deref(), Some("com.ex.app"));
        assert_eq!(fields.ios_deep_link, None);
    }

    #[test]
    fn social_lengths_are_bounded() {
        let input = LinkInput {
            web_fallback_url: Some("https://ex.com".into()),
            social_title: Some("t".repeat(SOCIAL_TITLE_MAX + 1)),
            social_description: Some("d".repeat(SOCIAL_DESCRIPTION_MAX + 1)),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.contains_key("socialTitle"));
        assert!(errors.contains_key("socialDescription"));
        assert!(!errors.contains_key("webFallbackUrl"));
    }

    #[test]
    fn cache_format_is_camel_case() {
        let now = Utc::now();
        let fields = LinkFields {
            web_fallback_url: "https://ex.com".into(),
            ..Default::default()
        };
        let link = LinkConfig::from_fields(1, "aB3dE9f", fields, now, now);
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["shortCode"], "aB3dE9f");
        assert_eq!(json["webFallbackUrl"], "https://ex.com");

        let back: LinkConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, link);
    }
}
