//! Redirect strategy: turns a link configuration and a requester platform
//! into the response for that requester.
//!
//! | platform | response |
//! |---|---|
//! | crawler | social preview document (Open Graph + Twitter Card tags) |
//! | ios / android | mobile interstitial that tries the app, then the store |
//! | web | `302 Found` to the web fallback URL |

use askama::Template;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{classifier::Platform, models::LinkConfig};

const DEFAULT_TITLE: &str = "Link";
const DEFAULT_DESCRIPTION: &str = "Click the link for more information.";

/// Delay before the first open attempt, so the page can paint.
pub const OPEN_DELAY_MS: u32 = 500;
pub const IOS_FALLBACK_MS: u32 = 2000;
pub const ANDROID_FALLBACK_MS: u32 = 3000;

// ── Templates ──────────────────────────────────────────────────────────────

/// Metadata document served to link-preview crawlers. All values are
/// HTML-escaped by the template.
#[derive(Template, Debug)]
#[template(path = "preview.html")]
pub struct SocialPreviewPage {
    pub title: String,
    pub description: String,
    /// Canonical short link, not the fallback.
    pub url: String,
    pub image_url: Option<String>,
    pub card: &'static str,
}

/// Interstitial served to iOS and Android browsers.
#[derive(Template, Debug)]
#[template(path = "interstitial.html")]
pub struct InterstitialPage {
    /// Button label, e.g. "App Store".
    pub store_name: &'static str,
    /// Used in running text, e.g. "the App Store".
    pub store_destination: &'static str,
    pub store_url: String,
    /// Content of the `apple-itunes-app` meta tag, iOS only.
    pub app_banner: Option<String>,
    pub countdown_secs: u32,
    pub script: InterstitialScript,
}

/// The app-open behaviour run by the recipient's browser.
///
/// Every string field holds a JavaScript literal (a quoted string or
/// `null`), built by [`js_literal`]; the template inserts them verbatim.
#[derive(Template, Debug)]
#[template(path = "interstitial.js", escape = "none")]
pub struct InterstitialScript {
    pub platform: String,
    pub deep_link: String,
    pub intent_url: String,
    pub store_url: String,
    pub fallback_ms: u32,
    pub open_delay_ms: u32,
}

// ── Decision ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Decision {
    Preview(SocialPreviewPage),
    Interstitial(InterstitialPage),
    Redirect(String),
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        match self {
            Decision::Preview(page) => page.into_response(),
            Decision::Interstitial(page) => page.into_response(),
            Decision::Redirect(url) => found(&url),
        }
    }
}

/// Pick the response for `platform`. `short_url` is the public URL of the
/// short link itself (scheme + host + `/` + code).
pub fn decide(link: &LinkConfig, platform: Platform, short_url: &str) -> Decision {
    match platform {
        Platform::Crawler => Decision::Preview(social_preview(link, short_url)),
        Platform::Ios | Platform::Android => match mobile_target(link, platform) {
            Some(target) => Decision::Interstitial(interstitial(link, target)),
            None => Decision::Redirect(link.web_fallback_url.clone()),
        },
        Platform::Web => Decision::Redirect(link.web_fallback_url.clone()),
    }
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(e) => {
            tracing::error!("Fallback URL is not a valid Location header: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error resolving link").into_response()
        }
    }
}

// ── Social preview ─────────────────────────────────────────────────────────

pub fn social_preview(link: &LinkConfig, short_url: &str) -> SocialPreviewPage {
    let image_url = link.social_image_url.clone();
    SocialPreviewPage {
        title: link
            .social_title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
        description: link
            .social_description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned()),
        url: short_url.to_owned(),
        card: if image_url.is_some() {
            "summary_large_image"
        } else {
            "summary"
        },
        image_url,
    }
}

// ── Mobile interstitial ────────────────────────────────────────────────────

/// Per-platform targets resolved from a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileTarget {
    pub platform: Platform,
    pub deep_link: Option<String>,
    /// Store listing, or the web fallback when no store id is configured.
    pub store_url: String,
    /// Android only.
    pub intent_url: Option<String>,
}

/// Resolve the deep link, store URL and intent URL for a mobile platform.
/// Returns `None` for crawler and web.
pub fn mobile_target(link: &LinkConfig, platform: Platform) -> Option<MobileTarget> {
    match platform {
        Platform::Ios => {
            let store_url = match &link.ios_app_store_id {
                Some(id) => format!("https://apps.apple.com/app/id{id}"),
                None => link.web_fallback_url.clone(),
            };
            Some(MobileTarget {
                platform,
                deep_link: link.ios_deep_link.clone(),
                store_url,
                intent_url: None,
            })
        }
        Platform::Android => {
            let package = link.android_package_name.as_deref();
            let store_url = match package {
                Some(package) => {
                    format!("https://play.google.com/store/apps/details?id={package}")
                }
                None => link.web_fallback_url.clone(),
            };
            let deep_link = link.android_deep_link.clone();
            let intent = match (deep_link.as_deref(), package) {
                (Some(deep_link), Some(package)) => {
                    let url = intent_url(deep_link, package, &store_url);
                    if url.is_none() {
                        tracing::debug!(deep_link, "Deep link has no scheme, skipping intent URL");
                    }
                    url
                }
                _ => None,
            };
            Some(MobileTarget {
                platform,
                deep_link,
                store_url,
                intent_url: intent,
            })
        }
        Platform::Crawler | Platform::Web => None,
    }
}

/// Build an Android intent URL from a `scheme://host/path` deep link.
///
/// Returns `None` when the deep link has no usable scheme; the caller then
/// falls back to the plain deep link.
pub fn intent_url(deep_link: &str, package_name: &str, store_url: &str) -> Option<String> {
    let (scheme, rest) = deep_link.split_once("://")?;
    if !is_valid_scheme(scheme) {
        return None;
    }
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    Some(format!(
        "intent://{host}/{path}#Intent;scheme={scheme};package={package_name};S.browser_fallback_url={};end",
        urlencoding::encode(store_url)
    ))
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn interstitial(link: &LinkConfig, target: MobileTarget) -> InterstitialPage {
    let (store_name, store_destination, fallback_ms) = match target.platform {
        Platform::Ios => ("App Store", "the App Store", IOS_FALLBACK_MS),
        _ => ("Google Play", "Google Play", ANDROID_FALLBACK_MS),
    };

    let app_banner = match (target.platform, &link.ios_app_store_id) {
        (Platform::Ios, Some(id)) => Some(match &link.ios_deep_link {
            Some(deep_link) => {
                format!("app-id={id}, app-argument={}", urlencoding::encode(deep_link))
            }
            None => format!("app-id={id}"),
        }),
        _ => None,
    };

    let script = InterstitialScript {
        platform: js_literal(Some(&target.platform.to_string())),
        deep_link: js_literal(target.deep_link.as_deref()),
        intent_url: js_literal(target.intent_url.as_deref()),
        store_url: js_literal(Some(&target.store_url)),
        fallback_ms,
        open_delay_ms: OPEN_DELAY_MS,
    };

    InterstitialPage {
        store_name,
        store_destination,
        store_url: target.store_url,
        app_banner,
        countdown_secs: fallback_ms / 1000,
        script,
    }
}

/// Encode a value as a JavaScript literal safe to place inside a `<script>`
/// element: a JSON string with markup-significant characters escaped, or
/// `null`.
pub fn js_literal(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "null".to_owned();
    };
    serde_json::Value::String(value.to_owned())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
