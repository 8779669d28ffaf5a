use std::fmt;

use woothee::parser::Parser;

/// Who is asking for a short link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// A link-preview crawler or other automated client.
    Crawler,
    Ios,
    Android,
    /// Desktop, unknown, or unparseable.
    Web,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Crawler => "crawler",
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        })
    }
}

/// Lower-case substrings that mark a user agent as a crawler.
const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawl",
    "slurp",
    "spider",
    "mediapartners",
    "facebookexternalhit",
    "pinterest",
    "whatsapp",
    "slackbot",
    "twitterbot",
];

/// Classify a raw `User-Agent` header.
///
/// Crawler detection runs before the OS check so that a preview bot claiming
/// a mobile OS still gets the metadata document. Anything that cannot be
/// classified is `Web`; classification never fails.
pub fn classify(user_agent: Option<&str>) -> Platform {
    let ua = match user_agent.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Platform::Web,
    };

    let parser = Parser::new();
    let parsed = parser.parse(ua);

    let flagged = parsed.as_ref().is_some_and(|r| r.category == "crawler");
    if flagged || has_bot_marker(ua) {
        return Platform::Crawler;
    }

    match parsed {
        Some(result) if !result.os.is_empty() => platform_for_os(result.os),
        _ => Platform::Web,
    }
}

fn has_bot_marker(ua: &str) -> bool {
    let lowered = ua.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// woothee OS names that belong to the iOS family.
const IOS_FAMILY: &[&str] = &["ios", "iphone", "ipad", "ipod"];

fn platform_for_os(os: &str) -> Platform {
    let os = os.to_ascii_lowercase();
    if os.contains("android") {
        Platform::Android
    } else if IOS_FAMILY.iter().any(|family| os.contains(family)) {
        Platform::Ios
    } else {
        Platform::Web
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const IPOD: &str = "Mozilla/5.0 (iPod touch; CPU iPhone OS 15_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";
    const MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[test]
    fn missing_or_blank_header_is_web() {
        assert_eq!(classify(None), Platform::Web);
        assert_eq!(classify(Some("")), Platform::Web);
        assert_eq!(classify(Some("   ")), Platform::Web);
    }

    #[test]
    fn mobile_operating_systems() {
        assert_eq!(classify(Some(IPHONE)), Platform::Ios);
        assert_eq!(classify(Some(IPAD)), Platform::Ios);
        assert_eq!(classify(Some(IPOD)), Platform::Ios);
        assert_eq!(classify(Some(ANDROID)), Platform::Android);
    }

    #[test]
    fn desktop_and_unknown_are_web() {
        assert_eq!(classify(Some(MAC)), Platform::Web);
        assert_eq!(classify(Some(WINDOWS)), Platform::Web);
        assert_eq!(classify(Some("something-weird/0.1")), Platform::Web);
    }

    #[test]
    fn preview_crawlers() {
        for ua in [
            "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
            "Twitterbot/1.0",
            "Slackbot-LinkExpanding 1.0 (+https://api.slack.com/robots)",
            "WhatsApp/2.23.20.0 A",
            "Pinterest/0.2 (+https://www.pinterest.com/bot.html)",
            "Mozilla/5.0 (compatible; Yahoo! Slurp; http://help.yahoo.com/help/us/ysearch/slurp)",
            "Mediapartners-Google",
        ] {
            assert_eq!(classify(Some(ua)), Platform::Crawler, "{ua}");
        }
    }

    #[test]
    fn bot_markers_are_case_insensitive() {
        assert_eq!(classify(Some("SOMESPIDER/2.0")), Platform::Crawler);
        assert_eq!(classify(Some("MyCrawler")), Platform::Crawler);
    }

    #[test]
    fn crawler_wins_over_mobile_os_tokens() {
        let android_bot = "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) \
            AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36 \
            (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
        let iphone_bot = format!("{IPHONE} WhatsApp/2.23");
        assert_eq!(classify(Some(android_bot)), Platform::Crawler);
        assert_eq!(classify(Some(&iphone_bot)), Platform::Crawler);
    }
}
