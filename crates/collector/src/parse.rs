//! Channel URL validation and handle extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result, types::Platform};

static YOUTUBE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^(?:https?://)?(?:www\.)?youtube\.com/@([A-Za-z0-9_-]+)/?$",
        r"^(?:https?://)?(?:www\.)?youtube\.com/channel/([A-Za-z0-9_-]+)/?$",
        r"^(?:https?://)?(?:www\.)?youtube\.com/c/([A-Za-z0-9_-]+)/?$",
        r"^@([A-Za-z0-9_-]+)$",
    ])
});

static TIKTOK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^(?:https?://)?(?:www\.)?tiktok\.com/@([A-Za-z0-9_-]+)/?$",
        r"^@([A-Za-z0-9_-]+)$",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    // Patterns are literals above; an invalid one is simply dropped.
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn patterns(platform: Platform) -> &'static [Regex] {
    match platform {
        Platform::Youtube => &YOUTUBE_PATTERNS,
        Platform::Tiktok => &TIKTOK_PATTERNS,
    }
}

fn format_hint(platform: Platform) -> &'static str {
    match platform {
        Platform::Youtube => "Invalid format. Use: https://youtube.com/@channelname or @channelname",
        Platform::Tiktok => "Invalid format. Use: https://tiktok.com/@username or @username",
    }
}

/// Extract the normalized handle (no leading `@`) from a channel URL.
///
/// Fails with `InvalidInput` carrying a format hint for the platform.
pub fn extract_handle(platform: Platform, input: &str) -> Result<String> {
    let input = input.trim();
    patterns(platform)
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::invalid_input(format_hint(platform)))
}

/// Parse a channel reference, taking the platform from the URL host when
/// none is given. Bare `@name` inputs need an explicit platform.
pub fn parse_channel_url(input: &str, platform: Option<Platform>) -> Result<(Platform, String)> {
    let platform = platform
        .or_else(|| detect_platform(input))
        .ok_or_else(|| Error::invalid_input("Unsupported platform"))?;
    Ok((platform, extract_handle(platform, input)?))
}

fn detect_platform(url: &str) -> Option<Platform> {
    let lower = url.trim().to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        Some(Platform::Youtube)
    } else if lower.contains("tiktok.com") {
        Some(Platform::Tiktok)
    } else {
        None
    }
}
