//! Decides whether a fetched payload is worth persisting.

use crate::types::{ChannelStats, Platform};

/// An all-zero payload is what a platform returns for a broken or hidden
/// profile; persisting it would put a false drop into the time series.
#[must_use]
pub fn is_valid(stats: &ChannelStats, platform: Platform) -> bool {
    match platform {
        Platform::Youtube => stats.subscribers > 0 || stats.views > 0 || stats.videos > 0,
        Platform::Tiktok => stats.subscribers > 0 || stats.likes > 0,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn stats(subscribers: u64, views: u64, videos: u64, likes: u64) -> ChannelStats {
        ChannelStats {
            subscribers,
            views,
            videos,
            likes,
            ..ChannelStats::default()
        }
    }

    #[rstest]
    #[case(Platform::Youtube, stats(0, 0, 0, 0), false)]
    #[case(Platform::Youtube, stats(0, 0, 0, 99), false)]
    #[case(Platform::Youtube, stats(1000, 0, 0, 0), true)]
    #[case(Platform::Youtube, stats(0, 50_000, 0, 0), true)]
    #[case(Platform::Youtube, stats(0, 0, 10, 0), true)]
    #[case(Platform::Tiktok, stats(0, 0, 0, 5), true)]
    #[case(Platform::Tiktok, stats(12, 0, 0, 0), true)]
    #[case(Platform::Tiktok, stats(0, 900, 4, 0), false)]
    #[case(Platform::Tiktok, stats(0, 0, 0, 0), false)]
    fn validity(#[case] platform: Platform, #[case] stats: ChannelStats, #[case] valid: bool) {
        assert_eq!(is_valid(&stats, platform), valid);
    }
}
