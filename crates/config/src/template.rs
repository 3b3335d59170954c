//! Default configuration template with all options documented.
//!
//! Written by `chanstat init`. Every value shown is the built-in default, so a
//! freshly generated file parses to [`ChanstatConfig::default`](crate::ChanstatConfig).

/// Generate the default config template.
pub fn default_config_template() -> String {
    r##"# chanstat configuration
# ======================
# Every value shown is the default. Changes require a restart.
#
# Environment variable substitution is supported: ${ENV_VAR} or ${ENV_VAR:-fallback}
# YOUTUBE_API_KEY, TOKINSIGHT_API_KEY, DATABASE_URL and PORT also override
# the matching settings directly.

[server]
bind = "127.0.0.1"
port = 5000

[database]
url = "sqlite://chanstat.db?mode=rwc"
max_connections = 5

[youtube]
# api_key = "${YOUTUBE_API_KEY}"
# base_url = "https://www.googleapis.com/youtube/v3"
timeout_seconds = 30

[tiktok]
# api_key = "${TOKINSIGHT_API_KEY}"
# base_url = "https://api.tokinsight.com/tok/v1"
timeout_seconds = 30

[collector]
enabled = true
schedule = "0 * * * *"            # top of every hour
# timezone = "Europe/Berlin"      # UTC when unset
# every_secs = 3600               # fixed interval instead of `schedule`
run_on_start = true               # sweep once at startup
inter_channel_delay_ms = 1000     # pause between channels of one sweep
failure_policy = "skip"           # "skip" or "record_error"
quota_cooldown_secs = 3600        # skip a platform after a quota rejection (0 = off)

[collector.retry]
max_retries = 3
base_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0
"##
    .to_string()
}
