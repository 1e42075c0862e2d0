pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.beacon".to_string()
}

pub(super) fn default_poll_timeout_ms() -> u64 {
    600_000
}

pub(super) fn default_hook_idle_timeout_ms() -> u64 {
    90_000
}
