//! Tuning knobs for the edit/autosave controller.

/// Debounce window between the last edit and its commit.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 300;
/// Window in which identical diagnostic messages are logged once.
pub const DEFAULT_LOG_DEDUPE_WINDOW_MS: u64 = 5_000;

/// Editor configuration supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    /// Debounce window in milliseconds.
    pub autosave_delay_ms: u64,
    /// Commit a pending edit before switching memo or document instead of
    /// discarding it.
    pub flush_on_navigate: bool,
    /// Dedupe window for edit diagnostics in milliseconds.
    pub log_dedupe_window_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            flush_on_navigate: false,
            log_dedupe_window_ms: DEFAULT_LOG_DEDUPE_WINDOW_MS,
        }
    }
}

impl EditorConfig {
    pub fn with_autosave_delay_ms(mut self, delay_ms: u64) -> Self {
        self.autosave_delay_ms = delay_ms;
        self
    }

    pub fn with_flush_on_navigate(mut self, enabled: bool) -> Self {
        self.flush_on_navigate = enabled;
        self
    }

    pub fn with_log_dedupe_window_ms(mut self, window_ms: u64) -> Self {
        self.log_dedupe_window_ms = window_ms;
        self
    }
}
