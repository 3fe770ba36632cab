/// Interval between task-status polls while an estimate is processing.
pub const TASK_POLL_INTERVAL_MS: u32 = 1_500;

/// How long a self-update token suppresses the matching broadcast.
pub const SELF_UPDATE_WINDOW_MS: i64 = 5_000;

pub const TOAST_LIFETIME_MS: u32 = 5_000;
pub const TOAST_FADE_MS: u32 = 500;

/// Delay before the map recomputes its size once the container is laid out.
pub const MAP_INVALIDATE_DELAY_MS: u32 = 100;

/// Delay before the status card slide-in classes are dropped, so the
/// transition runs after `hidden` is removed.
pub const STATUS_CARD_SLIDE_IN_MS: u32 = 10;
pub const STATUS_CARD_SLIDE_OUT_MS: u32 = 300;
