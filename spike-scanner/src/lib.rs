/// Spike Scanner - Shared Library
///
/// Common functionality for the two spike terminals:
/// - spike-dashboard: live, filterable spike table with toast and desktop alerts
/// - spike-watch: headless watcher raising desktop alerts
///
/// The library includes:
/// - Environment driven configuration
/// - The spike notifier (deduplication, per-poll alert cap, filter-change suppression)
/// - Alert sinks (desktop command, in-app toasts)
/// - The background watcher task and dashboard view state
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::alert::{AlertError, AlertSink, DesktopSink, Sound, SpikeAlert};
pub use shared::config::ScannerConfig;
pub use shared::dashboard::DashboardState;
pub use shared::format::{
    format_clock, format_price, format_trade_value, format_volume, VolumeTier,
};
pub use shared::logging::{init_file_logging, init_logging};
pub use shared::notifier::{CycleKind, CycleReport, SpikeNotifier, DEFAULT_MAX_ALERTS_PER_CYCLE};
pub use shared::toast::{Toast, ToastQueue, ToastSink};
pub use shared::watcher::{spawn_watcher, WatchCommand, WatchUpdate, WatcherConfig, WatcherHandle};
