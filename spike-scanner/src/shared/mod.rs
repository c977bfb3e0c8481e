/// Shared modules for the spike terminals
pub mod alert;
pub mod config;
pub mod dashboard;
pub mod format;
pub mod logging;
pub mod notifier;
pub mod toast;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_util;
