/// In-app toast alerts
///
/// Toasts stack independently: each one expires on its own after the configured
/// duration or when dismissed, and a new toast never waits for an older one.
use crate::shared::alert::{AlertError, AlertSink, SpikeAlert};
use async_trait::async_trait;
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

/// A single toast on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub symbol: SmolStr,
    pub text: String,
    pub expires_at: Instant,
}

/// Ordered stack of live toasts, oldest first.
#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    duration: Duration,
    next_id: u64,
}

impl ToastQueue {
    pub fn new(duration: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            duration,
            next_id: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Push a new toast, returning its id.
    pub fn push(&mut self, symbol: SmolStr, text: String, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            symbol,
            text,
            expires_at: now + self.duration,
        });
        id
    }

    /// Dismiss a toast by id. Returns the toast if it was still live.
    pub fn dismiss(&mut self, id: u64) -> Option<Toast> {
        let index = self.toasts.iter().position(|toast| toast.id == id)?;
        self.toasts.remove(index)
    }

    /// Drop every toast whose display time has elapsed.
    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    /// Most recently pushed live toast
    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    /// Live toasts, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Toast> + '_ {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// [`AlertSink`] that stacks a toast on a shared [`ToastQueue`].
#[derive(Debug, Clone)]
pub struct ToastSink {
    queue: Arc<Mutex<ToastQueue>>,
}

impl ToastSink {
    pub fn new(queue: Arc<Mutex<ToastQueue>>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl AlertSink for ToastSink {
    fn name(&self) -> &'static str {
        "toast"
    }

    async fn notify(&self, alert: &SpikeAlert) -> Result<(), AlertError> {
        self.queue
            .lock()
            .push(alert.symbol.clone(), alert.toast_text(), Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_stack_and_expire_independently() {
        let start = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(6));

        let first = queue.push(SmolStr::new("AAPL"), "first".to_string(), start);
        let second = queue.push(
            SmolStr::new("MSFT"),
            "second".to_string(),
            start + Duration::from_secs(3),
        );
        assert_eq!(queue.len(), 2);
        assert_ne!(first, second);

        // First expires at +6s, second is still live until +9s
        queue.expire(start + Duration::from_secs(6));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.latest().map(|toast| toast.id), Some(second));

        queue.expire(start + Duration::from_secs(9));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dismiss_toast() {
        let now = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(5));

        let a = queue.push(SmolStr::new("AAPL"), "a".to_string(), now);
        let b = queue.push(SmolStr::new("GOOG"), "b".to_string(), now);
        let c = queue.push(SmolStr::new("MSFT"), "c".to_string(), now);

        let dismissed = queue.dismiss(b).unwrap();
        assert_eq!(dismissed.symbol, "GOOG");
        assert!(queue.dismiss(b).is_none());

        let remaining: Vec<u64> = queue.iter().map(|toast| toast.id).collect();
        assert_eq!(remaining, vec![a, c]);
    }

    #[test]
    fn test_toasts_newest_first() {
        let now = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(5));
        for symbol in ["AAPL", "GOOG", "MSFT"] {
            queue.push(SmolStr::new(symbol), symbol.to_lowercase(), now);
        }

        // Render order: newest at the bottom of the stack, drawn first
        let newest_two: Vec<&str> = queue
            .iter()
            .rev()
            .take(2)
            .map(|toast| toast.symbol.as_str())
            .collect();
        assert_eq!(newest_two, vec!["MSFT", "GOOG"]);
    }

    #[tokio::test]
    async fn test_toast_sink_pushes_alert_text() {
        let queue = Arc::new(Mutex::new(ToastQueue::new(Duration::from_secs(6))));
        let sink = ToastSink::new(Arc::clone(&queue));

        let alert = SpikeAlert {
            symbol: SmolStr::new("GOOG"),
            volume_delta: 700_000.0,
            title: "📈 GOOG spiked!".to_string(),
            body: "Volume: 700,000".to_string(),
        };
        sink.notify(&alert).await.unwrap();

        let guard = queue.lock();
        let toast = guard.latest().unwrap();
        assert_eq!(toast.symbol, "GOOG");
        assert_eq!(toast.text, "📊 GOOG spiked with 700,000 volume");
    }
}
