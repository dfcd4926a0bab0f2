/// Refresh scheduler for snapshot fetches
///
/// Drives fetches from a periodic timer and from manual triggers. Every
/// dispatched fetch is tagged with a monotonically increasing token and reports
/// back over a channel; only the completion of the most recently dispatched
/// fetch is accepted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, SnapshotFetcher};
use super::types::Snapshot;

/// Period of the refresh timer
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Sequence token of one dispatched fetch
pub type RequestToken = u64;

/// A finished fetch, tagged with the token it was dispatched under
#[derive(Debug)]
pub struct Completion {
    pub token: RequestToken,
    pub window_seconds: u64,
    pub result: Result<Snapshot, FetchError>,
}

/// Events delivered to the dashboard event loop
#[derive(Debug)]
pub enum RefreshEvent {
    /// The periodic timer fired
    Tick,
    /// A fetch finished
    Completed(Completion),
}

/// Outstanding-fetch bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshState {
    /// Token of the latest dispatched fetch while it is outstanding
    pub in_flight: Option<RequestToken>,
    /// Token of the latest dispatched fetch, zero before the first dispatch
    pub last_dispatched: RequestToken,
}

pub struct RefreshScheduler<F: SnapshotFetcher> {
    fetcher: Arc<F>,
    event_tx: mpsc::UnboundedSender<RefreshEvent>,
    period: Duration,
    timer: Option<JoinHandle<()>>,
    state: RefreshState,
}

impl<F: SnapshotFetcher> RefreshScheduler<F> {
    pub fn new(fetcher: Arc<F>, event_tx: mpsc::UnboundedSender<RefreshEvent>, period: Duration) -> Self {
        Self {
            fetcher,
            event_tx,
            period,
            timer: None,
            state: RefreshState::default(),
        }
    }

    /// Start the periodic timer, replacing any timer already running
    ///
    /// The first tick fires immediately.
    pub fn start(&mut self) {
        if let Some(previous) = self.timer.take() {
            debug!("Replacing active refresh timer");
            previous.abort();
        }

        let period = self.period;
        let event_tx = self.event_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if event_tx.send(RefreshEvent::Tick).is_err() {
                    debug!("Refresh event receiver dropped, stopping timer");
                    break;
                }
            }
        }));
        info!("Refresh timer started with period {:?}", period);
    }

    /// Stop the periodic timer; in-flight fetches still report back
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!("Refresh timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .as_ref()
            .map(|timer| !timer.is_finished())
            .unwrap_or(false)
    }

    /// Dispatch one fetch for `window_seconds` without waiting for earlier fetches
    pub fn dispatch(&mut self, window_seconds: u64) -> RequestToken {
        let token = self.state.last_dispatched + 1;
        self.state.last_dispatched = token;
        self.state.in_flight = Some(token);

        let fetcher = Arc::clone(&self.fetcher);
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(window_seconds).await;
            if let Err(e) = &result {
                warn!(token, window_seconds, "Snapshot fetch failed: {}", e);
            }
            let completion = Completion {
                token,
                window_seconds,
                result,
            };
            if event_tx.send(RefreshEvent::Completed(completion)).is_err() {
                debug!(token, "Refresh event receiver dropped before completion");
            }
        });

        token
    }

    /// Whether `completion` may be rendered
    ///
    /// Accepts only the most recently dispatched fetch, which also clears the
    /// in-flight token. Anything older has been superseded.
    pub fn accept(&mut self, completion: &Completion) -> bool {
        if self.state.in_flight == Some(completion.token) {
            self.state.in_flight = None;
            true
        } else {
            debug!(
                token = completion.token,
                latest = self.state.last_dispatched,
                "Discarding superseded fetch completion"
            );
            false
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }
}

impl<F: SnapshotFetcher> Drop for RefreshScheduler<F> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{oneshot, Mutex};

    /// Fetcher whose results are released by the test, one oneshot per fetch
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        pending: Mutex<VecDeque<oneshot::Receiver<Result<Snapshot, FetchError>>>>,
        pub(crate) windows: Mutex<Vec<u64>>,
    }

    impl ScriptedFetcher {
        /// Queue the next fetch, returning the sender that completes it
        pub(crate) async fn script(&self) -> oneshot::Sender<Result<Snapshot, FetchError>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().await.push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch(&self, window_seconds: u64) -> Result<Snapshot, FetchError> {
            self.windows.lock().await.push(window_seconds);
            let next = self.pending.lock().await.pop_front();
            match next {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Transport("script dropped".to_string()))),
                None => Err(FetchError::Transport("no scripted response".to_string())),
            }
        }
    }

    pub(crate) async fn next_completion(rx: &mut mpsc::UnboundedReceiver<RefreshEvent>) -> Completion {
        loop {
            match rx.recv().await {
                Some(RefreshEvent::Completed(completion)) => return completion,
                Some(RefreshEvent::Tick) => continue,
                None => panic!("refresh channel closed"),
            }
        }
    }

    fn snapshot(updated: &str) -> Snapshot {
        Snapshot::new(Vec::new(), updated)
    }

    #[tokio::test]
    async fn test_tokens_are_monotonic() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut scheduler = RefreshScheduler::new(fetcher, tx, DEFAULT_REFRESH_INTERVAL);

        assert_eq!(scheduler.state(), RefreshState::default());
        assert_eq!(scheduler.dispatch(300), 1);
        assert_eq!(scheduler.dispatch(300), 2);
        assert_eq!(scheduler.dispatch(60), 3);
        assert_eq!(
            scheduler.state(),
            RefreshState {
                in_flight: Some(3),
                last_dispatched: 3
            }
        );
    }

    #[tokio::test]
    async fn test_late_completion_of_older_fetch_is_discarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let first = fetcher.script().await;
        let second = fetcher.script().await;
        let mut scheduler = RefreshScheduler::new(Arc::clone(&fetcher), tx, DEFAULT_REFRESH_INTERVAL);

        let t1 = scheduler.dispatch(300);
        tokio::task::yield_now().await;
        let t2 = scheduler.dispatch(300);

        second.send(Ok(snapshot("t2"))).unwrap();
        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.token, t2);
        assert!(scheduler.accept(&completion));
        assert_eq!(scheduler.state().in_flight, None);

        first.send(Ok(snapshot("t1"))).unwrap();
        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.token, t1);
        assert!(!scheduler.accept(&completion));
    }

    #[tokio::test]
    async fn test_completion_superseded_while_in_flight_is_discarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let first = fetcher.script().await;
        let _second = fetcher.script().await;
        let mut scheduler = RefreshScheduler::new(Arc::clone(&fetcher), tx, DEFAULT_REFRESH_INTERVAL);

        scheduler.dispatch(300);
        tokio::task::yield_now().await;
        let t2 = scheduler.dispatch(300);

        first.send(Err(FetchError::Transport("slow".to_string()))).unwrap();
        let completion = next_completion(&mut rx).await;
        assert!(!scheduler.accept(&completion));
        assert_eq!(scheduler.state().in_flight, Some(t2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_a_single_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut scheduler = RefreshScheduler::new(fetcher, tx, DEFAULT_REFRESH_INTERVAL);

        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        // ticks at 0s, 1s, 2s and 3s
        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let mut ticks = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RefreshEvent::Tick) {
                ticks += 1;
            }
        }
        assert_eq!(ticks, 4);

        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_dispatch_leaves_timer_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let reply = fetcher.script().await;
        let mut scheduler = RefreshScheduler::new(Arc::clone(&fetcher), tx, DEFAULT_REFRESH_INTERVAL);

        scheduler.start();
        let token = scheduler.dispatch(120);
        assert!(scheduler.is_running());

        reply.send(Ok(snapshot("manual"))).unwrap();
        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.token, token);
        assert_eq!(completion.window_seconds, 120);
        assert!(scheduler.accept(&completion));
        assert_eq!(*fetcher.windows.lock().await, vec![120]);
        assert!(scheduler.is_running());
    }
}
