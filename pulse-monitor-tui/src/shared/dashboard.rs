//! Dashboard state owned by the UI event loop
//!
//! Settings, scheduler bookkeeping and the rendered table are touched only
//! from the loop that owns [`Dashboard`], so none of it sits behind a lock.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::info;

use super::config::{DashboardSettings, MonitorConfig};
use super::controls::ControlForm;
use super::fetcher::SnapshotFetcher;
use super::reconciler::Reconciler;
use super::scheduler::{RefreshEvent, RefreshScheduler, RefreshState};

/// What the event loop should do after input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing visible changed
    None,
    Redraw,
    Quit,
}

pub struct Dashboard<F: SnapshotFetcher> {
    settings: DashboardSettings,
    form: ControlForm,
    scheduler: RefreshScheduler<F>,
    reconciler: Reconciler,
}

impl<F: SnapshotFetcher> Dashboard<F> {
    pub fn new(config: &MonitorConfig, fetcher: Arc<F>, event_tx: mpsc::UnboundedSender<RefreshEvent>) -> Self {
        let settings = config.settings;
        Self {
            settings,
            form: ControlForm::from_settings(&settings),
            scheduler: RefreshScheduler::new(fetcher, event_tx, config.refresh_interval),
            reconciler: Reconciler::new(),
        }
    }

    /// Start (or restart) periodic refreshing
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Handle a timer tick or fetch completion; returns whether the view changed
    pub fn handle_refresh_event(&mut self, event: RefreshEvent) -> bool {
        match event {
            RefreshEvent::Tick => {
                self.scheduler.dispatch(self.settings.window_seconds);
                false
            }
            RefreshEvent::Completed(completion) => {
                if !self.scheduler.accept(&completion) {
                    return false;
                }
                self.reconciler.apply(completion.result, &self.settings.sort);
                true
            }
        }
    }

    /// Commit the staged controls and fetch immediately
    ///
    /// The periodic timer keeps its schedule.
    pub fn apply_controls(&mut self) {
        self.settings = self.form.to_settings();
        self.form.sync(&self.settings);
        info!(
            window_seconds = self.settings.window_seconds,
            sort = %self.settings.sort,
            "Applying dashboard settings"
        );
        self.reconciler.resort(&self.settings.sort);
        self.scheduler.dispatch(self.settings.window_seconds);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }

        let changed = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
            KeyCode::Enter => {
                self.apply_controls();
                true
            }
            KeyCode::Tab => {
                self.form.focus_next();
                true
            }
            KeyCode::BackTab => {
                self.form.focus_prev();
                true
            }
            KeyCode::Right | KeyCode::Down | KeyCode::Char(' ') => self.form.select_next(),
            KeyCode::Left | KeyCode::Up => self.form.select_prev(),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(c) => self.form.push_char(c),
            _ => false,
        };

        if changed {
            Action::Redraw
        } else {
            Action::None
        }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn form(&self) -> &ControlForm {
        &self.form
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.scheduler.state()
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fetcher::tests::{serve_once, BTC_BODY};
    use crate::shared::fetcher::{FetchError, HttpSnapshotFetcher};
    use crate::shared::scheduler::tests::{next_completion, ScriptedFetcher};
    use crate::shared::sort::{SortDirection, SortKey, SortPreference};
    use crate::shared::types::{MetricRecord, Snapshot};
    use std::time::Duration;

    fn record(symbol: &str, spread: f64) -> MetricRecord {
        MetricRecord {
            symbol: symbol.to_string(),
            ex_a: "binance".to_string(),
            ex_b: "okx".to_string(),
            mid_a: Some(100.0),
            mid_b: Some(100.1),
            spread_pct: spread,
            avg_spread_pct: None,
            zscore: None,
            funding_a: None,
            funding_b: None,
            funding_avg: None,
            window_sec: Some(300),
            samples: 5,
        }
    }

    fn symbols<F: SnapshotFetcher>(dashboard: &Dashboard<F>) -> Vec<String> {
        dashboard
            .reconciler()
            .rows()
            .iter()
            .map(|row| row.cells[0].clone())
            .collect()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn scripted() -> (
        Dashboard<ScriptedFetcher>,
        Arc<ScriptedFetcher>,
        mpsc::UnboundedReceiver<RefreshEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let dashboard = Dashboard::new(&MonitorConfig::default(), Arc::clone(&fetcher), tx);
        (dashboard, fetcher, rx)
    }

    #[tokio::test]
    async fn test_slow_earlier_fetch_never_overwrites_newer_one() {
        let (mut dashboard, fetcher, mut rx) = scripted();
        let first = fetcher.script().await;
        let second = fetcher.script().await;

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        tokio::task::yield_now().await;
        dashboard.handle_refresh_event(RefreshEvent::Tick);

        second
            .send(Ok(Snapshot::new(vec![record("NEW", 0.2)], "t2")))
            .unwrap();
        assert!(dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await)));

        first
            .send(Ok(Snapshot::new(vec![record("OLD", 0.1)], "t1")))
            .unwrap();
        assert!(!dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await)));

        assert_eq!(symbols(&dashboard), vec!["NEW"]);
        assert_eq!(dashboard.reconciler().status().to_string(), "updated t2, 1 row");
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_table() {
        let (mut dashboard, fetcher, mut rx) = scripted();
        let ok = fetcher.script().await;
        let failed = fetcher.script().await;

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        ok.send(Ok(Snapshot::new(vec![record("A", 0.1), record("B", -0.4)], "t1")))
            .unwrap();
        dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await));
        let rows = dashboard.reconciler().rows().to_vec();

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        failed
            .send(Err(FetchError::Reported("rate limited".to_string())))
            .unwrap();
        assert!(dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await)));

        assert_eq!(dashboard.reconciler().rows(), rows.as_slice());
        assert!(dashboard.reconciler().status().to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_apply_commits_controls_and_fetches_with_new_window() {
        let (mut dashboard, fetcher, mut rx) = scripted();
        let first = fetcher.script().await;
        let applied = fetcher.script().await;

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        first
            .send(Ok(Snapshot::new(vec![record("A", 0.1), record("B", -0.4)], "t1")))
            .unwrap();
        dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await));
        assert_eq!(symbols(&dashboard), vec!["B", "A"]);

        // window 300 -> 60, sort spread_abs desc -> spread desc
        for _ in 0..3 {
            dashboard.handle_key(press(KeyCode::Backspace));
        }
        dashboard.handle_key(press(KeyCode::Char('6')));
        dashboard.handle_key(press(KeyCode::Char('0')));
        dashboard.handle_key(press(KeyCode::Tab));
        dashboard.handle_key(press(KeyCode::Right));

        // staged only
        assert_eq!(dashboard.settings().window_seconds, 300);

        assert_eq!(dashboard.handle_key(press(KeyCode::Enter)), Action::Redraw);
        assert_eq!(dashboard.settings().window_seconds, 60);
        assert_eq!(
            dashboard.settings().sort,
            SortPreference::new(SortKey::Spread, SortDirection::Desc)
        );
        assert_eq!(symbols(&dashboard), vec!["A", "B"]);

        applied
            .send(Ok(Snapshot::new(vec![record("C", 0.3)], "t2")))
            .unwrap();
        dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await));
        assert_eq!(symbols(&dashboard), vec!["C"]);
        assert_eq!(*fetcher.windows.lock().await, vec![300, 60]);

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        tokio::task::yield_now().await;
        assert_eq!(fetcher.windows.lock().await.last(), Some(&60));
    }

    #[tokio::test]
    async fn test_garbage_window_applies_default() {
        let (mut dashboard, _fetcher, _rx) = scripted();
        for _ in 0..3 {
            dashboard.handle_key(press(KeyCode::Backspace));
        }
        dashboard.handle_key(press(KeyCode::Char('0')));
        dashboard.handle_key(press(KeyCode::Enter));

        assert_eq!(dashboard.settings().window_seconds, 300);
        assert_eq!(dashboard.form().window_input(), "300");
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let (mut dashboard, _fetcher, _rx) = scripted();
        assert_eq!(dashboard.handle_key(press(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(dashboard.handle_key(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            dashboard.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(dashboard.handle_key(press(KeyCode::F(5))), Action::None);
    }

    #[tokio::test]
    async fn test_end_to_end_over_http() {
        let (base, server) = serve_once("200 OK", BTC_BODY).await;
        let fetcher = Arc::new(HttpSnapshotFetcher::new(&base, Duration::from_secs(5)).unwrap());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = MonitorConfig::default()
            .with_window_seconds(300)
            .with_sort(SortPreference::new(SortKey::Spread, SortDirection::Desc));
        let mut dashboard = Dashboard::new(&config, fetcher, tx);

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        let completion = next_completion(&mut rx).await;
        assert!(dashboard.handle_refresh_event(RefreshEvent::Completed(completion)));

        let rows = dashboard.reconciler().rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell("Spread %"), Some("0.0199"));
        assert_eq!(rows[0].cell("Mid A"), Some("50000.12345678"));
        assert_eq!(
            dashboard.reconciler().status().to_string(),
            "updated 2024-01-01T00:00:00Z, 1 row"
        );
        assert!(server.await.unwrap().starts_with("GET /api/data?window=300 "));
    }

    #[tokio::test]
    async fn test_end_to_end_reported_error_over_http() {
        let (mut dashboard, fetcher, mut rx) = scripted();
        let ok = fetcher.script().await;
        let reported = fetcher.script().await;

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        ok.send(Ok(Snapshot::new(vec![record("A", 0.1)], "t1"))).unwrap();
        dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await));
        let rows = dashboard.reconciler().rows().to_vec();

        let (base, server) = serve_once("200 OK", r#"{"ok":false,"error":"rate limited"}"#).await;
        let http = HttpSnapshotFetcher::new(&base, Duration::from_secs(5)).unwrap();
        let result = http.fetch(300).await;
        server.await.unwrap();

        dashboard.handle_refresh_event(RefreshEvent::Tick);
        reported.send(result).unwrap();
        assert!(dashboard.handle_refresh_event(RefreshEvent::Completed(next_completion(&mut rx).await)));

        assert_eq!(dashboard.reconciler().rows(), rows.as_slice());
        assert_eq!(
            dashboard.reconciler().status().to_string(),
            "backend error: rate limited"
        );
    }
}
