/// Pulse Cross-Exchange Spread Monitor
///
/// Polls the aggregation backend once per second and shows per-symbol spread,
/// z-score and funding signals, sorted client-side.
use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pulse_monitor_tui::{
    shared::{
        config::log_file_from_env,
        logging::init_logging,
        widget::{render_dashboard, DashboardView},
    },
    Action, Dashboard, HttpSnapshotFetcher, MonitorConfig, RefreshEvent, SnapshotFetcher,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::info;

/// How long one input poll may block the loop
const INPUT_POLL: Duration = Duration::from_millis(50);
/// Redraw at least this often so the freshness age keeps moving
const MIN_REDRAW: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging(&log_file_from_env())?;

    let config = MonitorConfig::from_env()?;
    info!(
        api_url = %config.api_url,
        window_seconds = config.settings.window_seconds,
        sort = %config.settings.sort,
        "Starting Pulse spread monitor"
    );

    let fetcher = Arc::new(HttpSnapshotFetcher::new(&config.api_url, config.request_timeout)?);
    let api_url = fetcher.endpoint().to_string();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut dashboard = Dashboard::new(&config, fetcher, event_tx);

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    dashboard.start();
    let result = run(&mut terminal, &mut dashboard, &mut event_rx, &api_url);
    dashboard.stop();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("Pulse spread monitor stopped");
    result
}

fn run<F: SnapshotFetcher>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    dashboard: &mut Dashboard<F>,
    event_rx: &mut mpsc::UnboundedReceiver<RefreshEvent>,
    api_url: &str,
) -> Result<(), Box<dyn Error>> {
    let mut dirty = true;
    let mut last_draw = Instant::now();

    loop {
        while let Ok(refresh_event) = event_rx.try_recv() {
            dirty |= dashboard.handle_refresh_event(refresh_event);
        }

        if dirty || last_draw.elapsed() >= MIN_REDRAW {
            let reconciler = dashboard.reconciler();
            let view = DashboardView {
                form: dashboard.form(),
                rows: reconciler.rows(),
                status: reconciler.status(),
                last_success: reconciler.last_success(),
                refresh: dashboard.refresh_state(),
                refreshing: dashboard.is_refreshing(),
                api_url,
            };
            terminal.draw(|f| render_dashboard(f, &view))?;
            dirty = false;
            last_draw = Instant::now();
        }

        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                match dashboard.handle_key(key) {
                    Action::Quit => break,
                    Action::Redraw => dirty = true,
                    Action::None => {}
                }
            }
        }
    }

    Ok(())
}
