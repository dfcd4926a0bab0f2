//! Ratatui rendering for the spread monitor: controls, table, status line

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use super::controls::{ControlForm, Field};
use super::reconciler::{RenderedRow, Status, COLUMNS};
use super::scheduler::RefreshState;

const C_BUY: Color = Color::Rgb(100, 220, 100);
const C_SELL: Color = Color::Rgb(220, 100, 100);
const C_NEUTRAL: Color = Color::Rgb(180, 180, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

/// Data younger than this is fresh
const FRESH_SECS: i64 = 3;
/// Data older than this is stale
const STALE_SECS: i64 = 10;

const COLUMN_WIDTHS: [Constraint; 12] = [
    Constraint::Length(14),
    Constraint::Length(9),
    Constraint::Length(9),
    Constraint::Length(18),
    Constraint::Length(18),
    Constraint::Length(10),
    Constraint::Length(13),
    Constraint::Length(8),
    Constraint::Length(11),
    Constraint::Length(11),
    Constraint::Length(12),
    Constraint::Length(8),
];

/// Everything the view reads, borrowed from the dashboard
pub struct DashboardView<'a> {
    pub form: &'a ControlForm,
    pub rows: &'a [RenderedRow],
    pub status: &'a Status,
    pub last_success: Option<chrono::DateTime<Utc>>,
    pub refresh: RefreshState,
    pub refreshing: bool,
    pub api_url: &'a str,
}

pub fn render_dashboard(f: &mut Frame, view: &DashboardView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_controls(f, chunks[0], view);
    render_table(f, chunks[1], view.rows);
    render_status(f, chunks[2], view);
}

fn control_style(form: &ControlForm, field: Field) -> Style {
    if form.focus() == field {
        Style::default()
            .fg(Color::Black)
            .bg(C_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)
    }
}

fn render_controls(f: &mut Frame, area: Rect, view: &DashboardView<'_>) {
    let form = view.form;
    let sort = form.sort_preference();
    let border_color = if view.refreshing { C_ACCENT } else { C_SELL };

    let block = Block::default()
        .title(format!(" PULSE CROSS-EXCHANGE MONITOR · {} ", view.api_url))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let line = Line::from(vec![
        Span::styled("WINDOW ", Style::default().fg(C_DIM)),
        Span::styled(format!(" {}s ", form.window_input()), control_style(form, Field::Window)),
        Span::styled("   SORT ", Style::default().fg(C_DIM)),
        Span::styled(format!(" {} ", sort.key), control_style(form, Field::SortKey)),
        Span::styled("   DIR ", Style::default().fg(C_DIM)),
        Span::styled(format!(" {} ", sort.direction), control_style(form, Field::Direction)),
        Span::styled(
            "   [Tab] focus  [←/→] select  [Enter] apply  [q] quit",
            Style::default().fg(C_DIM),
        ),
    ]);

    f.render_widget(Paragraph::new(line).block(block), area);
}

fn row_style(row: &RenderedRow) -> Style {
    match row.zscore {
        Some(z) if z.abs() > 1.5 => Style::default().fg(C_SELL).add_modifier(Modifier::BOLD),
        Some(z) if z.abs() > 1.0 => Style::default().fg(C_NEUTRAL),
        _ => Style::default().fg(C_BRIGHT),
    }
}

fn spread_color(spread_pct: f64) -> Color {
    if spread_pct > 0.0 {
        C_BUY
    } else if spread_pct < 0.0 {
        C_SELL
    } else {
        C_DIM
    }
}

fn render_table(f: &mut Frame, area: Rect, rows: &[RenderedRow]) {
    let header_cells = COLUMNS.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1);

    // spread column index
    let spread_column = 5;
    let body = rows.iter().map(|row| {
        let cells = row.cells.iter().enumerate().map(|(i, content)| {
            let cell = Cell::from(content.as_str());
            if i == spread_column {
                cell.style(Style::default().fg(spread_color(row.spread_pct)))
            } else {
                cell
            }
        });
        Row::new(cells).style(row_style(row)).height(1)
    });

    let table = Table::new(body, COLUMN_WIDTHS).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" SPREADS ({}) ", rows.len()))
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(table, area);
}

/// Age label and colour for the displayed data
pub fn freshness(last_success: Option<chrono::DateTime<Utc>>, now: chrono::DateTime<Utc>) -> (String, Color) {
    match last_success {
        None => ("no data".to_string(), C_DIM),
        Some(at) => {
            let age = (now - at).num_seconds().max(0);
            let color = if age < FRESH_SECS {
                C_BUY
            } else if age < STALE_SECS {
                C_NEUTRAL
            } else {
                C_SELL
            };
            (format!("{}s ago", age), color)
        }
    }
}

fn render_status(f: &mut Frame, area: Rect, view: &DashboardView<'_>) {
    let status_color = match view.status {
        Status::Failed(_) => C_SELL,
        Status::Waiting => C_DIM,
        Status::Updated { .. } => C_BRIGHT,
    };
    let (age, age_color) = freshness(view.last_success, Utc::now());
    let in_flight = if view.refresh.in_flight.is_some() { "fetching" } else { "idle" };

    let line = Line::from(vec![
        Span::styled(view.status.to_string(), Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
        Span::styled("   DATA ", Style::default().fg(C_DIM)),
        Span::styled(age, Style::default().fg(age_color)),
        Span::styled(
            format!("   #{} {}", view.refresh.last_dispatched, in_flight),
            Style::default().fg(C_DIM),
        ),
    ]);

    let block = Block::default()
        .title(" STATUS ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_DIM));
    f.render_widget(Paragraph::new(line).block(block), area);
}
