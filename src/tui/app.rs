//! Main TUI application state and logic

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tracing::{debug, info};

use super::data_screen::{DataScreen, ScreenAction};
use super::ui::{centered_rect, Styles};
use crate::api::ApiClient;
use crate::config::Config;
use crate::export::{DirectorySink, ExportAdapter, ExportFormat};
use crate::notify::{NoticeLog, Notifier};
use crate::screens::{contracts, dashboard, facilities, transactions, ScreenKind};

/// A destructive action waiting for a yes/no answer
#[derive(Debug, Clone, PartialEq)]
pub enum Confirm {
    DeleteTransaction { id: String, number: String },
}

/// Main TUI application state
pub struct App {
    pub config: Config,
    client: ApiClient,
    sink: DirectorySink,
    pub notices: NoticeLog,

    pub screens: Vec<DataScreen>,
    pub current: usize,

    pub should_quit: bool,
    pub show_help_popup: bool,
    pub confirm: Option<Confirm>,
    /// Screen whose load should run after the next draw
    pending_load: Option<usize>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        let sink = DirectorySink::new(config.export_dir.clone());
        let screens = ScreenKind::ALL.iter().map(|kind| DataScreen::new(*kind)).collect();

        Ok(Self {
            config,
            client,
            sink,
            notices: NoticeLog::new(),
            screens,
            current: 0,
            should_quit: false,
            show_help_popup: false,
            confirm: None,
            pending_load: Some(0),
        })
    }

    /// Switch to a screen by kind; it loads on first visit
    pub fn open(&mut self, kind: ScreenKind) {
        if let Some(index) = self.screens.iter().position(|s| s.kind() == kind) {
            self.select_screen(index);
        }
    }

    fn select_screen(&mut self, index: usize) {
        self.current = index;
        let screen = &self.screens[index];
        let needs_load = !screen.loaded && screen.kind() != ScreenKind::ContractReports;
        self.pending_load = needs_load.then_some(index);
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;

            if let Some(index) = self.pending_load.take() {
                self.load_screen(index).await;
                continue;
            }

            if let Ok(crossterm::event::Event::Key(key)) = crossterm::event::read() {
                if key.kind == KeyEventKind::Press {
                    self.handle_key_event(key).await?;
                }
            }

            if self.should_quit {
                break;
            }
        }

        for screen in &mut self.screens {
            screen.view.close();
        }
        Ok(())
    }

    /// Mark the screen as loading; the fetch itself runs after the next draw
    fn request_load(&mut self, index: usize) {
        let screen = &self.screens[index];
        if screen.kind() == ScreenKind::ContractReports && screen.report_type.is_none() {
            self.notices.error(contracts::CHOOSE_REPORT_TYPE);
            return;
        }
        self.pending_load = Some(index);
    }

    async fn load_screen(&mut self, index: usize) {
        let screen = &mut self.screens[index];
        let ticket = screen.view.begin_load();
        debug!("Loading {} screen", screen.kind().key());

        let data = screen.def.load(&self.client, &self.notices).await;
        screen.finish_load(ticket, data);
    }

    /// Handle keyboard input events
    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(confirm) = self.confirm.take() {
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter) {
                self.run_confirmed(confirm).await;
            }
            return Ok(());
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('n') if ctrl => {
                self.select_screen((self.current + 1) % self.screens.len());
                return Ok(());
            }
            KeyCode::Char('p') if ctrl => {
                let count = self.screens.len();
                self.select_screen((self.current + count - 1) % count);
                return Ok(());
            }
            KeyCode::F(1) => {
                self.show_help_popup = !self.show_help_popup;
                return Ok(());
            }
            KeyCode::Esc if self.show_help_popup => {
                self.show_help_popup = false;
                return Ok(());
            }
            KeyCode::F(6) if self.screens[self.current].kind() == ScreenKind::ContractReports => {
                let report_type = self.screens[self.current].cycle_report_type();
                self.notices.info(report_type.label());
                return Ok(());
            }
            _ => {}
        }

        if self.show_help_popup {
            return Ok(());
        }

        if let Some(action) = self.screens[self.current].handle_key(key) {
            self.run_action(action).await;
        }
        Ok(())
    }

    async fn run_action(&mut self, action: ScreenAction) {
        let index = self.current;
        let kind = self.screens[index].kind();

        match action {
            ScreenAction::Reload => self.request_load(index),
            ScreenAction::ApplyFilters => {
                let screen = &mut self.screens[index];
                if kind == ScreenKind::ContractDashboard {
                    dashboard::apply_filters(&mut screen.view, &self.notices);
                } else {
                    screen.view.reapply();
                }
                screen.clamp_selection();
            }
            ScreenAction::ClearFilters => {
                let screen = &mut self.screens[index];
                if kind == ScreenKind::ContractDashboard {
                    dashboard::clear_filters(&mut screen.view, &self.notices);
                } else {
                    screen.view.clear_filters();
                }
                screen.clamp_selection();
            }
            ScreenAction::Export(format) => self.export(index, format),
            ScreenAction::PrintSelected => self.print(index),
            ScreenAction::DeleteSelected if kind == ScreenKind::Transactions => {
                if let Some(record) = self.screens[index].selected_record() {
                    self.confirm = Some(Confirm::DeleteTransaction {
                        id: record.id(),
                        number: record.text("transactionNumber"),
                    });
                }
            }
            ScreenAction::ToggleSelected if kind == ScreenKind::Facilities => {
                let Some(id) = self.screens[index].selected_record().map(|r| r.id()) else {
                    return;
                };
                // a rejected write leaves the table and its phase untouched
                match facilities::toggle_facility(&self.client, &self.client, &self.notices, &id).await {
                    Ok(data) => {
                        let screen = &mut self.screens[index];
                        let ticket = screen.view.begin_load();
                        screen.finish_load(ticket, data);
                    }
                    Err(e) => debug!("Toggle of facility {} failed: {}", id, e),
                }
            }
            ScreenAction::DeleteSelected | ScreenAction::ToggleSelected => {}
        }
    }

    async fn run_confirmed(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::DeleteTransaction { id, .. } => {
                if let Some(screen) = self.screens.iter_mut().find(|s| s.kind() == ScreenKind::Transactions) {
                    if transactions::delete_transaction(&self.client, &self.notices, &mut screen.view, &id)
                        .await
                        .is_ok()
                    {
                        info!("Deleted transaction {}", id);
                        screen.clamp_selection();
                    }
                }
            }
        }
    }

    fn export(&self, index: usize, format: ExportFormat) {
        let screen = &self.screens[index];
        let Some(spec) = &screen.def.export else {
            self.notices.warning("لا يتوفر التصدير في هذه الشاشة");
            return;
        };
        let columns = match format {
            ExportFormat::Document => &spec.document,
            _ => &spec.spreadsheet,
        };
        let title = match format {
            ExportFormat::Document if screen.kind() == ScreenKind::Transactions => "تقرير المعاملات الإدارية",
            _ => spec.title,
        };

        let adapter = ExportAdapter::new(&self.sink, &self.sink, &self.notices);
        let outcome = adapter.export(screen.view.visible(), columns, format, title);
        debug!("Export outcome: {:?}", outcome);
    }

    /// Transactions print the selected record; other exportable screens print the table
    fn print(&self, index: usize) {
        let screen = &self.screens[index];
        let adapter = ExportAdapter::new(&self.sink, &self.sink, &self.notices);

        if screen.kind() == ScreenKind::Transactions {
            if let Some(record) = screen.selected_record() {
                adapter.print_record(record, &transactions::print_columns(), &transactions::print_title(record));
                return;
            }
        }
        self.export(index, ExportFormat::Print);
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_tabs(f, chunks[0]);
        let current = self.current;
        self.screens[current].draw(f, chunks[1]);
        self.draw_status_bar(f, chunks[2]);

        if let Some(confirm) = &self.confirm {
            self.draw_confirm(f, size, confirm);
        } else if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    fn draw_tabs(&self, f: &mut Frame, area: Rect) {
        let titles: Vec<Line> = self.screens.iter().map(|s| Line::from(s.kind().title())).collect();
        let tabs = Tabs::new(titles)
            .select(self.current)
            .highlight_style(Styles::selected())
            .block(Block::default().borders(Borders::ALL).title("procdesk"));
        f.render_widget(tabs, area);
    }

    /// Status bar: the latest notice, or the key reminder
    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let line = match self.notices.last() {
            Some(notice) => Line::from(vec![
                Span::styled(format!("[{}] ", notice.timestamp.format("%H:%M:%S")), Styles::inactive()),
                Span::styled(notice.message, Styles::notice(notice.kind)),
            ]),
            None => Line::from(Span::styled(
                "Ctrl+N/P: Screens | Tab: Filters | F5: Reload | F1: Help | Ctrl+C: Quit",
                Styles::inactive(),
            )),
        };

        let status_bar = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        f.render_widget(status_bar, area);
    }

    fn draw_confirm(&self, f: &mut Frame, area: Rect, confirm: &Confirm) {
        let popup = centered_rect(50, 20, area);
        let text = match confirm {
            Confirm::DeleteTransaction { number, .. } => {
                format!("{}\n{}\n\n(y) نعم    (n) لا", transactions::DELETE_PROMPT, number)
            }
        };

        f.render_widget(Clear, popup);
        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title("تأكيد")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            );
        f.render_widget(paragraph, popup);
    }

    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 70, area);
        let mut lines = vec![
            "Ctrl+N / Ctrl+P  Next / previous screen",
            "Tab / Shift+Tab  Focus next / previous filter",
            "Type, Backspace  Edit a text filter",
            "Left / Right     Cycle the options of a list filter",
            "Up / Down        Select a row",
            "Enter            Apply filters",
            "Esc              Clear filters",
            "F5               Reload the screen",
            "F2 / F3          Export to spreadsheet / PDF",
            "F4               Print the selected transaction or the table",
        ];
        match self.screens[self.current].kind() {
            ScreenKind::ContractReports => lines.push("F6               Choose the report type"),
            ScreenKind::Facilities => lines.push("F7               Toggle the selected facility"),
            ScreenKind::Transactions => lines.push("Delete           Delete the selected transaction"),
            _ => {}
        }
        lines.push("");
        lines.push(
            "Exports are written to the export directory; prints as HTML pages that open the print dialog.",
        );

        let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
        f.render_widget(Clear, popup);
        let paragraph = Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(format!("Help - {}", self.config.api_url))
                .title_style(Styles::title())
                .borders(Borders::ALL),
        );
        f.render_widget(paragraph, popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use tempfile::TempDir;

    fn app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config::default()
            .with_api_url("http://127.0.0.1:9")
            .with_export_dir(dir.path());
        (App::new(config).unwrap(), dir)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[tokio::test]
    async fn test_screen_switching_wraps() {
        let (mut app, _dir) = app();
        app.handle_key_event(ctrl('p')).await.unwrap();
        assert_eq!(app.current, app.screens.len() - 1);
        app.handle_key_event(ctrl('n')).await.unwrap();
        assert_eq!(app.current, 0);
    }

    #[tokio::test]
    async fn test_reports_reload_needs_report_type() {
        let (mut app, _dir) = app();
        app.open(ScreenKind::ContractReports);
        app.pending_load = None;

        app.handle_key_event(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE))
            .await
            .unwrap();
        assert!(app.pending_load.is_none());
        assert_eq!(app.notices.last().unwrap().message, contracts::CHOOSE_REPORT_TYPE);

        app.handle_key_event(KeyEvent::new(KeyCode::F(6), KeyModifiers::NONE))
            .await
            .unwrap();
        app.handle_key_event(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE))
            .await
            .unwrap();
        assert_eq!(app.pending_load, Some(app.current));
    }

    #[tokio::test]
    async fn test_failed_toggle_keeps_facilities_usable() {
        let (mut app, _dir) = app();
        app.open(ScreenKind::Facilities);
        app.pending_load = None;
        {
            let screen = &mut app.screens[app.current];
            screen.view.set_source(facilities::sample_facilities());
            screen.loaded = true;
            screen.clamp_selection();
        }
        let phase_before = app.screens[app.current].view.phase();

        app.handle_key_event(KeyEvent::new(KeyCode::F(7), KeyModifiers::NONE))
            .await
            .unwrap();

        let screen = &app.screens[app.current];
        assert_eq!(screen.view.phase(), phase_before);
        assert_ne!(screen.view.phase(), crate::view::Phase::Loading);
        assert_eq!(screen.view.in_flight(), 0);
        assert_eq!(screen.view.visible().len(), 3);
        assert_eq!(app.notices.len(), 1);
        assert_eq!(app.notices.last().unwrap().kind, crate::notify::NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_export_without_rows_is_refused() {
        let (mut app, dir) = app();
        app.open(ScreenKind::Transactions);
        app.handle_key_event(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE))
            .await
            .unwrap();

        assert_eq!(app.notices.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
