//! One data screen of the TUI: summary, filter bar and the visible table

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::export::ExportFormat;
use crate::filter::ALL;
use crate::models::Record;
use crate::screens::contracts::ReportType;
use crate::screens::{ScreenData, ScreenDef, ScreenKind};
use crate::source::Origin;
use crate::tui::ui::{column_widths, fit, Styles};
use crate::view::{LoadTicket, Phase, ViewState};

const MAX_CELL_WIDTH: usize = 30;

/// What a key press on a data screen asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAction {
    Reload,
    Export(ExportFormat),
    PrintSelected,
    ApplyFilters,
    ClearFilters,
    DeleteSelected,
    ToggleSelected,
}

pub struct DataScreen {
    pub def: ScreenDef,
    pub view: ViewState,
    pub summary: Vec<String>,
    pub table_state: TableState,
    /// Index of the filter control receiving key input
    pub focused_filter: Option<usize>,
    /// Report type of the contract reports screen; none until chosen
    pub report_type: Option<ReportType>,
    pub loaded: bool,
    origin: Option<Origin>,
}

impl DataScreen {
    pub fn new(kind: ScreenKind) -> Self {
        let def = kind.definition();
        let view = def.new_view();
        Self {
            def,
            view,
            summary: Vec::new(),
            table_state: TableState::default(),
            focused_filter: None,
            report_type: None,
            loaded: false,
            origin: None,
        }
    }

    pub fn kind(&self) -> ScreenKind {
        self.def.kind
    }

    /// Hand a finished load to the view and reset the selection
    pub fn finish_load(&mut self, ticket: LoadTicket, data: ScreenData) {
        let origin = data.records.origin;
        self.summary = data.apply_to(&mut self.view, ticket);
        self.origin = Some(origin);
        self.loaded = true;
        self.clamp_selection();
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.table_state.selected().and_then(|i| self.view.visible().get(i))
    }

    /// Pick the next report type and point the contract source at it
    pub fn cycle_report_type(&mut self) -> ReportType {
        let next = self
            .report_type
            .map(|t| t.next())
            .unwrap_or(ReportType::AllContracts);
        self.report_type = Some(next);
        self.def.primary = crate::screens::contracts::source(next);
        next
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ScreenAction> {
        match key.code {
            KeyCode::Tab => {
                self.focus_next(true);
                None
            }
            KeyCode::BackTab => {
                self.focus_next(false);
                None
            }
            KeyCode::Up => {
                self.select_offset(-1);
                None
            }
            KeyCode::Down => {
                self.select_offset(1);
                None
            }
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                if let Some(index) = self.focused_filter {
                    self.view.edit_filters(|filters| {
                        if let Some(control) = filters.controls_mut().get_mut(index) {
                            control.cycle_option(forward);
                        }
                    });
                    self.clamp_selection();
                }
                None
            }
            KeyCode::Backspace => {
                self.edit_focused_text(|value| {
                    value.pop();
                });
                None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_focused_text(|value| value.push(c));
                None
            }
            KeyCode::Esc => {
                self.focused_filter = None;
                Some(ScreenAction::ClearFilters)
            }
            KeyCode::Enter => Some(ScreenAction::ApplyFilters),
            KeyCode::F(5) => Some(ScreenAction::Reload),
            KeyCode::F(2) => Some(ScreenAction::Export(ExportFormat::Spreadsheet)),
            KeyCode::F(3) => Some(ScreenAction::Export(ExportFormat::Document)),
            KeyCode::F(4) => Some(ScreenAction::PrintSelected),
            KeyCode::F(7) => Some(ScreenAction::ToggleSelected),
            KeyCode::Delete => Some(ScreenAction::DeleteSelected),
            _ => None,
        }
    }

    fn focus_next(&mut self, forward: bool) {
        let count = self.view.filters().len();
        if count == 0 {
            return;
        }
        // slot `count` means no filter focused
        let slots = count + 1;
        let current = self.focused_filter.unwrap_or(count);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.focused_filter = (next < count).then_some(next);
    }

    fn edit_focused_text<F: FnOnce(&mut String)>(&mut self, edit: F) {
        let Some(index) = self.focused_filter else {
            return;
        };
        let is_text = self
            .view
            .filters()
            .controls()
            .get(index)
            .map(|c| c.is_free_text())
            .unwrap_or(false);
        if !is_text {
            return;
        }

        self.view.edit_filters(|filters| {
            if let Some(control) = filters.controls_mut().get_mut(index) {
                edit(&mut control.spec.value);
            }
        });
        self.clamp_selection();
    }

    fn select_offset(&mut self, offset: isize) {
        let len = self.view.visible().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + offset).rem_euclid(len as isize) as usize;
        self.table_state.select(Some(next));
    }

    pub fn clamp_selection(&mut self) {
        let len = self.view.visible().len();
        let selected = match self.table_state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.table_state.select(selected);
    }

    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let summary_height = self.summary.len().max(1) as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(summary_height),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        self.draw_summary(f, chunks[0]);
        self.draw_filters(f, chunks[1]);
        self.draw_table(f, chunks[2]);
    }

    fn draw_summary(&self, f: &mut Frame, area: Rect) {
        let mut title = self.def.kind.title().to_string();
        if let Some(report_type) = self.report_type {
            title = format!("{} - {}", title, report_type.label());
        }
        if self.view.phase() == Phase::Degraded {
            title.push_str(" (بيانات تجريبية)");
        }

        let lines: Vec<Line> = if self.summary.is_empty() {
            vec![Line::from(self.hint())]
        } else {
            self.summary.iter().map(|s| Line::from(s.as_str())).collect()
        };

        let paragraph = Paragraph::new(lines).alignment(Alignment::Right).block(
            Block::default()
                .title(title)
                .title_style(Styles::title())
                .borders(Borders::ALL),
        );
        f.render_widget(paragraph, area);
    }

    fn hint(&self) -> &'static str {
        match self.def.kind {
            ScreenKind::ContractReports if self.report_type.is_none() => {
                "F6: اختيار نوع التقرير ثم F5 لإنشاء التقرير"
            }
            _ if !self.loaded => "F5: تحميل البيانات",
            _ => "",
        }
    }

    fn draw_filters(&self, f: &mut Frame, area: Rect) {
        let controls = self.view.filters().controls();
        if controls.is_empty() {
            return;
        }

        let constraints: Vec<Constraint> = controls
            .iter()
            .map(|_| Constraint::Ratio(1, controls.len() as u32))
            .collect();
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (index, (control, cell)) in controls.iter().zip(cells.iter()).enumerate() {
            let focused = self.focused_filter == Some(index);
            let value = match control.spec.value.as_str() {
                ALL => "الكل".to_string(),
                "" if !focused => String::new(),
                v => v.to_string(),
            };
            let display = if focused && control.is_free_text() {
                format!("{}▏", value)
            } else if focused {
                format!("◀ {} ▶", value)
            } else {
                value
            };

            let border = if focused {
                Styles::active_border()
            } else {
                Styles::inactive_border()
            };
            let width = cell.width.saturating_sub(2) as usize;
            let paragraph = Paragraph::new(fit(&display, width))
                .alignment(Alignment::Right)
                .block(
                    Block::default()
                        .title(control.label)
                        .borders(Borders::ALL)
                        .border_style(border),
                );
            f.render_widget(paragraph, *cell);
        }
    }

    fn draw_table(&mut self, f: &mut Frame, area: Rect) {
        let visible = self.view.visible();
        let title = format!("{} / {}", visible.len(), self.view.source().len());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Styles::origin_border(self.origin));

        let message = if self.view.is_loading() {
            Some("جاري التحميل...")
        } else if !self.loaded {
            Some("")
        } else {
            self.view.empty_message()
        };
        if let Some(message) = message {
            let paragraph = Paragraph::new(message)
                .style(Styles::inactive())
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(paragraph, area);
            return;
        }

        let labels = self.def.columns.labels();
        let rows = self.def.columns.rows(visible);
        let widths = column_widths(&labels, &rows, MAX_CELL_WIDTH);

        let header = Row::new(labels.iter().map(|l| l.to_string()).collect::<Vec<_>>()).style(Styles::header());
        let body: Vec<Row> = rows
            .into_iter()
            .map(|row| Row::new(row.into_iter().map(|cell| fit(&cell, MAX_CELL_WIDTH)).collect::<Vec<_>>()))
            .collect();

        let table = Table::new(body, widths)
            .header(header)
            .block(block)
            .highlight_style(Styles::selected());
        f.render_stateful_widget(table, area, &mut self.table_state);
    }
}
