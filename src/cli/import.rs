use std::path::{Path, PathBuf};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Cell, LineGauge, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};

use crate::cli::default_output_path;
use crate::cli::map::write_payload;
use crate::error::{FinmapError, Result};
use crate::importer::{infer_cell, parse_file};
use crate::settings::{load_settings, shellexpand_path, Settings};
use crate::taxonomy::Taxonomy;
use crate::tui::{self, FOOTER_STYLE, HEADER_STYLE, REQUIRED_STYLE, SELECTED_STYLE};
use crate::wizard::{ImportWizard, Stage, Step};

const PICKER_SIZE: usize = 9;

enum Mode {
    Normal,
    EditCell(String),
    PickCategory { query: String, selection: usize },
}

enum HandleResult {
    Continue,
    Complete,
    Cancel,
}

struct ImportScreen<'t> {
    wizard: ImportWizard<'t>,
    path: PathBuf,
    sheet: Option<String>,
    settings: Settings,
    mode: Mode,
    row: usize,
    column: usize,
    mapping: usize,
    auto_mapped: bool,
    status_message: Option<String>,
    table_state: TableState,
}

impl<'t> ImportScreen<'t> {
    fn new(
        wizard: ImportWizard<'t>,
        path: PathBuf,
        sheet: Option<String>,
        settings: Settings,
    ) -> Self {
        Self {
            wizard,
            path,
            sheet,
            settings,
            mode: Mode::Normal,
            row: 0,
            column: 0,
            mapping: 0,
            auto_mapped: false,
            status_message: None,
            table_state: TableState::default(),
        }
    }

    /// Category labels matching the picker query, as (id, label).
    fn filtered_categories(&self, query: &str) -> Vec<(String, String)> {
        let q = query.to_lowercase();
        self.wizard
            .taxonomy()
            .iter()
            .filter(|c| {
                q.is_empty()
                    || c.name.to_lowercase().contains(&q)
                    || c.id.contains(&q)
                    || c.group.key().contains(&q)
            })
            .map(|c| {
                let tag = if c.required { " *" } else { "" };
                (c.id.clone(), format!("{} ({}){tag}", c.name, c.group.name()))
            })
            .take(PICKER_SIZE)
            .collect()
    }

    fn selected_column(&self) -> Option<String> {
        self.wizard
            .columns()
            .get(self.column)
            .map(|c| c.to_string())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [stepper_area, title_area, body_area, edit_area, status_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Fill(1),
                Constraint::Length(self.edit_height()),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(Paragraph::new(tui::stepper_line(&self.wizard)), stepper_area);

        let stage = self.wizard.stage();
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(format!(" {}", stage.title()), HEADER_STYLE)),
                Line::from(Span::styled(format!(" {}", stage.description()), FOOTER_STYLE)),
            ]),
            title_area,
        );

        match stage {
            Stage::Upload => self.draw_upload(frame, body_area),
            Stage::Preview => self.draw_preview(frame, body_area),
            Stage::Map => self.draw_map(frame, body_area),
            Stage::Confirm => self.draw_confirm(frame, body_area),
        }

        let edit_lines: Vec<Line> = match &self.mode {
            Mode::Normal => vec![],
            Mode::EditCell(input) => vec![Line::from(format!(
                "  {}: {input}\u{2588}",
                self.selected_column().unwrap_or_default()
            ))],
            Mode::PickCategory { query, selection } => {
                let matches = self.filtered_categories(query);
                let mut lines = vec![Line::from(format!("  Category: {query}\u{2588}"))];
                if matches.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "    (no matches)",
                        Style::default().fg(Color::DarkGray),
                    )));
                } else {
                    for (i, (_, label)) in matches.iter().enumerate() {
                        let marker = if i == *selection { ">" } else { " " };
                        lines.push(Line::from(format!("  {marker} {label}")));
                    }
                }
                lines
            }
        };
        frame.render_widget(Paragraph::new(edit_lines), edit_area);

        let status = match &self.status_message {
            Some(msg) => msg.clone(),
            None if !self.wizard.can_proceed() => "Complete this step to continue".to_string(),
            None => String::new(),
        };
        frame.render_widget(
            Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
            status_area,
        );
        frame.render_widget(Paragraph::new(self.hints()).style(FOOTER_STYLE), hints_area);
    }

    fn edit_height(&self) -> u16 {
        match self.mode {
            Mode::Normal => 0,
            Mode::EditCell(_) => 1,
            Mode::PickCategory { .. } => PICKER_SIZE as u16 + 1,
        }
    }

    fn hints(&self) -> &'static str {
        match (&self.mode, self.wizard.stage()) {
            (Mode::EditCell(_), _) => "Enter=save, Esc=discard",
            (Mode::PickCategory { .. }, _) => "Type to filter, Up/Down, Enter=map, Esc=close",
            (Mode::Normal, Stage::Upload) => "r=reload file, Right=next, Esc=cancel",
            (Mode::Normal, Stage::Preview) => {
                "Up/Down=row, Tab=column, Enter=edit cell, Left/Right=step, Esc=cancel"
            }
            (Mode::Normal, Stage::Map) => {
                "Up/Down=column, Enter=pick, u=unmap, a=auto-map, c=clear, Left/Right=step, Esc=cancel"
            }
            (Mode::Normal, Stage::Confirm) => "Enter=complete import, Left=back, Esc=cancel",
        }
    }

    fn draw_upload(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let mut lines = vec![Line::from("")];
        match self.wizard.file() {
            Some(file) => {
                lines.push(Line::from(format!("  File:    {}", file.file_name)));
                lines.push(Line::from(format!("  Sheets:  {}", file.sheet_names.join(", "))));
                lines.push(Line::from(format!("  Rows:    {}", file.row_count)));
                lines.push(Line::from(Span::styled(
                    format!("  SHA-256: {}", file.checksum),
                    FOOTER_STYLE,
                )));
            }
            None => lines.push(Line::from(format!(
                "  Press r to read {}",
                self.path.display()
            ))),
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_preview(&mut self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let columns = self.wizard.columns();
        let col_width = (area.width as usize)
            .saturating_sub(6)
            .checked_div(columns.len().max(1))
            .unwrap_or(12)
            .clamp(8, 24);

        let header: Vec<Cell> = std::iter::once(Cell::from("#"))
            .chain(columns.iter().enumerate().map(|(i, c)| {
                let style = if i == self.column { SELECTED_STYLE } else { HEADER_STYLE };
                Cell::from(c.to_string()).style(style)
            }))
            .collect();

        let rows: Vec<Row> = self
            .wizard
            .rows()
            .iter()
            .take(self.settings.preview_rows.max(1))
            .enumerate()
            .map(|(i, row)| {
                let mut cells = vec![Cell::from((i + 1).to_string())];
                let mut height = 1;
                for col in &columns {
                    let value = row.get(col);
                    let cell = match value {
                        Some(v) if v.is_blank() => Cell::from(""),
                        Some(v) if v.as_f64().is_some() => Cell::from(tui::cell_span(v)),
                        Some(v) => {
                            let (wrapped, lines) = tui::wrap_text(&crate::fmt::cell(v), col_width);
                            height = height.max(lines);
                            Cell::from(wrapped)
                        }
                        None => Cell::from(""),
                    };
                    cells.push(cell);
                }
                Row::new(cells).height(height)
            })
            .collect();

        let widths: Vec<Constraint> = std::iter::once(Constraint::Length(4))
            .chain(columns.iter().map(|_| Constraint::Length(col_width as u16)))
            .collect();

        self.table_state.select(Some(self.row));
        let table = Table::new(rows, widths)
            .header(Row::new(header).bottom_margin(1))
            .column_spacing(1)
            .row_highlight_style(SELECTED_STYLE);
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_map(&mut self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let [gauge_area, table_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(area);

        let progress = self.wizard.progress();
        let gauge_color = if self.wizard.unmapped_required().is_empty() {
            Color::Green
        } else {
            Color::Yellow
        };
        let gauge = LineGauge::default()
            .label(format!(
                "{} of {} required fields mapped",
                progress.mapped_required_count, progress.required_category_count
            ))
            .ratio(f64::from(progress.completion_percent.min(100)) / 100.0)
            .filled_style(Style::default().fg(gauge_color).bold())
            .unfilled_style(Style::default().fg(Color::DarkGray))
            .line_set(ratatui::symbols::line::THICK);
        frame.render_widget(gauge, gauge_area);

        let taxonomy = self.wizard.taxonomy();
        let sample = self.wizard.rows().first();
        let rows: Vec<Row> = self
            .wizard
            .mappings()
            .iter()
            .map(|m| {
                let category = m.mapped_category.as_deref().and_then(|id| taxonomy.get(id));
                let target = match category {
                    Some(c) => Span::raw(format!("{} ({})", c.name, c.group.name())),
                    None => Span::styled("\u{2014}", FOOTER_STYLE),
                };
                let required = if m.required {
                    Span::styled("required", REQUIRED_STYLE)
                } else {
                    Span::raw("")
                };
                let example = sample
                    .and_then(|r| r.get(&m.source_column))
                    .map(tui::cell_span)
                    .unwrap_or_default();
                Row::new(vec![
                    Cell::from(m.source_column.clone()),
                    Cell::from(m.value_type.key()),
                    Cell::from(example),
                    Cell::from(target),
                    Cell::from(required),
                ])
            })
            .collect();

        let widths = [
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Fill(1),
            Constraint::Length(8),
        ];
        self.table_state.select(Some(self.mapping));
        let table = Table::new(rows, widths)
            .header(
                Row::new(["Column", "Type", "Example", "Category", ""])
                    .style(HEADER_STYLE)
                    .bottom_margin(1),
            )
            .column_spacing(1)
            .row_highlight_style(SELECTED_STYLE);
        frame.render_stateful_widget(table, table_area, &mut self.table_state);
    }

    fn draw_confirm(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let summary = self.wizard.summary();
        let taxonomy = self.wizard.taxonomy();
        let mut lines = vec![
            Line::from(""),
            Line::from(format!("  File:            {}", summary.file_name)),
            Line::from(format!("  Sheets:          {}", summary.sheet_names.join(", "))),
            Line::from(format!("  Rows:            {}", summary.rows)),
            Line::from(format!(
                "  Mapped columns:  {} of {}",
                summary.mapped, summary.columns
            )),
            Line::from(format!(
                "  Required fields: {} of {} ({}%)",
                summary.progress.mapped_required_count,
                summary.progress.required_category_count,
                summary.progress.completion_percent
            )),
            Line::from(""),
        ];
        for m in self.wizard.mappings().iter().filter(|m| m.is_mapped()) {
            let name = m
                .mapped_category
                .as_deref()
                .and_then(|id| taxonomy.get(id))
                .map(|c| c.name.as_str())
                .unwrap_or_default();
            lines.push(Line::from(format!("    {} \u{2192} {name}", m.source_column)));
        }
        let missing = self.wizard.unmapped_required();
        if !missing.is_empty() {
            lines.push(Line::from(""));
            let names: Vec<&str> = missing.iter().map(|c| c.name.as_str()).collect();
            lines.push(Line::from(Span::styled(
                format!("  Still unmapped: {}", names.join(", ")),
                REQUIRED_STYLE,
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn handle_key(&mut self, code: KeyCode) -> HandleResult {
        self.status_message = None;
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::EditCell(input) => self.handle_edit(code, input),
            Mode::PickCategory { query, selection } => self.handle_picker(code, query, selection),
            Mode::Normal => return self.handle_normal(code),
        }
        HandleResult::Continue
    }

    fn handle_normal(&mut self, code: KeyCode) -> HandleResult {
        let stage = self.wizard.stage();
        match code {
            KeyCode::Esc => return HandleResult::Cancel,
            KeyCode::Right => self.forward(),
            KeyCode::Left => {
                if let Step::Blocked(gate) = self.wizard.back() {
                    self.status_message = Some(gate.message().to_string());
                }
            }
            KeyCode::Enter if stage == Stage::Confirm => return HandleResult::Complete,
            KeyCode::Char('r') if stage == Stage::Upload => self.reload(),
            _ if stage == Stage::Preview => self.handle_preview(code),
            _ if stage == Stage::Map => self.handle_map(code),
            _ => {}
        }
        HandleResult::Continue
    }

    fn forward(&mut self) {
        match self.wizard.next() {
            Step::Moved(Stage::Map) => {
                if self.settings.auto_map_on_load && !self.auto_mapped {
                    self.auto_mapped = true;
                    let result = self.wizard.auto_map();
                    self.report(result);
                }
            }
            Step::Moved(_) => {}
            Step::Blocked(gate) => self.status_message = Some(gate.message().to_string()),
        }
    }

    fn reload(&mut self) {
        let parsed = parse_file(
            &self.path,
            self.sheet.as_deref(),
            self.settings.default_sheet.as_deref(),
        );
        match parsed {
            Ok(parsed) => {
                let result = self.wizard.load(parsed);
                self.report(result);
                self.row = 0;
                self.column = 0;
                self.mapping = 0;
                self.auto_mapped = false;
            }
            Err(e) => {
                let result = self.wizard.unload();
                self.report(result);
                self.status_message = Some(e.to_string());
            }
        }
    }

    fn handle_preview(&mut self, code: KeyCode) {
        let visible = self.wizard.rows().len().min(self.settings.preview_rows.max(1));
        let columns = self.wizard.columns().len();
        match code {
            KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Down => self.row = (self.row + 1).min(visible.saturating_sub(1)),
            KeyCode::Tab if columns > 0 => self.column = (self.column + 1) % columns,
            KeyCode::BackTab if columns > 0 => self.column = (self.column + columns - 1) % columns,
            KeyCode::Enter => {
                let current = self.selected_column().and_then(|col| {
                    self.wizard
                        .rows()
                        .get(self.row)
                        .and_then(|r| r.get(&col))
                        .map(crate::fmt::cell)
                });
                if let Some(text) = current {
                    self.mode = Mode::EditCell(text);
                }
            }
            _ => {}
        }
    }

    fn handle_edit(&mut self, code: KeyCode, mut input: String) {
        match code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => return,
            KeyCode::Enter => {
                if let Some(col) = self.selected_column() {
                    let result = self.wizard.edit_cell(self.row, &col, infer_cell(&input));
                    self.report(result);
                }
                return;
            }
            _ => {}
        }
        self.mode = Mode::EditCell(input);
    }

    fn handle_map(&mut self, code: KeyCode) {
        let count = self.wizard.mappings().len();
        match code {
            KeyCode::Up => self.mapping = self.mapping.saturating_sub(1),
            KeyCode::Down => self.mapping = (self.mapping + 1).min(count.saturating_sub(1)),
            KeyCode::Enter if count > 0 => {
                self.mode = Mode::PickCategory {
                    query: String::new(),
                    selection: 0,
                }
            }
            KeyCode::Char('u') | KeyCode::Delete => self.map_selected(None),
            KeyCode::Char('a') => {
                let result = self.wizard.auto_map();
                self.report(result);
                self.status_message = Some(format!(
                    "Auto-mapped: {}% of required fields",
                    self.wizard.progress().completion_percent
                ));
            }
            KeyCode::Char('c') => {
                let result = self.wizard.clear_mappings();
                self.report(result);
            }
            _ => {}
        }
    }

    fn handle_picker(&mut self, code: KeyCode, mut query: String, mut selection: usize) {
        match code {
            KeyCode::Esc => return,
            KeyCode::Char(c) => {
                query.push(c);
                selection = 0;
            }
            KeyCode::Backspace => {
                query.pop();
                selection = 0;
            }
            KeyCode::Up => selection = selection.saturating_sub(1),
            KeyCode::Down => {
                let matches = self.filtered_categories(&query);
                if !matches.is_empty() {
                    selection = (selection + 1).min(matches.len() - 1);
                }
            }
            KeyCode::Enter => {
                let matches = self.filtered_categories(&query);
                if let Some((id, _)) = matches.get(selection.min(matches.len().saturating_sub(1))) {
                    let id = id.clone();
                    self.map_selected(Some(&id));
                    return;
                }
            }
            _ => {}
        }
        self.mode = Mode::PickCategory { query, selection };
    }

    fn map_selected(&mut self, category_id: Option<&str>) {
        let Some(column) = self
            .wizard
            .mappings()
            .get(self.mapping)
            .map(|m| m.source_column.clone())
        else {
            return;
        };
        let result = self.wizard.try_set_mapping(&column, category_id);
        self.report(result);
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            self.status_message = Some(e.to_string());
        }
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<HandleResult> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    return Ok(HandleResult::Cancel);
                }
                match self.handle_key(key.code) {
                    HandleResult::Continue => {}
                    done => return Ok(done),
                }
            }
        }
    }
}

pub fn run(file: &str, sheet: Option<&str>, output: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let taxonomy = Taxonomy::builtin();
    let path = shellexpand_path(file);
    let parsed = parse_file(&path, sheet, settings.default_sheet.as_deref())?;

    let mut wizard = ImportWizard::new(&taxonomy);
    wizard.load(parsed)?;

    let output_path = match output {
        Some(p) => shellexpand_path(p),
        None => default_output_path(&shellexpand_path(&settings.output_dir), &path),
    };
    let mut screen = ImportScreen::new(wizard, path, sheet.map(str::to_string), settings);

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();
    let result = screen.event_loop(&mut terminal);
    ratatui::restore();

    finish(screen.wizard, result?, &output_path)
}

fn finish(wizard: ImportWizard<'_>, outcome: HandleResult, output_path: &Path) -> Result<()> {
    match outcome {
        HandleResult::Complete => match wizard.complete() {
            Ok(payload) => write_payload(&payload, output_path),
            Err(wizard) => {
                let stage = wizard.stage().title();
                wizard.cancel();
                Err(FinmapError::Other(format!("Import not ready ({stage})")))
            }
        },
        HandleResult::Cancel | HandleResult::Continue => {
            wizard.cancel();
            println!("Import cancelled.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, FileInfo, ParsedWorkbook, PreviewRow};

    fn screen(taxonomy: &Taxonomy, settings: Settings) -> ImportScreen<'_> {
        let rows = vec![
            PreviewRow::new(vec![
                ("Revenue".into(), CellValue::Currency(1_500_000.0)),
                ("COGS".into(), CellValue::Currency(600_000.0)),
            ]),
            PreviewRow::new(vec![
                ("Revenue".into(), CellValue::Currency(1_800_000.0)),
                ("COGS".into(), CellValue::Currency(720_000.0)),
            ]),
        ];
        let parsed = ParsedWorkbook {
            file: FileInfo {
                file_name: "model.csv".into(),
                sheet_names: vec!["model".into()],
                row_count: 2,
                checksum: "abc".into(),
            },
            rows,
            columns: vec!["Revenue".into(), "COGS".into()],
        };
        let mut wizard = ImportWizard::new(taxonomy);
        wizard.load(parsed).unwrap();
        ImportScreen::new(wizard, PathBuf::from("model.csv"), None, settings)
    }

    fn press(screen: &mut ImportScreen<'_>, keys: &[KeyCode]) {
        for key in keys {
            screen.handle_key(*key);
        }
    }

    fn type_text(screen: &mut ImportScreen<'_>, text: &str) {
        for c in text.chars() {
            screen.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_edit_cell_in_preview() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        press(&mut s, &[KeyCode::Down, KeyCode::Tab, KeyCode::Enter]);
        assert!(matches!(&s.mode, Mode::EditCell(text) if text == "$720,000.00"));
        press(&mut s, &[KeyCode::Backspace; 11]);
        type_text(&mut s, "$730,000");
        press(&mut s, &[KeyCode::Enter]);
        assert!(matches!(s.mode, Mode::Normal));
        assert_eq!(
            s.wizard.rows()[1].get("COGS"),
            Some(&CellValue::Currency(730_000.0))
        );
    }

    #[test]
    fn test_picker_maps_selected_column() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        press(&mut s, &[KeyCode::Right]);
        assert_eq!(s.wizard.stage(), Stage::Map);

        press(&mut s, &[KeyCode::Right]);
        assert_eq!(s.wizard.stage(), Stage::Map);
        assert!(s.status_message.is_some());

        press(&mut s, &[KeyCode::Down, KeyCode::Enter]);
        type_text(&mut s, "cost of goods");
        press(&mut s, &[KeyCode::Enter]);
        assert_eq!(
            s.wizard.mappings()[1].mapped_category.as_deref(),
            Some("cogs")
        );
        assert!(s.wizard.mappings()[0].mapped_category.is_none());

        press(&mut s, &[KeyCode::Char('u')]);
        assert!(s.wizard.mappings()[1].mapped_category.is_none());
    }

    #[test]
    fn test_auto_map_on_load_runs_once() {
        let taxonomy = Taxonomy::builtin();
        let settings = Settings {
            auto_map_on_load: true,
            ..Settings::default()
        };
        let mut s = screen(&taxonomy, settings);
        press(&mut s, &[KeyCode::Right]);
        assert_eq!(s.wizard.progress().mapped_required_count, 2);

        press(&mut s, &[KeyCode::Char('c'), KeyCode::Left, KeyCode::Right]);
        assert_eq!(s.wizard.progress().mapped_column_count, 0);
    }

    #[test]
    fn test_confirm_enter_completes() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        press(&mut s, &[KeyCode::Right, KeyCode::Char('a'), KeyCode::Right]);
        assert_eq!(s.wizard.stage(), Stage::Confirm);
        assert!(matches!(s.handle_key(KeyCode::Enter), HandleResult::Complete));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("model.mapping.json");
        finish(s.wizard, HandleResult::Complete, &out).unwrap();
        let written: crate::models::ImportPayload =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.mappings[0].mapped_category.as_deref(), Some("revenue"));
        assert_eq!(written.rows.len(), 2);
    }

    #[test]
    fn test_esc_cancels_without_writing() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        assert!(matches!(s.handle_key(KeyCode::Esc), HandleResult::Cancel));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.mapping.json");
        finish(s.wizard, HandleResult::Cancel, &out).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_failed_reload_drops_session() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        let dir = tempfile::tempdir().unwrap();
        s.path = dir.path().join("missing.csv");

        press(&mut s, &[KeyCode::Left, KeyCode::Char('r')]);
        assert_eq!(s.wizard.stage(), Stage::Upload);
        assert!(s.status_message.is_some());
        assert!(s.wizard.file().is_none());
        assert!(s.wizard.rows().is_empty());

        press(&mut s, &[KeyCode::Right]);
        assert_eq!(s.wizard.stage(), Stage::Upload);
    }

    #[test]
    fn test_reload_reads_file_again() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("plan.csv");
        std::fs::write(&csv, "Revenue,Tax Rate\n\"$900\",21%\n").unwrap();
        s.path = csv;

        press(&mut s, &[KeyCode::Left, KeyCode::Char('r')]);
        assert_eq!(s.wizard.stage(), Stage::Preview);
        assert_eq!(s.wizard.columns(), vec!["Revenue", "Tax Rate"]);
        assert_eq!(s.wizard.rows().len(), 1);
    }

    #[test]
    fn test_esc_in_picker_only_closes_picker() {
        let taxonomy = Taxonomy::builtin();
        let mut s = screen(&taxonomy, Settings::default());
        press(&mut s, &[KeyCode::Right, KeyCode::Enter]);
        assert!(matches!(s.mode, Mode::PickCategory { .. }));
        assert!(matches!(s.handle_key(KeyCode::Esc), HandleResult::Continue));
        assert!(matches!(s.mode, Mode::Normal));
    }
}
