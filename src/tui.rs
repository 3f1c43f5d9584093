use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::actions::{ActionDispatcher, AssetDetails, Confirmation, Controls, PendingAction, ViewOutcome};
use crate::app::{ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::clipboard::ClipboardBridge;
use crate::domain::{AssetId, AssetKind};
use crate::error::EeError;
use crate::lister::EntryRole;
use crate::namespace::RemoteNamespace;
use crate::tasks::{self, TaskClient, TaskSummary};
use crate::tree::{AssetTree, TreeEvent};

const LOGS_MAX: usize = 200;
const AFFECTED_SHOWN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Assets,
    Tasks,
    Logs,
    Help,
}

/// Timestamped log lines shown in the logs view; also the progress sink of the browser.
#[derive(Debug, Default)]
struct LogBuffer {
    lines: RefCell<VecDeque<String>>,
}

impl LogBuffer {
    fn push(&self, line: impl AsRef<str>) {
        let mut lines = self.lines.borrow_mut();
        lines.push_back(format!("[{}] {}", Local::now().format("%H:%M:%S"), line.as_ref()));
        while lines.len() > LOGS_MAX {
            lines.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.lines.borrow().len()
    }
}

impl ProgressSink for LogBuffer {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => self.push(format!("{} in {}ms", event.message, elapsed.as_millis())),
            None => self.push(event.message),
        }
    }
}

/// Interactive asset browser over the shared tree/dispatcher state.
pub struct Browser<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge> {
    tree: AssetTree<N>,
    dispatcher: ActionDispatcher,
    tasks: T,
    clipboard: B,
    view: View,
    kind: ProgressSinkKind,
    cursor: usize,
    status: String,
    details: Option<AssetDetails>,
    task_rows: Vec<TaskSummary>,
    task_cursor: usize,
    logs: LogBuffer,
    log_scroll: u16,
}

impl<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge> Browser<N, T, B> {
    pub fn new(tree: AssetTree<N>, tasks: T, clipboard: B) -> Self {
        let mut browser = Self {
            tree,
            dispatcher: ActionDispatcher::new(Controls::new()),
            tasks,
            clipboard,
            view: View::Assets,
            kind: ProgressSinkKind::Browse,
            cursor: 0,
            status: "ready".to_string(),
            details: None,
            task_rows: Vec::new(),
            task_cursor: 0,
            logs: LogBuffer::default(),
            log_scroll: 0,
        };
        let folder = browser.tree.current_folder().clone();
        browser.logs.push(format!("opened {folder}"));
        browser.sync_selection();
        browser
    }

    pub fn tree(&self) -> &AssetTree<N> {
        &self.tree
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn pending(&self) -> Option<&Confirmation> {
        self.dispatcher.pending()
    }

    pub fn details(&self) -> Option<&AssetDetails> {
        self.details.as_ref()
    }

    pub fn tasks(&self) -> &[TaskSummary] {
        &self.task_rows
    }

    /// Hand back the clipboard bridge, e.g. to flush buffered messages.
    pub fn into_clipboard(self) -> B {
        self.clipboard
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = loop {
            if let Err(err) = terminal.draw(|frame| draw_ui(frame, self)) {
                break Err(err).into_diagnostic();
            }
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if self.handle_key(key) {
                            break Ok(());
                        }
                    }
                    Ok(_) => {}
                    Err(err) => break Err(err).into_diagnostic(),
                },
                Ok(false) => {}
                Err(err) => break Err(err).into_diagnostic(),
            }
        };

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    /// Apply one key press; returns `true` when the browser should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.dispatcher.pending().is_some() {
            self.handle_dialog_key(key.code);
            return false;
        }

        match key.code {
            KeyCode::F(1) | KeyCode::Char('?') => self.view = View::Help,
            KeyCode::F(3) => self.open_tasks(),
            KeyCode::F(4) => self.view = View::Logs,
            KeyCode::Esc => {
                if self.view == View::Assets {
                    self.details = None;
                } else {
                    self.view = View::Assets;
                }
            }
            KeyCode::Char('q') => return true,
            _ => match self.view {
                View::Assets => self.handle_assets_key(key.code),
                View::Tasks => self.handle_tasks_key(key.code),
                View::Logs => self.handle_logs_key(key.code),
                View::Help => {}
            },
        }
        false
    }

    fn handle_assets_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => self.open_under_cursor(),
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                let result = self.guarded(|tree| tree.up());
                self.after_tree_change(result);
            }
            KeyCode::Char('r') => {
                let result = self.guarded(|tree| tree.reload());
                self.after_tree_change(result);
            }
            KeyCode::Char('d') => self.start_delete(),
            KeyCode::Char('m') => self.start_move(),
            KeyCode::Char('n') => self.start_create_folder(),
            KeyCode::Char('c') => self.copy_selected(),
            KeyCode::Char('v') => self.view_selected(),
            _ => {}
        }
    }

    fn handle_tasks_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.task_cursor = self.task_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.task_cursor + 1 < self.task_rows.len() {
                    self.task_cursor += 1;
                }
            }
            KeyCode::Char('r') => self.open_tasks(),
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, code: KeyCode) {
        let delta: i32 = match code {
            KeyCode::PageUp | KeyCode::Up => 5,
            KeyCode::PageDown | KeyCode::Down => -5,
            _ => return,
        };
        let max = self.logs.len().saturating_sub(1) as i32;
        self.log_scroll = (self.log_scroll as i32 + delta).clamp(0, max) as u16;
    }

    fn handle_dialog_key(&mut self, code: KeyCode) {
        let Some(confirmation) = self.dispatcher.pending_mut() else {
            return;
        };
        let editable = confirmation.input().is_some();
        match code {
            KeyCode::Esc => {
                self.dispatcher.cancel();
                self.status = "cancelled".to_string();
            }
            KeyCode::Char('n') if !editable => {
                self.dispatcher.cancel();
                self.status = "cancelled".to_string();
            }
            KeyCode::Enter => self.commit(),
            KeyCode::Char('y') if !editable => self.commit(),
            KeyCode::Backspace if editable => {
                let mut value = confirmation.input().unwrap_or_default().to_string();
                value.pop();
                confirmation.set_input(&value);
            }
            KeyCode::Char(ch) if editable => {
                let mut value = confirmation.input().unwrap_or_default().to_string();
                value.push(ch);
                confirmation.set_input(&value);
            }
            _ => {}
        }
    }

    fn commit(&mut self) {
        self.kind = ProgressSinkKind::Mutate;
        let label = self
            .dispatcher
            .pending()
            .map(|confirmation| confirmation.action.label())
            .unwrap_or("action");
        match self.dispatcher.commit(&mut self.tree) {
            Ok(events) => {
                self.logs.push(format!("{label} committed"));
                self.status = format!("{label} done");
                self.apply_events(&events);
            }
            // the dialog stays open with the message on its field, unless the
            // target vanished and the tree was re-listed
            Err(err) => {
                self.logs.push(format!("{label} rejected"));
                self.report(err);
            }
        }
    }

    fn start_delete(&mut self) {
        let Some(asset) = self.tree.selected_asset().cloned() else {
            self.status = "nothing selected".to_string();
            return;
        };
        match self.dispatcher.prepare_delete(&mut self.tree, &asset) {
            Ok(Some(_)) => self.status = format!("delete {}?", asset.id),
            Ok(None) => self.status = format!("{} cannot be deleted", asset.kind),
            Err(err) => self.report(err),
        }
    }

    fn start_move(&mut self) {
        let Some(asset) = self.tree.selected_asset().cloned() else {
            self.status = "nothing selected".to_string();
            return;
        };
        match self
            .dispatcher
            .prepare_move(&mut self.tree, &asset, asset.id.as_str())
        {
            Ok(Some(_)) => self.status = "enter the destination".to_string(),
            Ok(None) => self.status = format!("{} cannot be moved", asset.kind),
            Err(err) => self.report(err),
        }
    }

    fn start_create_folder(&mut self) {
        let parent = self.tree.current_folder().clone();
        match self.dispatcher.prepare_create_folder(&parent, "") {
            Ok(_) => self.status = "enter the folder name".to_string(),
            Err(err) => self.report(err),
        }
    }

    fn copy_selected(&mut self) {
        let Some(asset) = self.tree.selected_asset().cloned() else {
            self.status = "nothing selected".to_string();
            return;
        };
        match self.dispatcher.copy(&asset, &self.clipboard) {
            Ok(message) => self.status = format!("copied {}", message.text()),
            Err(err) => self.report(err),
        }
    }

    fn view_selected(&mut self) {
        let Some(asset) = self.tree.selected_asset().cloned() else {
            self.status = "nothing selected".to_string();
            return;
        };
        match self.dispatcher.view(&mut self.tree, &asset) {
            Ok(ViewOutcome::Navigated(events)) => self.apply_events(&events),
            Ok(ViewOutcome::Details(details)) => self.details = Some(details),
            Err(err) => self.report(err),
        }
    }

    fn open_tasks(&mut self) {
        self.view = View::Tasks;
        self.kind = ProgressSinkKind::Tasks;
        self.logs.event(ProgressEvent {
            message: "phase=Fetch; listing operations".to_string(),
            elapsed: None,
        });
        match tasks::list_tasks(&self.tasks) {
            Ok(rows) => {
                self.status = format!("{} tasks", rows.len());
                self.task_rows = rows;
                self.task_cursor = self.task_cursor.min(self.task_rows.len().saturating_sub(1));
            }
            Err(err) => self.report(err),
        }
    }

    fn open_under_cursor(&mut self) {
        let Some(entry) = self.tree.listing().entries.get(self.cursor).cloned() else {
            return;
        };
        let result = if entry.role == EntryRole::Parent {
            self.guarded(|tree| tree.up())
        } else {
            self.guarded(|tree| tree.open(&entry.asset))
        };
        self.after_tree_change(result);
    }

    fn guarded(
        &mut self,
        action: impl FnOnce(&mut AssetTree<N>) -> Result<Vec<TreeEvent>, EeError>,
    ) -> Result<Vec<TreeEvent>, EeError> {
        self.kind = ProgressSinkKind::Browse;
        let _guard = self.dispatcher.controls().acquire()?;
        action(&mut self.tree)
    }

    fn after_tree_change(&mut self, result: Result<Vec<TreeEvent>, EeError>) {
        match result {
            Ok(events) => self.apply_events(&events),
            Err(err) => self.report(err),
        }
    }

    fn apply_events(&mut self, events: &[TreeEvent]) {
        for event in events {
            match event {
                TreeEvent::FolderChanged(folder) => {
                    self.cursor = 0;
                    self.details = None;
                    self.logs.push(format!("opened {folder}"));
                }
                TreeEvent::ListingReplaced => {
                    if let Some(recovered) = &self.tree.listing().recovered_from {
                        self.logs.push(format!("{recovered} no longer exists"));
                    }
                    self.cursor = self.cursor.min(self.tree.listing().len().saturating_sub(1));
                }
                TreeEvent::SelectionChanged(Some(id)) => {
                    if let Some(index) = self
                        .tree
                        .listing()
                        .entries
                        .iter()
                        .position(|entry| &entry.asset.id == id)
                    {
                        self.cursor = index;
                    }
                }
                TreeEvent::SelectionChanged(None) => {}
            }
        }
        self.sync_selection();
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.tree.listing().len();
        if len == 0 {
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
        self.sync_selection();
    }

    /// Select the child under the cursor; the parent entry selects nothing.
    fn sync_selection(&mut self) {
        let id = self
            .tree
            .listing()
            .entries
            .get(self.cursor)
            .filter(|entry| entry.role == EntryRole::Child)
            .map(|entry| entry.asset.id.clone());
        self.tree.select(id);
    }

    fn report(&mut self, err: EeError) {
        self.logs.push(format!("error: {err}"));
        self.status = err.to_string();
        // a stale path may have re-listed the tree underneath the cursor
        if err.is_stale_path() {
            self.cursor = self.cursor.min(self.tree.listing().len().saturating_sub(1));
            self.sync_selection();
        }
    }
}

fn kind_marker(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Root => "~",
        AssetKind::Project => "P",
        AssetKind::Folder => "D",
        AssetKind::Image => "I",
        AssetKind::ImageCollection => "C",
        AssetKind::Table => "T",
        AssetKind::FeatureCollection => "F",
    }
}

fn status_color(name: &str) -> Color {
    match name {
        "primary" => Color::Blue,
        "success" => Color::Green,
        "error" => Color::Red,
        _ => Color::Gray,
    }
}

fn draw_ui<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    frame: &mut ratatui::Frame,
    browser: &Browser<N, T, B>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(6),
            Constraint::Length(2),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(browser), chunks[0]);
    match browser.view {
        View::Assets => draw_assets(frame, browser, chunks[1]),
        View::Tasks => frame.render_widget(draw_tasks(browser, chunks[1].height), chunks[1]),
        View::Logs => frame.render_widget(draw_logs(browser, chunks[1].height), chunks[1]),
        View::Help => frame.render_widget(draw_help(), chunks[1]),
    }
    frame.render_widget(draw_footer(browser), chunks[2]);

    if let Some(confirmation) = browser.dispatcher.pending() {
        draw_dialog(frame, confirmation);
    }
}

fn draw_header<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    browser: &Browser<N, T, B>,
) -> Paragraph<'static> {
    let op_label = match browser.kind {
        ProgressSinkKind::Browse => "Browse",
        ProgressSinkKind::Mutate => "Mutate",
        ProgressSinkKind::Tasks => "Tasks",
        ProgressSinkKind::Chart => "Chart",
    };
    let busy = if browser.dispatcher.controls().is_loading() {
        Span::styled(" loading", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    };
    Paragraph::new(Line::from(vec![
        Span::styled(
            "EEVIEW",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(op_label, Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(
            browser.tree.current_folder().to_string(),
            Style::default().fg(Color::White),
        ),
        busy,
    ]))
    .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_assets<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    frame: &mut ratatui::Frame,
    browser: &Browser<N, T, B>,
    area: Rect,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let visible = columns[0].height.saturating_sub(1) as usize;
    let start = browser.cursor.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = browser
        .tree
        .listing()
        .entries
        .iter()
        .enumerate()
        .skip(start)
        .take(visible.max(1))
        .map(|(index, entry)| {
            let name = match entry.role {
                EntryRole::Parent => "..".to_string(),
                EntryRole::Child if entry.asset.kind.is_browsable() => {
                    format!("{}/", entry.asset.name)
                }
                EntryRole::Child => entry.asset.name.clone(),
            };
            let style = if index == browser.cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if entry.asset.kind.is_browsable() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", kind_marker(entry.asset.kind)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(name, style),
            ])
        })
        .collect();
    let list = Paragraph::new(lines).block(Block::default().borders(Borders::RIGHT));
    frame.render_widget(list, columns[0]);

    frame.render_widget(draw_details(browser), columns[1]);
}

fn draw_details<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    browser: &Browser<N, T, B>,
) -> Paragraph<'static> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Gray));
    let mut lines = Vec::new();
    if let Some(details) = &browser.details {
        lines.push(Line::from(vec![label("Id: "), Span::raw(details.id.to_string())]));
        lines.push(Line::from(vec![label("Type: "), Span::raw(details.kind.to_string())]));
        lines.push(Line::from(vec![label("Name: "), Span::raw(details.name.clone())]));
        if let Some(parent) = &details.parent {
            lines.push(Line::from(vec![label("Parent: "), Span::raw(parent.to_string())]));
        }
        lines.push(Line::from(""));
    }
    if let Some(recovered) = &browser.tree.listing().recovered_from {
        lines.push(Line::from(Span::styled(
            format!("{recovered} vanished"),
            Style::default().fg(Color::Yellow),
        )));
    }

    let actions = browser.tree.actions();
    let toggle = |key: &'static str, enabled: bool| {
        let color = if enabled { Color::Green } else { Color::DarkGray };
        Span::styled(key, Style::default().fg(color))
    };
    lines.push(Line::from(vec![
        toggle("v view ", actions.view),
        toggle("c copy ", actions.copy),
        toggle("d delete ", actions.delete),
        toggle("m move ", actions.move_to),
        toggle("n folder", actions.create_folder),
    ]));
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_tasks<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    browser: &Browser<N, T, B>,
    height: u16,
) -> Paragraph<'static> {
    let mut lines = vec![Line::from(Span::styled(
        "TASKS",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];
    let visible = height.saturating_sub(8).max(1) as usize;
    let start = browser.task_cursor.saturating_sub(visible.saturating_sub(1));
    for (index, task) in browser.task_rows.iter().enumerate().skip(start).take(visible) {
        let marker = if index == browser.task_cursor { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(
                format!("{:<10}", task.state),
                Style::default().fg(status_color(task.status_color)),
            ),
            Span::styled(
                format!("{:<16} ", task.operation_type),
                Style::default().fg(Color::Gray),
            ),
            Span::raw(task.description.clone()),
        ]));
    }
    if let Some(task) = browser.task_rows.get(browser.task_cursor) {
        lines.push(Line::from(""));
        for (key, value) in task.details() {
            lines.push(Line::from(vec![
                Span::styled(format!("{key}: "), Style::default().fg(Color::Gray)),
                Span::raw(value),
            ]));
        }
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_logs<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    browser: &Browser<N, T, B>,
    height: u16,
) -> Paragraph<'static> {
    let logs = browser.logs.lines.borrow();
    let visible = height.saturating_sub(1).max(1) as usize;
    let start = logs
        .len()
        .saturating_sub(browser.log_scroll as usize + visible);
    let mut lines = vec![Line::from(Span::styled(
        "LOGS (scrollable)",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];
    lines.extend(logs.iter().skip(start).take(visible).map(|line| Line::from(line.clone())));
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_help() -> Paragraph<'static> {
    let lines = vec![
        Line::from("F1 Help  F3 Tasks  F4 Logs  Esc back  q quit"),
        Line::from("Up/Down select  Enter open  Backspace up  r reload"),
        Line::from("v view  c copy id  d delete  m move/rename  n new folder"),
        Line::from("In dialogs: type to edit, Enter confirms, Esc cancels"),
    ];
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true })
}

fn draw_footer<N: RemoteNamespace, T: TaskClient, B: ClipboardBridge>(
    browser: &Browser<N, T, B>,
) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::raw(browser.status.clone()),
    ]))
    .block(Block::default().borders(Borders::TOP))
}

fn draw_dialog(frame: &mut ratatui::Frame, confirmation: &Confirmation) {
    let area = centered(frame.area(), 70, 60);
    frame.render_widget(Clear, area);

    let title = match &confirmation.action {
        PendingAction::Delete { asset } => format!("Delete {}", asset.name),
        PendingAction::Move { asset, .. } => format!("Move {}", asset.name),
        PendingAction::CreateFolder { parent, .. } => format!("New folder in {parent}"),
    };
    let mut lines = Vec::new();
    if !confirmation.affected.is_empty() {
        lines.push(Line::from(Span::styled(
            "Affected assets:",
            Style::default().fg(Color::Gray),
        )));
        for id in confirmation.affected.iter().take(AFFECTED_SHOWN) {
            lines.push(Line::from(format!("  {id}")));
        }
        let hidden = confirmation.affected.len().saturating_sub(AFFECTED_SHOWN);
        if hidden > 0 {
            lines.push(Line::from(format!("  ... and {hidden} more")));
        }
    }
    lines.push(Line::from(""));
    match confirmation.input() {
        Some(value) => {
            lines.push(Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Cyan)),
                Span::styled(value.to_string(), Style::default().fg(Color::White)),
            ]));
            lines.push(Line::from(Span::styled(
                "Enter to confirm, Esc to cancel",
                Style::default().fg(Color::DarkGray),
            )));
        }
        None => lines.push(Line::from("Press y to confirm, n to cancel.")),
    }
    if let Some(error) = &confirmation.error {
        lines.push(Line::from(Span::styled(
            error.message.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let dialog = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(dialog, area);
}

fn centered(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100 - height_percent) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

/// Parse the folder the browser should open on.
pub fn start_folder(value: Option<&str>) -> Result<Option<AssetId>, EeError> {
    value.map(str::parse::<AssetId>).transpose()
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::clipboard::JsonLineBridge;
    use crate::namespace::MemoryNamespace;
    use crate::tasks::StaticTasks;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn browser(
        ns: &MemoryNamespace,
    ) -> Browser<&MemoryNamespace, StaticTasks, JsonLineBridge<Vec<u8>>> {
        let tree = AssetTree::open_at(ns, Some("projects/p/assets".parse().unwrap())).unwrap();
        Browser::new(tree, StaticTasks::default(), JsonLineBridge::new(Vec::new()))
    }

    fn namespace() -> MemoryNamespace {
        MemoryNamespace::new()
            .with_project("p", true)
            .with_asset("projects/p/assets/folder/img", AssetKind::Image)
            .with_asset("projects/p/assets/table", AssetKind::Table)
    }

    #[test]
    fn cursor_skips_parent_for_selection() {
        let ns = namespace();
        let mut browser = browser(&ns);
        assert!(browser.tree().selected().is_none());
        browser.handle_key(key(KeyCode::Down));
        assert_eq!(
            browser.tree().selected().map(AssetId::as_str),
            Some("projects/p/assets/folder")
        );
    }

    #[test]
    fn delete_dialog_commits_on_y() {
        let ns = namespace();
        let mut browser = browser(&ns);
        browser.handle_key(key(KeyCode::Down));
        browser.handle_key(key(KeyCode::Down));
        browser.handle_key(key(KeyCode::Char('d')));
        assert!(browser.pending().is_some());
        browser.handle_key(key(KeyCode::Char('y')));
        assert!(browser.pending().is_none());
        assert!(!ns.contains("projects/p/assets/table"));
    }

    #[test]
    fn rejected_create_keeps_dialog_with_error() {
        let ns = namespace();
        let mut browser = browser(&ns);
        browser.handle_key(key(KeyCode::Char('n')));
        for ch in "folder".chars() {
            browser.handle_key(key(KeyCode::Char(ch)));
        }
        browser.handle_key(key(KeyCode::Enter));
        let pending = browser.pending().expect("dialog stays open");
        assert!(pending.error.is_some());
        browser.handle_key(key(KeyCode::Esc));
        assert!(browser.pending().is_none());
    }

    #[test]
    fn quit_key_closes() {
        let ns = namespace();
        let mut browser = browser(&ns);
        assert!(!browser.handle_key(key(KeyCode::Char('j'))));
        assert!(browser.handle_key(key(KeyCode::Char('q'))));
    }
}
