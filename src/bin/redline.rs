use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use serde::Deserialize;
use tracing::{info, warn};

use redline::config::{self, Config};
use redline::diff::DiffSegment;
use redline::editor::{DetachedHost, ReviewEditor};
use redline::logging;
use redline::render::{RenderResult, render_editor};
use redline::surface::{CoordinateSpace, Surface};
use redline::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// A review on disk: the user's text, optional trailing blocks and the
/// suggested edits to overlay.
#[derive(Debug, Deserialize)]
struct ReviewFile {
    text: String,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    segments: Vec<DiffSegment>,
}

fn main() -> Result<()> {
    run()
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        return (width.saturating_sub(1).max(1), 0);
    }
    let padding = (width.saturating_sub(80) / 2).clamp(2, width.saturating_sub(1) / 2);
    let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
    (wrap_width, padding)
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: redline <review.toml>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    let config = config::load_from(Some(config::discover())).context("failed to load configuration")?;
    let _log_guard = logging::init(Path::new("."), &config.log.filter);
    info!(target: "app", path = %path.display(), "startup");

    let review = load_review(&path)?;
    let mut app = App::new(review, path, &config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    info!(target: "app", "shutdown");
    res
}

fn load_review(path: &Path) -> Result<ReviewFile> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt);
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

struct App {
    editor: ReviewEditor,
    theme: Theme,
    file_path: PathBuf,
    scroll_top: usize,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn new(review: ReviewFile, path: PathBuf, config: &Config) -> Self {
        let surface = Surface::from_parts(
            &review.text,
            review.signature.as_deref(),
            review.quote.as_deref(),
            config.surface.placeholder,
        );
        let mut editor = ReviewEditor::new(Some(surface), DetachedHost::shared(), config);
        let mut status = None;
        if !review.segments.is_empty() {
            let original = editor.user_text();
            if let Err(err) = editor.show_suggestion(review.segments, &original) {
                warn!(target: "app", %err, "suggestion_not_shown");
                status = Some(format!("Suggestion not shown: {err}"));
            }
        }

        Self {
            editor,
            theme: Theme::default(),
            file_path: path,
            scroll_top: 0,
            should_quit: false,
            status_message: status.map(|msg| (msg, Instant::now())),
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let editor_area = vertical[0];
        let status_area = vertical[1];

        let (wrap_width, left_padding) = editor_wrap_configuration(editor_area.width as usize);
        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(left_padding as u16),
                Constraint::Min(1),
            ])
            .split(editor_area);
        let text_area = horizontal[1];

        let render = render_editor(&self.editor, wrap_width, &self.theme);
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .style(ratatui::style::Style::default().bg(self.theme.background))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
            && text_area.width > 0
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(&render, status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&mut self, render: &RenderResult, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();
        let position = match render.cursor {
            Some(cursor) => format!("{}:{}", cursor.line + 1, cursor.column + 1),
            None => "-:-".to_string(),
        };

        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let pending = match self.editor.suggestion() {
            Some(segments) => {
                let edits = segments.iter().filter(|segment| segment.is_edit()).count();
                let touched = self.editor.highlighted_segments().len();
                format!(", {edits} edits, {touched} at caret")
            }
            None => ", no suggestion".to_string(),
        };

        let mut spans = vec![
            Span::raw(format!("{position} ")),
            Span::styled(self.file_path.display().to_string(), self.theme.filename_style()),
            Span::raw(pending),
        ];

        let all_shortcuts = ["^Z:Undo", "^R:Redo", "Esc:Dismiss", "^A:All", "^N:Reject", "^Y:Accept", "^Q:Quit"];
        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let min_padding = 1;
        let mut shortcuts_to_show: Vec<&str> = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width > terminal_width {
                break;
            }
            shortcuts_to_show.insert(0, shortcut);
            shortcuts_width = test_width;
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = render.cursor {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }

    fn scroll_top_for_cursor(&self, cursor_line: usize, viewport: usize, max_scroll: usize) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }
        scroll.min(max_scroll)
    }

    fn extend_selection(&mut self, delta: isize) {
        let Some(head) = self.editor.caret_offset(CoordinateSpace::FullView).or_else(|| {
            self.editor
                .selection_offsets(CoordinateSpace::FullView)
                .map(|range| range.end)
        }) else {
            return;
        };
        self.editor.select_to(head.saturating_add_signed(delta));
    }

    fn report<T>(&mut self, action: &str, result: redline::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.set_status(format!("{action}: {err}"));
                None
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };

        match (code, modifiers) {
            (KeyCode::Char('q'), m) | (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            (KeyCode::Char('y'), m) if m.contains(KeyModifiers::CONTROL) => {
                let result = self.editor.accept_at_cursor();
                if let Some(resolved) = self.report("Accept", result) {
                    self.set_status(if resolved { "Accepted" } else { "Nothing to accept here" });
                }
            }
            (KeyCode::Char('n'), m) if m.contains(KeyModifiers::CONTROL) => {
                let result = self.editor.reject_at_cursor();
                if let Some(resolved) = self.report("Reject", result) {
                    self.set_status(if resolved { "Rejected" } else { "Nothing to reject here" });
                }
            }
            (KeyCode::Char('a'), m) if m.contains(KeyModifiers::CONTROL) => {
                let result = self.editor.accept_all();
                if self.report("Accept all", result).is_some() {
                    self.set_status("Accepted all edits");
                }
            }
            (KeyCode::Char('z'), m) if m.contains(KeyModifiers::CONTROL) => {
                if !self.editor.undo() {
                    self.set_status("Nothing to undo");
                }
            }
            (KeyCode::Char('r'), m) if m.contains(KeyModifiers::CONTROL) => {
                if !self.editor.redo() {
                    self.set_status("Nothing to redo");
                }
            }
            (KeyCode::Esc, _) => {
                if self.editor.dismiss_suggestion() {
                    self.set_status("Suggestion dismissed");
                }
            }
            (KeyCode::Left, m) if m.contains(KeyModifiers::SHIFT) => self.extend_selection(-1),
            (KeyCode::Right, m) if m.contains(KeyModifiers::SHIFT) => self.extend_selection(1),
            (KeyCode::Left, _) => {
                self.editor.move_left();
            }
            (KeyCode::Right, _) => {
                self.editor.move_right();
            }
            (KeyCode::Up, _) => {
                self.editor.move_up();
            }
            (KeyCode::Down, _) => {
                self.editor.move_down();
            }
            (KeyCode::Home, _) => {
                self.editor.move_to_offset(0);
            }
            (KeyCode::End, _) => {
                self.editor.move_to_offset(usize::MAX);
            }
            (KeyCode::Backspace, _) => {
                self.editor.backspace();
            }
            (KeyCode::Delete, _) => {
                self.editor.delete_forward();
            }
            (KeyCode::Enter, _) => {
                self.editor.insert_text("\n");
            }
            (KeyCode::Tab, _) => {
                self.editor.insert_text("\t");
            }
            (KeyCode::Char(ch), m) if !m.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                let mut buffer = [0; 4];
                self.editor.insert_text(ch.encode_utf8(&mut buffer));
            }
            _ => {}
        }
    }
}
