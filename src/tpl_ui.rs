// Terminal window and event loop
// The thin display collaborator around the navigation core: terminal
// setup/teardown, per-frame rendering of the active view tree, key
// dispatch to the active controller, and the exit confirmation dialog.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Span, Spans, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::error::Error;
use std::io;
use std::time::{Duration, Instant};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::tpl_color::Harmonize;
use crate::tpl_lang::{fill, LangError};
use crate::tpl_nav::{App, ControllerRegistry, Navigator, Outcome, Window};
use crate::tpl_views::{NodeKind, ViewNode};

/// Minimum terminal size; below this a resize warning replaces the UI.
pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 24;
/// Preferred content box, the terminal analog of the default window size.
pub const VIEW_COLS: u16 = 76;
pub const VIEW_ROWS: u16 = 22;

/// The single window of the game. Content is drawn every frame from the
/// navigator's active view; installing only records title and visibility.
pub struct TerminalWindow {
    title: String,
    visible: bool,
}

impl TerminalWindow {
    pub fn new() -> TerminalWindow {
        TerminalWindow {
            title: String::new(),
            visible: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Window for TerminalWindow {
    fn install(&mut self, _root: &ViewNode, title: &str) {
        self.title = title.to_string();
        self.visible = true;
    }
}

/// Exit confirmation dialog, localized once at startup.
struct ExitDialog {
    title: String,
    head: String,
    body: String,
    yes: String,
    no: String,
    visible: bool,
    focus_yes: bool,
}

impl ExitDialog {
    fn build(app: &App) -> Result<ExitDialog, LangError> {
        Ok(ExitDialog {
            title: format!(
                "{} - {}",
                app.lang.str("header.base")?,
                app.lang.str("exit")?
            ),
            head: app.lang.str("dialogs.head.exit")?.to_string(),
            body: app.lang.str("dialogs.body.exit")?.to_string(),
            yes: app.lang.str("exit")?.to_string(),
            no: app.lang.str("cancel")?.to_string(),
            visible: false,
            focus_yes: false,
        })
    }

    fn open(&mut self) {
        self.visible = true;
        // Cancel is focused first so a stray double Enter cannot quit
        self.focus_yes = false;
    }
}

/// Localized too-small warning shown below the minimum terminal size.
struct ResizeMessage {
    title: String,
    line1: String,
    line2: String,
}

impl ResizeMessage {
    fn build(app: &App) -> Result<ResizeMessage, LangError> {
        Ok(ResizeMessage {
            title: app.lang.str("tsmsg.title")?.to_string(),
            line1: app.lang.str("tsmsg.line1")?.to_string(),
            line2: fill(
                app.lang.str("tsmsg.line2-fmt")?,
                &[&MIN_COLS.to_string(), &MIN_ROWS.to_string()],
            ),
        })
    }
}

/// Harmonized styles for everything the shell draws.
struct UiStyles {
    title: Style,
    label: Style,
    item: Style,
    item_selected: Style,
    hint_key: Style,
    notice: Style,
    button: Style,
    button_focused: Style,
}

impl UiStyles {
    fn new() -> UiStyles {
        UiStyles {
            title: Style::default()
                .fg(Color::Yellow.harmonize())
                .add_modifier(Modifier::BOLD),
            label: Style::default(),
            item: Style::default(),
            item_selected: Style::default()
                .bg(Color::LightBlue.harmonize())
                .fg(Color::Black.harmonize())
                .add_modifier(Modifier::BOLD),
            hint_key: Style::default()
                .fg(Color::Yellow.harmonize())
                .add_modifier(Modifier::BOLD),
            notice: Style::default().fg(Color::Red.harmonize()),
            button: Style::default().fg(Color::Gray.harmonize()),
            button_focused: Style::default()
                .bg(Color::LightBlue.harmonize())
                .fg(Color::Black.harmonize())
                .add_modifier(Modifier::BOLD),
        }
    }
}

/// Bring up the terminal, run the event loop, restore the terminal.
/// Teardown runs even when the loop fails so the shutdown flush happens
/// on a sane screen.
pub fn run(app: &mut App, registry: &ControllerRegistry) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, registry);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    registry: &ControllerRegistry,
) -> Result<(), Box<dyn Error>> {
    let base_title = app.lang.str("header.base")?.to_string();
    let exit_label = app.lang.str("menu.exit")?.to_string();
    let mut exit_dialog = ExitDialog::build(app)?;
    let resize_msg = ResizeMessage::build(app)?;
    let styles = UiStyles::new();

    let mut nav = Navigator::new(TerminalWindow::new());
    nav.change_view(app, registry, "main.view", &base_title)?;

    // Last failed navigation, shown in the status bar until the next
    // successful one
    let mut nav_notice: Option<String> = None;

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| {
            draw_frame(
                f,
                &nav,
                &exit_dialog,
                &resize_msg,
                &exit_label,
                nav_notice.as_deref(),
                &styles,
            )
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            {
                // Raw mode turns Ctrl+C into a key event; route it through
                // the same confirmation as any other exit request
                if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                    exit_dialog.open();
                } else if exit_dialog.visible {
                    match code {
                        KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                            exit_dialog.focus_yes = !exit_dialog.focus_yes;
                        }
                        KeyCode::Enter => {
                            if exit_dialog.focus_yes {
                                break;
                            }
                            exit_dialog.visible = false;
                        }
                        KeyCode::Esc => {
                            exit_dialog.visible = false;
                        }
                        _ => {}
                    }
                } else {
                    match nav.dispatch_key(app, code) {
                        Outcome::Navigate { view, title } => {
                            match nav.change_view(app, registry, &view, &title) {
                                Ok(()) => nav_notice = None,
                                Err(err) => {
                                    let kept =
                                        nav.active().map(|a| a.name.as_str()).unwrap_or("");
                                    warn!(%err, view = kept, "navigation failed; previous view kept");
                                    nav_notice = Some(err.to_string());
                                }
                            }
                        }
                        Outcome::RequestExit => exit_dialog.open(),
                        Outcome::Redraw | Outcome::Ignored => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn draw_frame<B: Backend>(
    f: &mut Frame<B>,
    nav: &Navigator<TerminalWindow>,
    dialog: &ExitDialog,
    resize_msg: &ResizeMessage,
    exit_label: &str,
    notice: Option<&str>,
    styles: &UiStyles,
) {
    let size = f.size();
    if size.width < MIN_COLS || size.height < MIN_ROWS {
        draw_resize_warning(f, resize_msg, size);
        return;
    }
    // Nothing to draw until the first view has been installed
    if !nav.window().is_visible() {
        return;
    }

    // title bar, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ].as_ref())
        .split(size);

    let title = Paragraph::new(Spans::from(Span::styled(
        nav.window().title().to_string(),
        styles.title,
    )))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if let Some(active) = nav.active() {
        let lines = view_lines(&active.root, styles);
        let height = (lines.len() as u16).min(VIEW_ROWS).min(chunks[1].height);
        let width = VIEW_COLS.min(chunks[1].width);
        let area = center_rect(width, height, chunks[1]);
        let content = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
        f.render_widget(content, area);
    }

    draw_status_bar(f, chunks[2], exit_label, notice, styles);

    if dialog.visible {
        draw_exit_dialog(f, dialog, styles, size);
    }
}

/// Flatten the active view tree into styled lines, top to bottom.
fn view_lines(root: &ViewNode, styles: &UiStyles) -> Vec<Spans<'static>> {
    let mut lines = Vec::new();
    collect_lines(root, styles, false, &mut lines);
    lines
}

fn collect_lines(
    node: &ViewNode,
    styles: &UiStyles,
    selected: bool,
    lines: &mut Vec<Spans<'static>>,
) {
    match node.kind {
        NodeKind::Column => {
            for child in &node.children {
                collect_lines(child, styles, false, lines);
            }
        }
        NodeKind::Spacer => lines.push(Spans::from("")),
        NodeKind::Label => {
            let style = if node.id.as_deref() == Some("title") {
                styles.title
            } else {
                styles.label
            };
            for part in node.text.as_deref().unwrap_or("").split('\n') {
                lines.push(Spans::from(Span::styled(part.to_string(), style)));
            }
        }
        NodeKind::Menu => {
            for (i, item) in node.children.iter().enumerate() {
                collect_lines(item, styles, i == node.selected, lines);
            }
        }
        NodeKind::Item => {
            let text = node.text.as_deref().unwrap_or("");
            if selected {
                lines.push(Spans::from(Span::styled(
                    format!("▸ {} ", text),
                    styles.item_selected,
                )));
            } else {
                lines.push(Spans::from(Span::styled(
                    format!("  {} ", text),
                    styles.item,
                )));
            }
        }
    }
}

fn draw_status_bar<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    exit_label: &str,
    notice: Option<&str>,
    styles: &UiStyles,
) {
    let left_text = match notice {
        Some(text) => format!(" {} ", text),
        None => " ".to_string(),
    };
    let right_key = "Esc";
    // spacing accounts for the ": " between key and label
    let inner_w = area.width.saturating_sub(2) as usize;
    let left_w = left_text.as_str().width();
    let right_w = right_key.width() + 2 + exit_label.width();
    let mid_spaces = if inner_w > left_w + right_w + 1 {
        inner_w - left_w - right_w - 1
    } else {
        1
    };

    let mut spans: Vec<Span> = Vec::new();
    spans.push(Span::styled(left_text, styles.notice));
    spans.push(Span::raw(" ".repeat(mid_spaces)));
    spans.push(Span::styled(right_key.to_string(), styles.hint_key));
    spans.push(Span::raw(format!(": {} ", exit_label)));

    let status = Paragraph::new(Text::from(Spans::from(spans)))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(status, area);
}

fn draw_resize_warning<B: Backend>(f: &mut Frame<B>, msg: &ResizeMessage, size: Rect) {
    let lines = vec![
        Spans::from(Span::raw(msg.line1.clone())),
        Spans::from(Span::raw(msg.line2.clone())),
    ];
    let warn = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(msg.title.clone()),
        )
        .alignment(Alignment::Center);
    f.render_widget(Clear, size);
    let w = 44u16.min(size.width.saturating_sub(2));
    let h = 5u16.min(size.height.saturating_sub(2));
    f.render_widget(warn, center_rect(w, h, size));
}

fn draw_exit_dialog<B: Backend>(f: &mut Frame<B>, dialog: &ExitDialog, styles: &UiStyles, size: Rect) {
    let w = 48u16.min(size.width.saturating_sub(4));
    let h = 8u16.min(size.height.saturating_sub(2));
    let area = center_rect(w, h, size);
    f.render_widget(Clear, area);

    let yes_style = if dialog.focus_yes {
        styles.button_focused
    } else {
        styles.button
    };
    let no_style = if dialog.focus_yes {
        styles.button
    } else {
        styles.button_focused
    };

    let lines = vec![
        Spans::from(Span::styled(
            dialog.head.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Spans::from(""),
        Spans::from(Span::raw(dialog.body.clone())),
        Spans::from(""),
        Spans::from(vec![
            Span::styled(format!(" {} ", dialog.yes), yes_style),
            Span::raw("    "),
            Span::styled(format!(" {} ", dialog.no), no_style),
        ]),
    ];
    let body = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(dialog.title.clone()),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(body, area);
}

fn center_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
