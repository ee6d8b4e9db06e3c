use crate::feed::Footer;
use crate::model::{Filter, Theme};
use crate::tasks::EmptyState;
use crate::tui::state::{AppState, InputMode, Tab};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

/// Each post renders as a title line plus a body line.
const POST_ITEM_HEIGHT: usize = 2;

#[derive(Clone, Copy)]
struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    muted: Color,
    highlight: Color,
    error: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            fg: Color::Black,
            bg: Color::White,
            accent: Color::Blue,
            muted: Color::Gray,
            highlight: Color::LightBlue,
            error: Color::Red,
        },
        Theme::Dark => Palette {
            fg: Color::White,
            bg: Color::Black,
            accent: Color::Yellow,
            muted: Color::DarkGray,
            highlight: Color::DarkGray,
            error: Color::LightRed,
        },
    }
}

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let pal = palette(state.theme());
    let base = Style::default().fg(pal.fg).bg(pal.bg);
    f.render_widget(Block::default().style(base), f.area());

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    // --- Tabs ---
    let selected = match state.tab {
        Tab::Tasks => 0,
        Tab::Posts => 1,
    };
    let theme_label = if state.theme().is_dark() { "dark" } else { "light" };
    let tabs = Tabs::new(vec![" Task Manager ", " Posts "])
        .select(selected)
        .style(base)
        .highlight_style(Style::default().fg(pal.accent).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" taskfeed ({theme_label}) ")),
        );
    f.render_widget(tabs, v_chunks[0]);

    match state.tab {
        Tab::Tasks => draw_tasks(f, state, v_chunks[1], pal),
        Tab::Posts => draw_posts(f, state, v_chunks[1], pal),
    }

    draw_footer(f, state, v_chunks[2], pal);
}

fn draw_tasks(f: &mut Frame, state: &mut AppState, area: Rect, pal: Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    // Filter bar
    let current = state.tasks.filter();
    let mut spans = Vec::new();
    for (i, filter) in Filter::ALL.iter().enumerate() {
        let style = if *filter == current {
            Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(pal.muted)
        };
        spans.push(Span::styled(format!(" {}:{} ", i + 1, filter.label()), style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    let title = format!(
        " Tasks ({} active, {} done) ",
        state.tasks.active_count(),
        state.tasks.completed_count()
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(empty) = state.tasks.empty_state() {
        let text = match empty {
            EmptyState::NoTasks => "No tasks yet. Add one with 'a'!",
            EmptyState::NoMatches => "No tasks match the current filter.",
        };
        let p = Paragraph::new(text)
            .style(Style::default().fg(pal.muted))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(p, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = state
        .tasks
        .visible_tasks()
        .iter()
        .map(|t| {
            let (checkbox, style) = if t.completed {
                (
                    "[x]",
                    Style::default()
                        .fg(pal.muted)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ("[ ]", Style::default().fg(pal.fg))
            };
            ListItem::new(Line::from(vec![Span::styled(
                format!("{} {}", checkbox, t.text),
                style,
            )]))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::BOLD)
            .bg(pal.highlight),
    );
    f.render_stateful_widget(list, chunks[1], &mut state.task_state);
}

fn draw_posts(f: &mut Frame, state: &mut AppState, area: Rect, pal: Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let query = state.feed.search_query();
    let search_line = if query.is_empty() {
        Line::from(Span::styled(" /: Search posts...", Style::default().fg(pal.muted)))
    } else {
        Line::from(vec![
            Span::styled(" Search: ", Style::default().fg(pal.muted)),
            Span::styled(query.to_string(), Style::default().fg(pal.accent)),
        ])
    };
    f.render_widget(Paragraph::new(search_line), chunks[0]);

    if let Some(message) = state.feed.error() {
        let text = vec![
            Line::from(Span::styled(
                "Error",
                Style::default().fg(pal.error).add_modifier(Modifier::BOLD),
            )),
            Line::from(message.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "r: Try again | R: Reload",
                Style::default().fg(pal.muted),
            )),
        ];
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(pal.error))
                    .title(" Posts "),
            );
        f.render_widget(p, chunks[1]);
        state.post_rows = 0;
        return;
    }

    let items: Vec<ListItem> = state
        .feed
        .filtered_posts()
        .map(|p| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    p.title.clone(),
                    Style::default().fg(pal.fg).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    p.body.replace('\n', " "),
                    Style::default().fg(pal.muted),
                )),
            ])
        })
        .collect();

    let title = format!(
        " Posts ({} of {}) ",
        state.feed.filtered_len(),
        state.feed.posts().len()
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(pal.highlight));

    // Inner height minus borders
    state.post_rows = (chunks[1].height.saturating_sub(2) as usize) / POST_ITEM_HEIGHT;
    f.render_stateful_widget(list, chunks[1], &mut state.post_state);

    let (footer, color) = match state.feed.footer() {
        Footer::Loading => ("Loading posts...", pal.accent),
        Footer::Error => ("", pal.error),
        Footer::NoResults => ("No posts found matching your search.", pal.muted),
        Footer::More => ("", pal.muted),
        Footer::End => ("No more posts to load.", pal.muted),
    };
    let footer = Paragraph::new(footer)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[2]);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect, pal: Palette) {
    match state.mode {
        InputMode::Creating | InputMode::Searching => {
            let (title, prefix, color) = match state.mode {
                InputMode::Searching => (" Search ", "/ ", Color::Green),
                _ => (" Add Task ", "> ", pal.accent),
            };
            let input = Paragraph::new(format!("{}{}", prefix, state.input_buffer))
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(input, area);
            let cursor_x = area.x + 1 + prefix.chars().count() as u16 + state.cursor_position as u16;
            let cursor_y = area.y + 1;
            f.set_cursor_position((cursor_x, cursor_y));
        }
        InputMode::Normal => {
            let f_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            let status_color = if state.message.contains("Error") {
                pal.error
            } else {
                Color::Cyan
            };
            let status = Paragraph::new(state.message.clone())
                .style(Style::default().fg(status_color))
                .block(
                    Block::default()
                        .borders(Borders::LEFT | Borders::TOP | Borders::BOTTOM)
                        .title(" Status "),
                );
            let help_text = match state.tab {
                Tab::Tasks => "a:Add | Space:Done | d:Del | 1-3:Filter | t:Theme | q:Quit",
                Tab::Posts => "/:Find | r:Retry | R:Reload | t:Theme | q:Quit",
            };
            let help = Paragraph::new(help_text)
                .style(Style::default().fg(pal.muted))
                .alignment(Alignment::Right)
                .block(
                    Block::default()
                        .borders(Borders::RIGHT | Borders::TOP | Borders::BOTTOM)
                        .title(" Actions "),
                );
            f.render_widget(status, f_chunks[0]);
            f.render_widget(help, f_chunks[1]);
        }
    }
}
