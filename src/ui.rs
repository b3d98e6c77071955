use ratatui::{
    layout::Alignment,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};

/// Main entry point for drawing the TUI. Dispatches to individual pane drawers.
pub fn draw(f: &mut Frame, app: &mut App) {
    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Header
                Constraint::Min(10),   // Demo list + details
                Constraint::Length(3), // Search
                Constraint::Length(5), // Status / filters / shortcuts
            ]
            .as_ref(),
        )
        .split(f.area());

    let header = Paragraph::new("Prisma Core Demo Library")
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .alignment(Alignment::Center);
    f.render_widget(header, vertical_chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(vertical_chunks[1]);

    draw_list_pane(f, app, main_chunks[0]);
    draw_details_pane(f, app, main_chunks[1]);
    draw_search_pane(f, app, vertical_chunks[2]);
    draw_status_pane(f, app, vertical_chunks[3]);
}

/// Renders the left pane containing the filtered demos.
fn draw_list_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = if app.is_loading && app.filtered_templates.is_empty() {
        vec![ListItem::new("Fetching demos from the library...")
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))]
    } else if app.catalog.is_empty() {
        vec![ListItem::new("No demos available. Press R to refresh.")
            .style(Style::default().fg(Color::Yellow))]
    } else if app.filtered_templates.is_empty() {
        vec![ListItem::new("No results found.").style(Style::default().fg(Color::Yellow))]
    } else {
        app.filtered_templates
            .iter()
            .map(|t| {
                let builder = if t.page_builder.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", t.page_builder)
                };
                ListItem::new(Line::from(vec![
                    Span::raw(t.display_name().to_string()),
                    Span::styled(builder, Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect()
    };

    let mut state = ListState::default();
    if app.filtered_templates.is_empty() {
        state.select(None);
    } else {
        state.select(Some(app.highlighted_index));
    }

    let title = format!(
        " Demos ({}/{}) ",
        app.filtered_templates.len(),
        app.catalog.len()
    );
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, area, &mut state);
}

/// Renders the right pane with the highlighted demo and its plugins.
fn draw_details_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let missing = app.missing_plugin_count();
    let (title, color) = if missing > 0 {
        (format!(" Details ({} plugins missing) ", missing), Color::Red)
    } else {
        (" Details ".to_string(), Color::Yellow)
    };

    let details = Paragraph::new(app.get_details())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    title,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.details_scroll, 0));

    f.render_widget(details, area);
}

/// Renders the search input field.
fn draw_search_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let input_style = if let InputMode::Editing = app.input_mode {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = if let InputMode::Editing = app.input_mode {
        Span::styled(" Search (Typing...) ", Style::default().fg(Color::Cyan))
    } else {
        Span::styled(
            " Search (Press '/' or 'i' to type) ",
            Style::default().fg(Color::DarkGray),
        )
    };

    let input = Paragraph::new(app.search_query.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(input_style),
        );
    f.render_widget(input, area);

    if let InputMode::Editing = app.input_mode {
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(app.search_query.chars().count() as u16);
        let max_x = area.x.saturating_add(area.width.saturating_sub(1));
        let cursor_x = cursor_x.min(max_x);
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

/// Renders the bottom bar: notifications, active filters and key shortcuts.
fn draw_status_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let mut status_lines = Vec::new();

    if let Some(msg) = &app.notification {
        status_lines.push(Line::from(vec![
            Span::styled(
                " INFO ",
                Style::default()
                    .bg(Color::Green)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(msg, Style::default().fg(Color::LightGreen)),
        ]));
    } else if let Some(err) = &app.error {
        status_lines.push(Line::from(vec![
            Span::styled(
                " ERROR ",
                Style::default()
                    .bg(Color::Red)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(err, Style::default().fg(Color::LightRed)),
        ]));
    } else {
        let chip = |label: &str, value: Option<&String>| {
            vec![
                Span::styled(
                    format!(" {}: ", label),
                    Style::default()
                        .bg(Color::Cyan)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                match value {
                    Some(v) => Span::styled(v.clone(), Style::default().fg(Color::Green)),
                    None => Span::styled("all", Style::default().fg(Color::DarkGray)),
                },
                Span::raw("   "),
            ]
        };
        let mut spans = chip("CATEGORY", app.category.as_ref());
        spans.extend(chip("BUILDER", app.builder.as_ref()));
        status_lines.push(Line::from(spans));
    }

    status_lines.push(Line::from(""));

    let shortcuts = [
        ("/", "Search"),
        ("C", "Category"),
        ("B", "Builder"),
        ("X", "Clear"),
        ("ALT+J/K", "Scroll"),
        ("R", "Refresh"),
        ("Q", "Quit"),
    ];

    let mut shortcut_spans = Vec::new();
    for (i, (key, desc)) in shortcuts.iter().enumerate() {
        if i > 0 {
            shortcut_spans.push(Span::raw("  "));
        }
        shortcut_spans.push(Span::styled(
            format!(" {} ", key),
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
        shortcut_spans.push(Span::raw(format!(" {}", desc)));
    }
    status_lines.push(Line::from(shortcut_spans));

    let status = Paragraph::new(status_lines)
        .block(Block::default().borders(Borders::ALL).title(" Info & Controls "));
    f.render_widget(status, area);
}
