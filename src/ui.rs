use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode, LEARN_MORE_URL, PanelTab};
use crate::model::{ListBranch, StatusIcon};
use crate::route::Route;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_left_header_line(app);
    let right_line = build_right_header_line(app);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_left_header_line(app: &App) -> Line<'static> {
    let (icon, view) = match app.route() {
        Route::SensorList { .. } => ("󰒍", "sensors"),
        Route::SensorDetail { .. } => ("󰈙", "detail"),
        Route::EventFlow { .. } => ("󱁉", "event-flow"),
    };
    let namespace = match app.managed_namespace() {
        Some(managed) => format!(" 󰌾 {} ", compact_text(managed, 18)),
        None => format!(" 󰉖 {} ", compact_text(app.namespace_label(), 18)),
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " sensorscope ", Color::White, PL_A, PL_B);
    push_powerline_segment(&mut spans, namespace, Color::White, PL_B, PL_C);
    push_powerline_segment(
        &mut spans,
        format!(" {icon} {view} "),
        Color::White,
        PL_C,
        BG,
    );
    spans.push(Span::styled(
        format!(" {}", compact_text(&app.route_text(), 60)),
        Style::default().fg(MUTED).bg(BG),
    ));
    Line::from(spans)
}

fn build_right_header_line(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    let loaded = app
        .loaded_at()
        .map(|at| format!(" 󰥔 {at} "))
        .unwrap_or_else(|| " 󰥔 -- ".to_string());
    push_powerline_segment_rtl(&mut spans, loaded, Color::White, PL_C, BG);
    push_powerline_segment_rtl(
        &mut spans,
        format!(" 󰠳 {} ", compact_text(app.context(), 24)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment_rtl(
        &mut spans,
        format!(" {} ", compact_text(&display_cluster_endpoint(app.cluster()), 28)),
        Color::Black,
        ACCENT,
        PL_B,
    );
    spans.push(Span::styled(" ", Style::default().bg(ACCENT)));
    Line::from(spans)
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    app.set_table_page_size(table_rows_visible(area));

    match app.route() {
        Route::SensorList { .. } => {
            render_sensor_list(frame, area, app);
            if app.side_panel_open() && app.selected_node().is_none() {
                render_creator_panel(frame, side_panel_area(area), app);
            }
            if app.selected_node().is_some() {
                render_sensor_panel(frame, side_panel_area(area), app);
            }
        }
        Route::SensorDetail { .. } => render_detail(frame, area, app),
        Route::EventFlow { .. } => render_event_flow(frame, area, app),
    }
}

fn render_sensor_list(frame: &mut Frame, area: Rect, app: &App) {
    match app.branch() {
        ListBranch::Loading => {
            let loading = Paragraph::new(Line::from(vec![
                Span::styled("󰔟 ", Style::default().fg(ACCENT)),
                Span::styled(
                    format!("Loading sensors in {}…", app.namespace_label()),
                    Style::default().fg(MUTED),
                ),
            ]))
            .alignment(Alignment::Center)
            .block(panel_block("Sensors", ACCENT));
            frame.render_widget(loading, area);
        }
        ListBranch::Error => {
            let panel = Paragraph::new(Text::from(app.error().unwrap_or_default().to_string()))
                .wrap(Wrap { trim: false })
                .block(panel_block("Sensors Error", ERROR))
                .style(Style::default().fg(ERROR));
            frame.render_widget(panel, area);
        }
        ListBranch::ZeroState => render_zero_state(frame, area),
        ListBranch::Populated => render_sensor_table(frame, area, app),
    }
}

fn render_zero_state(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "No sensors",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Sensors listen to events on the event bus and run triggers when their dependencies resolve.",
            Style::default().fg(MUTED),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Learn more: ", Style::default().fg(MUTED)),
            Span::styled(
                LEARN_MORE_URL,
                Style::default()
                    .fg(Color::Rgb(125, 211, 252))
                    .add_modifier(Modifier::UNDERLINED),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Press c to create a sensor.",
            Style::default().fg(ACCENT),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel_block("Sensors (0)", ACCENT));
    frame.render_widget(paragraph, area);
}

fn render_sensor_table(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let headers = ["", "NAME", "NAMESPACE", "CREATED", "LOGS"];
    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.to_string()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = app.rows();
    let table_rows = rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.icon.glyph()).style(Style::default().fg(status_color(row.icon))),
            Cell::from(row.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(row.namespace.clone()).style(Style::default().fg(Color::White)),
            Cell::from(row.created.clone()).style(Style::default().fg(Color::White)),
            Cell::from("󰍩 l").style(Style::default().fg(MUTED)),
        ])
    });

    let table = Table::new(
        table_rows,
        vec![
            Constraint::Length(2),
            Constraint::Percentage(38),
            Constraint::Percentage(26),
            Constraint::Percentage(24),
            Constraint::Length(6),
        ],
    )
    .header(header_row)
    .block(panel_block(&format!("Sensors ({})", rows.len()), ACCENT))
    .column_spacing(1)
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(24, 36, 58))
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(app.selected_row_index());
    frame.render_stateful_widget(table, chunks[0], &mut state);

    let footnote = Paragraph::new(Line::from(vec![
        Span::styled(" 󱁉 ", Style::default().fg(ACCENT)),
        Span::styled(
            "Press f to see how these sensors connect to event sources in the event flow.",
            Style::default().fg(MUTED),
        ),
    ]))
    .style(Style::default().bg(BG));
    frame.render_widget(footnote, chunks[1]);
}

fn render_creator_panel(frame: &mut Frame, area: Rect, app: &App) {
    frame.render_widget(Clear, area);
    let mut lines = vec![
        Line::from(Span::styled(
            "Enter opens this template in $EDITOR; saving creates the sensor.",
            Style::default().fg(MUTED),
        )),
        Line::from(""),
    ];
    lines.extend(highlight_yaml_text(&app.creator_template()).lines);

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Create Sensor", ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(panel, area);
}

fn render_sensor_panel(frame: &mut Frame, area: Rect, app: &App) {
    frame.render_widget(Clear, area);
    let Some(selected) = app.resolve_selected() else {
        return;
    };

    let title = format!("{} {}/{}", selected.id.kind, selected.id.namespace, selected.id.name);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let mut tabs = Vec::new();
    for (tab, label) in [(PanelTab::Summary, " Summary "), (PanelTab::Logs, " Logs ")] {
        let style = if tab == app.panel_tab() {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED).bg(PANEL)
        };
        tabs.push(Span::styled(label, style));
        tabs.push(Span::styled(" ", Style::default().bg(PANEL)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(tabs)).style(Style::default().bg(PANEL)),
        chunks[0],
    );

    let body = match app.panel_tab() {
        PanelTab::Summary => {
            let Some(sensor) = selected.value else {
                let missing = Paragraph::new(format!(
                    "Sensor {} is not in the loaded list.",
                    selected.id
                ))
                .wrap(Wrap { trim: false })
                .block(panel_block(&title, WARN))
                .style(Style::default().fg(WARN));
                frame.render_widget(missing, chunks[1]);
                return;
            };

            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{} ", sensor.status_icon().glyph()),
                    Style::default().fg(status_color(sensor.status_icon())),
                ),
                Span::styled(
                    sensor.name().to_string(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ])];
            push_section(&mut lines, "Conditions");
            if sensor.conditions().is_empty() {
                lines.push(muted_line("  none reported"));
            }
            for condition in sensor.conditions() {
                let color = if condition.status.eq_ignore_ascii_case("false") {
                    ERROR
                } else {
                    ACCENT
                };
                let mut spans = vec![
                    Span::styled(format!("  {}", condition.type_), Style::default().fg(Color::White)),
                    Span::styled(format!(" {}", condition.status), Style::default().fg(color)),
                ];
                if let Some(message) = condition.message.as_deref().filter(|m| !m.is_empty()) {
                    spans.push(Span::styled(
                        format!("  {message}"),
                        Style::default().fg(MUTED),
                    ));
                }
                lines.push(Line::from(spans));
            }

            push_section(&mut lines, "Dependencies");
            if sensor.spec.dependencies.is_empty() {
                lines.push(muted_line("  none"));
            }
            for dependency in &sensor.spec.dependencies {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}", dependency.name), Style::default().fg(Color::White)),
                    Span::styled(
                        format!("  {}:{}", dependency.event_source_name, dependency.event_name),
                        Style::default().fg(MUTED),
                    ),
                ]));
            }

            push_section(&mut lines, "Triggers");
            let triggers = sensor.trigger_names();
            if triggers.is_empty() {
                lines.push(muted_line("  none"));
            }
            for trigger in triggers {
                let selected_trigger = selected.id.key.as_deref() == Some(trigger.as_str());
                let style = if selected_trigger {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Rgb(94, 234, 212))
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let marker = if selected_trigger { "󰜴 " } else { "  " };
                lines.push(Line::from(Span::styled(format!("{marker}{trigger}"), style)));
            }

            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((app.scroll(), 0))
                .block(panel_block(&title, ACCENT))
                .style(Style::default().fg(Color::White))
        }
        PanelTab::Logs => {
            let (text, color) = match app.logs_text() {
                Ok(text) => (text.to_string(), Color::White),
                Err(error) => (error.to_string(), ERROR),
            };
            Paragraph::new(Text::from(text))
                .wrap(Wrap { trim: false })
                .scroll((app.scroll(), 0))
                .block(panel_block(&format!("{title} logs"), ACCENT))
                .style(Style::default().fg(color))
        }
    };
    frame.render_widget(body, chunks[1]);
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let (text, border) = match app.detail_text() {
        Ok(detail) => (highlight_yaml_text(detail), ACCENT),
        Err(error) => (
            Text::from(Span::styled(error.to_string(), Style::default().fg(ERROR))),
            ERROR,
        ),
    };
    let paragraph = Paragraph::new(text)
        .block(panel_block(&app.detail_title(), border))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(), 0));
    frame.render_widget(paragraph, area);
}

fn render_event_flow(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!("Event Flow ({})", app.namespace_label());
    let lines = app.event_flow_lines();
    let text = if lines.is_empty() {
        Text::from(muted_line("No sensors loaded for this namespace."))
    } else {
        Text::from(
            lines
                .into_iter()
                .map(|line| highlight_flow_line(&line))
                .collect::<Vec<_>>(),
        )
    };
    let paragraph = Paragraph::new(text)
        .block(panel_block(&title, ACCENT))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(), 0));
    frame.render_widget(paragraph, area);
}

fn highlight_flow_line(line: &str) -> Line<'static> {
    let Some((source, target)) = line.split_once(" ──▶ ") else {
        return Line::from(line.to_string());
    };
    Line::from(vec![
        Span::styled(source.to_string(), Style::default().fg(Color::Rgb(125, 211, 252))),
        Span::styled(" ──▶ ", Style::default().fg(ACCENT)),
        Span::styled(target.to_string(), Style::default().fg(Color::White)),
    ])
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    if app.mode() == InputMode::Normal {
        let status_text = app.status().to_string();
        let mut spans = Vec::new();
        push_powerline_segment(&mut spans, " 󰘳 nrm ", Color::White, PL_A, PL_B);
        push_powerline_segment(
            &mut spans,
            format!(
                " {} {} ",
                footer_status_icon(&status_text),
                compact_text(&status_text, area.width.saturating_sub(24).max(24) as usize)
            ),
            Color::White,
            PL_B,
            BG,
        );

        let hints = Span::styled(footer_hints(app), Style::default().fg(MUTED));
        let hint_width = hints.content.chars().count() as u16;
        let left_width = spans_width(&spans) as u16;
        if left_width.saturating_add(hint_width) >= area.width {
            frame.render_widget(
                Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
                area,
            );
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(hint_width)])
            .split(area);
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(Line::from(hints))
                .style(Style::default().bg(BG))
                .alignment(Alignment::Right),
            chunks[1],
        );
        return;
    }

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " 󰉖 ns ", Color::Black, WARN, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.input()),
        Color::White,
        PL_B,
        BG,
    );

    let completions = app.namespace_completions();
    if !completions.is_empty() {
        let selected = app
            .completion_index()
            .min(completions.len().saturating_sub(1));
        let start = selected.saturating_sub(2);
        let available_width = area.width as usize;
        let mut used_width = spans_width(&spans);
        spans.push(Span::raw(" "));
        used_width = used_width.saturating_add(1);
        if start > 0 {
            spans.push(Span::styled("… ", Style::default().fg(MUTED)));
            used_width = used_width.saturating_add(2);
        }
        for (absolute_index, item) in completions.iter().enumerate().skip(start) {
            let chunk = format!("{item} ");
            let chunk_width = chunk.chars().count();
            if used_width.saturating_add(chunk_width + 1) > available_width {
                spans.push(Span::styled("…", Style::default().fg(MUTED)));
                break;
            }
            let style = if absolute_index == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Rgb(94, 234, 212))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            };
            spans.push(Span::styled(chunk, style));
            used_width = used_width.saturating_add(chunk_width);
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn footer_hints(app: &App) -> String {
    match app.route() {
        Route::SensorList { .. } if app.selected_node().is_some() => {
            "j/k trigger  Tab logs  Esc close ".to_string()
        }
        Route::SensorList { .. } if app.side_panel_open() => {
            "Enter edit  Esc close ".to_string()
        }
        Route::SensorList { .. } => "Enter open  l logs  c create  n ns  ? help ".to_string(),
        Route::SensorDetail { .. } | Route::EventFlow { .. } => {
            "j/k scroll  [ back  ] forward  Esc close ".to_string()
        }
    }
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "error",
        "timed out",
        "refused",
        "forbidden",
        "denied",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(72, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "sensorscope help  namespace:{}  route:{}",
            app.namespace_label(),
            app.route_text()
        )),
        Line::from(""),
    ];
    for line in help_lines(app) {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help", ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn help_lines(app: &App) -> Vec<String> {
    let mut lines = vec![
        "Move: j/k or arrows  g/G top/bottom  Ctrl+d/Ctrl+u page".to_string(),
        "List: Enter detail  l logs panel  c create  f event flow".to_string(),
        "Filter: n or / namespace (Tab completes, empty = all)".to_string(),
        "View: t toggle ISO/relative timestamps".to_string(),
        "History: [ or Alt+Left back  ] or Alt+Right forward".to_string(),
        "Panels: Tab summary/logs  Esc close  q quit".to_string(),
    ];
    if let Some(managed) = app.managed_namespace() {
        lines.push(format!("Namespace is managed by configuration: {managed}"));
    }
    lines
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(highlight_yaml_line)
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if let Some(comment) = trimmed.strip_prefix('#') {
        spans.push(Span::styled(
            format!("#{comment}"),
            Style::default().fg(MUTED),
        ));
        return Line::from(spans);
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(
            key.to_string(),
            Style::default().fg(Color::Rgb(103, 232, 249)),
        ),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    if value.trim().is_empty() {
        return spans;
    }

    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim())),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else {
        Color::Rgb(147, 197, 253)
    }
}

fn status_color(icon: StatusIcon) -> Color {
    match icon {
        StatusIcon::Neutral => MUTED,
        StatusIcon::Healthy => ACCENT,
        StatusIcon::Failed => ERROR,
    }
}

fn push_section(lines: &mut Vec<Line<'static>>, label: &str) {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        label.to_string(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )));
}

fn muted_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), Style::default().fg(MUTED)))
}

fn panel_block(title: &str, border: Color) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(4).max(1) as usize
}

fn side_panel_area(area: Rect) -> Rect {
    let width = (area.width / 2).max(area.width.min(48));
    Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height: area.height,
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
