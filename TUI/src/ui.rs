use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::config::COMMANDS;
use crate::effect::StatusKind;
use crate::plot::{self, TerminalChart};
use crate::submission::SubmissionState;
use crate::ui_state::Focus;

// Copper Sapphire Morning color palette
pub(crate) const BG_DARK: Color = Color::Rgb(12, 12, 16);           // Deep background
const BG_PANEL: Color = Color::Rgb(18, 18, 24);                     // Slightly lighter for panels

// Sapphire blues
const SAPPHIRE: Color = Color::Rgb(101, 150, 243);                  // #6596F3 - Primary accent
const CYAN_LIGHT: Color = Color::Rgb(178, 220, 226);                // #B2DCE2 - Light cyan

// Copper/warm tones
const COPPER: Color = Color::Rgb(138, 72, 38);                      // #8A4826 - Copper
pub(crate) const PALE_YELLOW: Color = Color::Rgb(234, 208, 148);    // #EAD094 - Pale yellow

// Accent colors
const BURGUNDY: Color = Color::Rgb(204, 92, 68);                    // #CC5C44 - Warnings/errors
const OLIVE: Color = Color::Rgb(131, 179, 102);                     // #83B366 - Success/green
const LAVENDER: Color = Color::Rgb(211, 164, 234);                  // #D3A4EA - Purple accent

// Text colors
const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 245);              // Near white
pub(crate) const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 190); // Light gray
const TEXT_MUTED: Color = Color::Rgb(105, 116, 133);                // #697485 - Medium gray

// Border colors (subtle)
const BORDER_DIM: Color = Color::Rgb(45, 50, 60);                   // Dim border

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

fn spinner(anim_frame: usize) -> &'static str {
    SPINNER[(anim_frame / 6) % SPINNER.len()]
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { SAPPHIRE } else { BORDER_DIM }))
}

pub fn draw(frame: &mut Frame, app: &App) {
    // Fill entire background
    let bg = Block::default().style(Style::default().bg(BG_DARK));
    frame.render_widget(bg, frame.area());

    let area = frame.area();
    let padded = Rect {
        x: area.x + 1,
        y: area.y,
        width: area.width.saturating_sub(2),
        height: area.height,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(8),    // Chart
            Constraint::Length(5), // Similarity + preview
            Constraint::Length(1), // Status
            Constraint::Length(3), // Input
        ])
        .split(padded);

    draw_header(frame, app, chunks[0]);
    draw_chart(frame, app, chunks[1]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Length(1), Constraint::Min(20)])
        .split(chunks[2]);
    draw_similarity(frame, app, panels[0]);
    draw_preview(frame, app, panels[2]);

    draw_status(frame, app, chunks[3]);
    draw_input(frame, app, chunks[4]);

    if app.showing_command_popup() {
        draw_command_popup(frame, app, chunks[4]);
    }
    if app.ui.show_help {
        draw_help(frame, area);
    }
    if app.ui.confirm_reset {
        draw_confirm_reset(frame, area);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let selected = app.session.selection().len();
    let header = Line::from(vec![
        Span::styled(" embedviz ", Style::default().fg(BG_DARK).bg(SAPPHIRE).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", app.api_url), Style::default().fg(TEXT_MUTED)),
        Span::styled(
            format!("  {} points", app.session.store().len()),
            Style::default().fg(TEXT_SECONDARY),
        ),
        Span::styled(format!("  {}/2 selected", selected), Style::default().fg(LAVENDER)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Draw the mounted chart, or an empty-state hint when nothing is mounted
fn draw_chart(frame: &mut Frame, app: &App, area: Rect) {
    let chart: &TerminalChart = app.session.chart().surface();
    let count = chart.spec().map_or(0, |s| s.entries.len());

    let mut block = panel(" Embeddings ", app.ui.focus == Focus::Chart)
        .title(
            Line::from(Span::styled(
                format!(" {} ", count),
                Style::default().fg(TEXT_MUTED),
            ))
            .right_aligned(),
        );
    if let Some(spec) = chart.spec() {
        block = block
            .title_bottom(Line::from(format!(" {} → ", spec.x_title)).centered())
            .title_bottom(Line::from(format!(" ↑ {} ", spec.y_title)).left_aligned());
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    chart.set_plot_area(inner);

    let Some(spec) = chart.spec() else {
        let empty_msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No embeddings yet", Style::default().fg(TEXT_MUTED))),
            Line::from(""),
            Line::from(Span::styled(
                "Type some text below and press Enter",
                Style::default().fg(TEXT_MUTED),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(empty_msg, inner);
        return;
    };

    let cursor = if app.ui.focus == Focus::Chart { chart.cursor() } else { None };
    frame.render_widget(Paragraph::new(plot::rasterize(spec, inner, cursor)), inner);

    // Draw tooltip for hovered point (if any)
    if let Some(entry) = chart.hovered() {
        let viewport = plot::Viewport::fit(&spec.entries);
        let (px, py) = viewport.project(entry.x, entry.y, inner);

        let tooltip_text = format!(" {} ", entry.tooltip());
        let tooltip_width = (unicode_width::UnicodeWidthStr::width(tooltip_text.as_str()) as u16)
            .min(inner.width);

        // Below the point in the top half, above it in the bottom half
        let tip_x = px.min(inner.x + inner.width.saturating_sub(tooltip_width));
        let tip_y = if py < inner.y + inner.height / 2 {
            (py + 1).min(inner.y + inner.height.saturating_sub(1))
        } else {
            py.saturating_sub(1).max(inner.y)
        };

        let tooltip_area = Rect {
            x: tip_x,
            y: tip_y,
            width: tooltip_width,
            height: 1,
        };
        frame.render_widget(Clear, tooltip_area);
        frame.render_widget(
            Paragraph::new(tooltip_text).style(TerminalChart::tooltip_style()),
            tooltip_area,
        );
    }
}

fn draw_similarity(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Similarity ", false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let similarity = app.session.similarity();
    let selection = app.session.selection();
    let store = app.session.store();

    let lines = if let Some(result) = similarity.result() {
        vec![
            Line::from(vec![
                Span::styled(result.point_a.label.clone(), Style::default().fg(PALE_YELLOW).add_modifier(Modifier::BOLD)),
                Span::styled("  ↔  ", Style::default().fg(TEXT_MUTED)),
                Span::styled(result.point_b.label.clone(), Style::default().fg(PALE_YELLOW).add_modifier(Modifier::BOLD)),
            ]),
            Line::from(vec![
                Span::styled("cosine similarity ", Style::default().fg(TEXT_MUTED)),
                Span::styled(format!("{:.4}", result.score), Style::default().fg(OLIVE).add_modifier(Modifier::BOLD)),
            ]),
        ]
    } else if let Some(pending) = similarity.pending() {
        vec![
            Line::from(Span::styled(
                format!("{} ↔ {}", pending.a.label, pending.b.label),
                Style::default().fg(TEXT_SECONDARY),
            )),
            Line::from(Span::styled(
                format!("{} computing similarity...", spinner(app.animation_frame)),
                Style::default().fg(SAPPHIRE),
            )),
        ]
    } else if let Some(label) = selection.ids().first().and_then(|id| store.get(id)).map(|p| p.label.clone()) {
        vec![
            Line::from(vec![
                Span::styled("selected ", Style::default().fg(TEXT_MUTED)),
                Span::styled(label, Style::default().fg(PALE_YELLOW)),
            ]),
            Line::from(Span::styled("pick one more point", Style::default().fg(TEXT_MUTED))),
        ]
    } else {
        vec![Line::from(Span::styled(
            "Click two points to compare them",
            Style::default().fg(TEXT_MUTED),
        ))]
    };

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_preview(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Last embedding ", false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(preview) = &app.preview else {
        frame.render_widget(
            Paragraph::new(Span::styled("Nothing submitted yet", Style::default().fg(TEXT_MUTED))),
            inner,
        );
        return;
    };

    let mut lines = Vec::new();
    if let Some(text) = &preview.text {
        lines.push(Line::from(vec![
            Span::styled("\"", Style::default().fg(TEXT_MUTED)),
            Span::styled(text.clone(), Style::default().fg(TEXT_PRIMARY)),
            Span::styled("\"", Style::default().fg(TEXT_MUTED)),
        ]));
    }
    lines.push(Line::from(Span::styled(
        preview.to_string(),
        Style::default().fg(CYAN_LIGHT),
    )));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let Some(line) = &app.status else {
        return;
    };

    let (icon, color) = match line.status.kind {
        StatusKind::Info => ("i".to_string(), SAPPHIRE),
        StatusKind::Loading => (spinner(app.animation_frame).to_string(), LAVENDER),
        StatusKind::Success => ("✓".to_string(), OLIVE),
        StatusKind::Error => ("✗".to_string(), BURGUNDY),
    };

    let status = Line::from(vec![
        Span::styled(format!(" {} ", icon), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("{} ", line.at.format("%H:%M:%S")),
            Style::default().fg(TEXT_MUTED),
        ),
        Span::styled(line.status.message.clone(), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(status), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let busy = !app.session.can_submit();

    let border_color = if busy {
        BORDER_DIM
    } else if app.ui.focus == Focus::Input {
        // Pulsing border when focused
        let glow = (app.animation_frame as f64 / 90.0).sin() * 0.3 + 0.7;
        let r = (101.0 * glow) as u8;
        let g = (150.0 * glow) as u8;
        let b = (243.0 * glow) as u8;
        Color::Rgb(r, g, b)
    } else {
        BORDER_DIM
    };

    let title = match app.session.submission_state() {
        SubmissionState::Idle => " Text ".to_string(),
        SubmissionState::Submitting => format!(" {} embedding... ", spinner(app.animation_frame)),
        SubmissionState::Refreshing => format!(" {} refreshing... ", spinner(app.animation_frame)),
    };

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(if busy { TEXT_MUTED } else { COPPER })))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cursor = if !busy && app.ui.focus == Focus::Input && app.animation_frame % 30 < 15 {
        "|"
    } else {
        " "
    };
    let input_text = format!(" > {}{}", app.ui.input, cursor);

    let input = Paragraph::new(input_text)
        .style(Style::default().fg(if busy { TEXT_MUTED } else { TEXT_PRIMARY }));
    frame.render_widget(input, inner);
}

fn draw_command_popup(frame: &mut Frame, app: &App, input_area: Rect) {
    // Get filtered commands from app
    let filtered = app.get_filtered_commands();

    if filtered.is_empty() {
        return;
    }

    // +1 for the "your input" option, +2 for borders
    let popup_height = (filtered.len() + 3) as u16;
    let popup_width = 44.min(input_area.width.saturating_sub(4));
    let popup_area = Rect {
        x: input_area.x + 2,
        y: input_area.y.saturating_sub(popup_height),
        width: popup_width,
        height: popup_height,
    };

    // Clear area behind popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" Commands ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(COPPER))
        .style(Style::default().bg(BG_PANEL));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = Vec::new();

    // First option: current typed input (selected when command_selection is None)
    let input_selected = app.ui.command_selection.is_none();
    let input_style = if input_selected {
        Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };
    let indicator = if input_selected { ">" } else { " " };
    lines.push(Line::from(vec![
        Span::styled(format!("{} {} ", indicator, &app.ui.input), input_style),
        Span::styled("(your input)", Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC)),
    ]));

    for (i, (cmd, desc)) in filtered.iter().enumerate() {
        let is_selected = app.ui.command_selection == Some(i);
        let style = if is_selected {
            Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_SECONDARY)
        };
        let indicator = if is_selected { ">" } else { " " };

        lines.push(Line::from(vec![
            Span::styled(format!("{} {} ", indicator, cmd), style),
            Span::styled(format!("- {}", desc), Style::default().fg(TEXT_MUTED)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let keys: &[(&str, &str)] = &[
        ("Enter", "submit text / run command"),
        ("Tab", "switch focus (text / chart)"),
        ("click", "select or deselect a point"),
        ("← →", "move point cursor (chart focus)"),
        ("Space", "toggle point under cursor"),
        ("Ctrl+V", "paste"),
        ("Esc", "close / clear / quit"),
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (key, desc) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<8}", key), Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)),
            Span::styled(desc.to_string(), Style::default().fg(TEXT_SECONDARY)),
        ]));
    }
    lines.push(Line::from(""));
    for (cmd, desc) in COMMANDS {
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<10}", cmd), Style::default().fg(COPPER).add_modifier(Modifier::BOLD)),
            Span::styled(desc.to_string(), Style::default().fg(TEXT_SECONDARY)),
        ]));
    }

    let popup = centered(area, 48, lines.len() as u16 + 2);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(Span::styled(" Help ", Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(LAVENDER))
        .style(Style::default().bg(BG_PANEL));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn draw_confirm_reset(frame: &mut Frame, area: Rect) {
    let popup = centered(area, 46, 6);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(" Clear all ", Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BURGUNDY))
        .style(Style::default().bg(BG_PANEL));

    let text = vec![
        Line::from(Span::styled(
            "Delete every embedding on the server?",
            Style::default().fg(TEXT_PRIMARY),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD)),
            Span::styled(" delete   ", Style::default().fg(TEXT_MUTED)),
            Span::styled("n", Style::default().fg(OLIVE).add_modifier(Modifier::BOLD)),
            Span::styled(" keep", Style::default().fg(TEXT_MUTED)),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        popup,
    );
}
