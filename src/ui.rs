use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::App;
use crate::message::{Message, MessageKind, Role};
use crate::notify::{NotifyLevel, Toast};

/// Style `**bold**` runs. An opening `**` with no partner stays literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let inner = &rest[open + 2..];
        let Some(close) = inner.find("**").filter(|&close| close > 0) else {
            break;
        };

        plain.push_str(&rest[..open]);
        if !plain.is_empty() {
            spans.push(Span::raw(std::mem::take(&mut plain)));
        }
        spans.push(Span::styled(inner[..close].to_string(), bold));
        rest = &inner[close + 2..];
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
    render_toasts(&app.toasts.visible(), frame, chat_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let count = app.messages().len();
    let title = Line::from(vec![
        Span::styled(" relay ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("→ {} ", app.endpoint), Style::default().fg(Color::White)),
        Span::styled(
            format!("[{} message{}]", count, if count == 1 { "" } else { "s" }),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_header(msg: &Message, selected: bool) -> Line<'static> {
    let (label, color) = match msg.role() {
        Role::User => ("You", Color::Cyan),
        Role::Assistant => ("AI", Color::Yellow),
    };
    let time = msg.timestamp().with_timezone(&Local).format("%H:%M").to_string();

    let mut label_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if selected {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }

    let mut spans = vec![
        Span::styled(label, label_style),
        Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
    ];
    if selected {
        spans.push(Span::styled("  Ctrl+Y copy", Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

fn message_lines(msg: &Message) -> Vec<Line<'static>> {
    match msg.kind() {
        MessageKind::Normal if msg.role() == Role::Assistant => {
            msg.content().lines().map(parse_markdown_line).collect()
        }
        MessageKind::Normal => msg
            .content()
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect(),
        kind => {
            let color = if kind == MessageKind::Error { Color::Red } else { Color::DarkGray };
            let glyph = kind.glyph().unwrap_or_default();
            vec![Line::from(Span::styled(
                format!("{} {}", glyph, msg.content()),
                Style::default().fg(color).add_modifier(Modifier::ITALIC),
            ))]
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // App scroll math works on the bordered interior
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.is_loading() { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    let chat_text = if app.messages().is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Type a message and press Enter to start the conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for (i, msg) in app.messages().iter().enumerate() {
            lines.push(message_header(msg, app.selected == Some(i)));
            lines.extend(message_lines(msg));
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                "AI",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    // Prompts are stored verbatim, so leading whitespace is kept on screen too
    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: false });
    let wrapped = chat.line_count(app.chat_width);
    app.set_content_lines(u16::try_from(wrapped).unwrap_or(u16::MAX));

    let chat = chat.block(block).scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.is_loading();

    let (title, border_color, text_color) = if loading {
        (" Waiting for response (Esc to stop) ", Color::DarkGray, Color::DarkGray)
    } else {
        (" Message (Enter to send) ", Color::Yellow, Color::Cyan)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    // Slide the window so the cursor cell is always inside it
    let scroll_offset = if inner_width == 0 {
        0
    } else {
        (cursor_pos + 1).saturating_sub(inner_width)
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(block);

    frame.render_widget(input, area);

    // Cursor only while the input accepts text
    if !loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.is_loading() {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut hints = if app.is_loading() {
        vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" stop ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Ctrl+L ", key_style),
            Span::styled(" clear ", label_style),
        ]
    };
    hints.extend(vec![
        Span::styled(" Alt+↑/↓ ", key_style),
        Span::styled(" select ", label_style),
        Span::styled(" Ctrl+Y ", key_style),
        Span::styled(" copy ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Ctrl+C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Stack toasts in the top-right corner of `area`, newest at the bottom
fn render_toasts(toasts: &[Toast], frame: &mut Frame, area: Rect) {
    let width = 44.min(area.width.saturating_sub(2));
    let mut y = area.y + 1;

    for toast in toasts {
        let color = match toast.level {
            NotifyLevel::Info => Color::Blue,
            NotifyLevel::Success => Color::Green,
            NotifyLevel::Error => Color::Red,
        };

        let mut lines = vec![Line::from(Span::styled(
            toast.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))];
        if let Some(description) = &toast.description {
            lines.push(Line::from(Span::styled(
                description.clone(),
                Style::default().fg(Color::Gray),
            )));
        }

        let height = lines.len() as u16 + 2;
        if y + height > area.y + area.height {
            break;
        }

        let x = area.x + area.width.saturating_sub(width + 1);
        let toast_area = Rect::new(x, y, width, height);

        // Clear the area behind the toast
        frame.render_widget(Clear, toast_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));
        let widget = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(widget, toast_area);

        y += height;
    }
}
