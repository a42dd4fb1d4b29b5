use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use trading_assistant_core::{Entry, Sender};

use crate::app::App;

const INPUT_PLACEHOLDER: &str = "Reply …";

/// Render `**bold**` runs in an answer line; anything unbalanced stays literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if close == 0 {
            // "****" is not emphasis
            spans.push(Span::raw(rest[..open + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }

        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            after_open[..close].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let error = app.conversation.view().error.to_string();
    let error_height = if error.is_empty() { 0 } else { 1 };

    // Main layout: header, chat, error banner, composer, footer
    let [header_area, chat_area, error_area, composer_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if !error.is_empty() {
        render_error(&error, frame, error_area);
    }
    render_composer(app, frame, composer_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" S ", Style::default().bg(Color::Cyan).fg(Color::Black).bold()),
        Span::styled(" Smart Trading Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let subtitle = Line::from(vec![
        Span::styled("     Live AI chat for real-time market Q&A", Style::default().fg(Color::Gray)),
        Span::styled(format!("  {}", app.endpoint), Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(Text::from(vec![title, subtitle]))
        .style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

/// Build the chat transcript. Each entry kind gets its own treatment.
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let view = app.conversation.view();
    let time_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in &view.entries {
        match entry {
            Entry::Message(msg) => match msg.sender {
                Sender::User => {
                    lines.push(
                        Line::from(vec![
                            Span::styled(format!("{} ", msg.timestamp), time_style),
                            Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                        ])
                        .alignment(Alignment::Right),
                    );
                    lines.push(Line::from(msg.text.clone()).alignment(Alignment::Right));
                }
                Sender::Assistant => {
                    lines.push(Line::from(vec![
                        Span::styled("Assistant", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                        Span::styled(format!(" {}", msg.timestamp), time_style),
                    ]));
                    for line in msg.text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            },
            Entry::Pending { .. } => {
                lines.push(Line::from(Span::styled(
                    "Assistant",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                // Animated dots: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Typing{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }

    lines
}

/// Rows `paragraph` occupies when word-wrapped at `width` columns
fn wrapped_height(paragraph: &Paragraph, width: u16) -> u16 {
    paragraph.line_count(width).min(u16::MAX as usize) as u16
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat = Paragraph::new(Text::from(chat_lines(app))).wrap(Wrap { trim: true });
    // Measured before the block is attached so borders are not counted
    let total_lines = wrapped_height(&chat, area.width.saturating_sub(2));
    app.update_chat_metrics(area, total_lines);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_error(error: &str, frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(format!(" {} ", error))
        .style(Style::default().bg(Color::Red).fg(Color::White).add_modifier(Modifier::BOLD));
    frame.render_widget(banner, area);
}

fn render_composer(app: &App, frame: &mut Frame, area: Rect) {
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(area);

    let view = app.conversation.view();
    let input = app.conversation.input();

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Ask ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = input.cursor();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input_widget = if input.as_str().is_empty() {
        Paragraph::new(Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        let visible_text: String = input
            .as_str()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input_widget.block(input_block), input_area);

    let send_style = if view.submit_disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let send = Paragraph::new(Span::styled("➤", send_style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(send_style));
    frame.render_widget(send, send_area);

    if area.height > 2 && inner_width > 0 {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.conversation.is_pending() {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" page ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
