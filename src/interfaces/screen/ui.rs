use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use super::Screen;
use crate::api::types::JobStatus;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn header(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ))
}

fn item(text: String) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(text, Style::default().fg(Color::Gray)),
    ])
}

fn waiting() -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled("⏳ Waiting for data...", Style::default().fg(Color::DarkGray)),
    ])
}

fn status_span(status: JobStatus) -> Span<'static> {
    let color = match status {
        JobStatus::Complete => Color::Green,
        JobStatus::Failed => Color::Red,
        JobStatus::Stuck | JobStatus::InProgress => Color::Yellow,
    };
    Span::styled(
        status.label().to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

impl Screen {
    pub(super) fn advance_spinner(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn title_line(&self) -> Line<'static> {
        let text = if self.complete {
            "✅ RCA ANALYSIS COMPLETED".to_string()
        } else if self.finished {
            "■ RCA MONITORING STOPPED".to_string()
        } else {
            format!(
                "{} RCA ANALYSIS IN PROGRESS",
                SPINNER[self.tick % SPINNER.len()]
            )
        };
        Line::from(Span::styled(
            format!(" {} ", text),
            Style::default()
                .fg(Color::Cyan)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ))
    }

    fn meta_lines(&self) -> Vec<Line<'static>> {
        let label = Style::default().fg(Color::DarkGray);
        let value = Style::default().fg(Color::White);
        vec![
            Line::from(vec![
                Span::styled("Session ID: ", label),
                Span::styled(self.snapshot.session_id.clone(), value),
            ]),
            Line::from(vec![
                Span::styled("Status: ", label),
                status_span(self.snapshot.status()),
            ]),
            Line::from(vec![
                Span::styled("Poll Count: ", label),
                Span::styled(self.poll_count.to_string(), value),
                Span::styled(" | Last Update: ", label),
                Span::styled(self.last_update.format("%H:%M:%S").to_string(), value),
            ]),
        ]
    }

    pub(super) fn body_lines(&self) -> Vec<Line<'static>> {
        let snapshot = &self.snapshot;
        let mut lines = Vec::new();

        if let Some(err) = &self.error {
            lines.push(Line::from(Span::styled(
                format!("❌ Error: {}", err),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
        }

        if !snapshot.problem_summary.is_empty() {
            lines.push(header("📋 Problem"));
            lines.push(item(snapshot.problem_summary.clone()));
        }
        if !snapshot.recommendation.is_empty() {
            lines.push(header("💡 Recommendation"));
            lines.push(item(snapshot.recommendation.clone()));
        }

        lines.push(header("📝 What Happened"));
        if snapshot.timeline.is_empty() {
            lines.push(waiting());
        }
        for (i, event) in snapshot.timeline.iter().enumerate() {
            lines.push(item(format!("{}. {}", i + 1, event)));
        }

        lines.push(header("🔍 Evidence"));
        if snapshot.evidence.is_empty() {
            lines.push(waiting());
        }
        for (i, evidence) in snapshot.evidence.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    format!("{}. {}", i + 1, evidence.query),
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            if !evidence.snippet.is_empty() {
                lines.push(Line::from(vec![
                    Span::raw("     → "),
                    Span::styled(
                        evidence.snippet.clone(),
                        Style::default()
                            .fg(Color::Gray)
                            .add_modifier(Modifier::ITALIC),
                    ),
                ]));
            }
        }

        if !self.complete {
            lines.push(header("📊 Operations"));
            if snapshot.operations_log.is_empty() {
                lines.push(waiting());
            }
            for (i, op) in snapshot.operations_log.iter().enumerate() {
                lines.push(item(format!("{}. {}", i + 1, op)));
            }
        } else {
            let extra = snapshot.extra_fields();
            if !extra.is_empty() {
                lines.push(header("🔧 Additional Fields"));
                for (key, value) in extra {
                    lines.push(item(format!("• {}: {}", key, value)));
                }
            }
        }

        lines
    }

    /// Moves the body view, clamped so at least one line stays visible.
    pub(super) fn scroll_by(&mut self, delta: i32) {
        let max = self.body_lines().len().saturating_sub(1).min(u16::MAX as usize) as i32;
        self.scroll = (i32::from(self.scroll) + delta).clamp(0, max) as u16;
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = self
            .notices
            .iter()
            .map(|n| Line::from(Span::styled(n.clone(), Style::default().fg(Color::Blue))))
            .collect();
        if !self.progress.is_empty() {
            lines.push(Line::from(Span::styled(
                self.progress.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }
        let hint = if self.finished {
            "↑/↓ scroll | Press Enter or q to exit"
        } else {
            "↑/↓ scroll | Press q or Ctrl+C to stop monitoring"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )));
        lines
    }

    pub(super) fn draw(&self, f: &mut Frame) {
        let footer = self.footer_lines();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(5),
                Constraint::Min(3),
                Constraint::Length(footer.len() as u16),
            ])
            .split(f.area());

        f.render_widget(Paragraph::new(self.title_line()), chunks[0]);

        let meta = Paragraph::new(self.meta_lines()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Blue)),
        );
        f.render_widget(meta, chunks[1]);

        let body = Paragraph::new(self.body_lines())
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        f.render_widget(body, chunks[2]);

        f.render_widget(Paragraph::new(footer), chunks[3]);
    }
}
