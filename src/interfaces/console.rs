use std::future::Future;
use std::io::{BufRead, Write};

use console::style;
use tokio::sync::oneshot;

use super::RenderSink;
use crate::api::types::{JobSnapshot, JobStatus};
use crate::core::terminal::{BULB, CHART, CLIPBOARD, CLOCK, ID, LOOKING_GLASS, MEMO, WRENCH};

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Sequential, line-oriented output for plain terminals.
pub struct ConsoleSink<W: Write + Send, R: BufRead + Send> {
    out: W,
    /// `None` while a reader thread holds it, and for good after an interrupt.
    input: Option<R>,
}

/// How the "Press Enter to exit" prompt was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAck {
    Acknowledged,
    Interrupted,
}

impl ConsoleSink<std::io::Stdout, std::io::BufReader<std::io::Stdin>> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::BufReader::new(std::io::stdin()))
    }
}

impl<W: Write + Send, R: BufRead + Send> ConsoleSink<W, R> {
    pub fn new(out: W, input: R) -> Self {
        Self {
            out,
            input: Some(input),
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> &W {
        &self.out
    }

    fn exit_prompt(&mut self) {
        self.emit(&format!("\n{}Press Enter to exit...\n", CLIPBOARD));
    }

    fn emit(&mut self, text: &str) {
        // Terminal output is best effort; a closed stdout must not abort monitoring.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write + Send, R: BufRead + Send + 'static> ConsoleSink<W, R> {
    /// Like [`RenderSink::wait_for_exit`], but gives up as soon as `interrupt`
    /// resolves. The line is read on a detached thread because a blocking
    /// read cannot be cancelled and must not hold up process exit.
    pub async fn wait_for_exit_or<F>(&mut self, interrupt: F) -> ExitAck
    where
        F: Future<Output = ()>,
    {
        self.exit_prompt();
        let Some(mut input) = self.input.take() else {
            return ExitAck::Acknowledged;
        };

        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = input.read_line(&mut line);
            let _ = tx.send(input);
        });

        tokio::select! {
            returned = rx => {
                self.input = returned.ok();
                ExitAck::Acknowledged
            }
            _ = interrupt => ExitAck::Interrupted,
        }
    }
}

fn status_text(status: JobStatus) -> String {
    match status {
        JobStatus::Complete => style(status.label()).green().bold().to_string(),
        JobStatus::Failed => style(status.label()).red().bold().to_string(),
        JobStatus::Stuck => style(status.label()).yellow().to_string(),
        JobStatus::InProgress => style(status.label()).yellow().to_string(),
    }
}

fn numbered(out: &mut String, items: &[String], empty: &str) {
    if items.is_empty() {
        out.push_str(&format!("  {}\n", style(empty).dim()));
        return;
    }
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, item));
    }
}

fn summary(out: &mut String, snapshot: &JobSnapshot) {
    if !snapshot.problem_summary.is_empty() {
        out.push_str(&format!(
            "{}{} {}\n",
            CLIPBOARD,
            style("Problem:").bold(),
            snapshot.problem_summary
        ));
    }
    if !snapshot.recommendation.is_empty() {
        out.push_str(&format!(
            "{}{} {}\n",
            BULB,
            style("Recommendation:").bold(),
            snapshot.recommendation
        ));
    }
}

fn evidence(out: &mut String, snapshot: &JobSnapshot, empty: &str) {
    if snapshot.evidence.is_empty() {
        out.push_str(&format!("  {}\n", style(empty).dim()));
        return;
    }
    for (i, item) in snapshot.evidence.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, style(&item.query).cyan()));
        if !item.snippet.is_empty() {
            out.push_str(&format!("     → {}\n", style(&item.snippet).italic()));
        }
    }
}

pub fn render_live(snapshot: &JobSnapshot, poll_count: u32, now: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}{}\n",
        LOOKING_GLASS,
        style("RCA ANALYSIS IN PROGRESS").bold()
    ));
    out.push_str("====================\n");
    out.push_str(&format!(
        "{}Poll Count: {} | Last Update: {}\n",
        CHART, poll_count, now
    ));
    out.push_str(&format!("{}Session ID: {}\n", ID, snapshot.session_id));
    out.push_str(&format!("Status: {}\n\n", status_text(snapshot.status())));

    summary(&mut out, snapshot);

    out.push_str(&format!("\n{}What Happened:\n", MEMO));
    numbered(&mut out, &snapshot.timeline, "⏳ Waiting for data...");
    out.push_str(&format!("\n{}Evidence:\n", LOOKING_GLASS));
    evidence(&mut out, snapshot, "⏳ Waiting for data...");
    out.push_str(&format!("\n{}Operations:\n", CHART));
    numbered(&mut out, &snapshot.operations_log, "⏳ Waiting for data...");

    out.push_str("\n====================\n");
    out.push_str("Press Ctrl+C to stop monitoring\n");
    out
}

pub fn render_final(snapshot: &JobSnapshot, now: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        style("✅ RCA ANALYSIS COMPLETED!").green().bold()
    ));
    out.push_str("==========================\n");
    out.push_str(&format!("{}Session ID: {}\n", ID, snapshot.session_id));
    out.push_str(&format!("{}Completed at: {}\n\n", CLOCK, now));

    summary(&mut out, snapshot);

    out.push_str(&format!("\n{}What Happened:\n", MEMO));
    numbered(&mut out, &snapshot.timeline, "• No what happened data available");
    out.push_str(&format!("\n{}Evidence:\n", LOOKING_GLASS));
    evidence(&mut out, snapshot, "• No evidence queries found");
    out.push_str(&format!("\n{}Operations Performed:\n", CHART));
    numbered(
        &mut out,
        &snapshot.operations_log,
        "• No operations data available",
    );

    let extra = snapshot.extra_fields();
    if !extra.is_empty() {
        out.push_str(&format!("\n{}Additional Fields:\n", WRENCH));
        for (key, value) in extra {
            out.push_str(&format!("  • {}: {}\n", key, value));
        }
    }

    out.push_str("\n==========================\n");
    out
}

impl<W: Write + Send, R: BufRead + Send> RenderSink for ConsoleSink<W, R> {
    fn on_message(&mut self, text: &str) {
        self.emit(&format!("{}\n", text));
    }

    fn on_progress(&mut self, text: &str) {
        self.emit(&format!("{}{}", CLEAR_LINE, text));
    }

    fn on_live_update(&mut self, snapshot: &JobSnapshot, poll_count: u32) {
        let now = chrono::Local::now().format("%H:%M:%S").to_string();
        self.emit(&render_live(snapshot, poll_count, &now));
    }

    fn on_final(&mut self, snapshot: &JobSnapshot) {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.emit(&render_final(snapshot, &now));
    }

    fn on_error(&mut self, message: &str, error: &(dyn std::error::Error + 'static)) {
        let line = format!("❌ {}: {}", message, error);
        self.emit(&format!("\n{}\n", style(line).red().bold()));
    }

    fn clear(&mut self) {
        self.emit(CLEAR_SCREEN);
    }

    fn wait_for_exit(&mut self) {
        self.exit_prompt();
        if let Some(input) = self.input.as_mut() {
            let mut line = String::new();
            let _ = input.read_line(&mut line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Evidence;
    use std::io::Cursor;

    fn sample() -> JobSnapshot {
        JobSnapshot {
            session_id: "sess-9".to_string(),
            problem_summary: "Pod OOMKilled".to_string(),
            recommendation: "Raise the memory limit".to_string(),
            timeline: vec!["Deploy rolled out".to_string(), "Pod restarted".to_string()],
            evidence: vec![Evidence {
                query: "kubectl describe pod api".to_string(),
                snippet: "Reason: OOMKilled".to_string(),
            }],
            ..JobSnapshot::default()
        }
    }

    fn sink() -> ConsoleSink<Vec<u8>, Cursor<Vec<u8>>> {
        ConsoleSink::new(Vec::new(), Cursor::new(b"\n".to_vec()))
    }

    fn output(sink: &ConsoleSink<Vec<u8>, Cursor<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&sink.out).to_string()
    }

    #[test]
    fn live_view_lists_sections_and_placeholders() {
        let text = render_live(&sample(), 4, "10:11:12");
        assert!(text.contains("Poll Count: 4 | Last Update: 10:11:12"));
        assert!(text.contains("Session ID: sess-9"));
        assert!(text.contains("Pod OOMKilled"));
        assert!(text.contains("2. Pod restarted"));
        assert!(text.contains("Reason: OOMKilled"));
        // No operations yet.
        assert!(text.contains("Waiting for data..."));
    }

    #[test]
    fn final_view_lists_additional_fields() {
        let mut snapshot = sample();
        snapshot.is_complete = true;
        snapshot
            .extra
            .insert("confidence".to_string(), serde_json::json!("high"));

        let text = render_final(&snapshot, "2026-01-02 03:04:05");

        assert!(text.contains("Completed at: 2026-01-02 03:04:05"));
        assert!(text.contains("• confidence: high"));
        assert!(text.contains("No operations data available"));
    }

    #[test]
    fn final_view_omits_additional_fields_when_none() {
        let text = render_final(&sample(), "now");
        assert!(!text.contains("Additional Fields"));
    }

    #[test]
    fn progress_overwrites_the_current_line() {
        let mut sink = sink();
        sink.on_progress("⏳ In Progress...");
        assert_eq!(output(&sink), "\r\x1b[2K⏳ In Progress...");
    }

    #[test]
    fn wait_for_exit_consumes_one_line() {
        let mut sink = sink();
        sink.wait_for_exit();
        assert!(output(&sink).contains("Press Enter to exit"));
        assert_eq!(sink.input.as_ref().unwrap().position(), 1);
    }

    /// Never yields a byte until the sender side is dropped.
    struct SilentTerminal(std::sync::mpsc::Receiver<Vec<u8>>);

    impl std::io::Read for SilentTerminal {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[tokio::test]
    async fn enter_acknowledges_the_exit_prompt() {
        let mut sink = sink();
        let ack = sink.wait_for_exit_or(std::future::pending()).await;

        assert_eq!(ack, ExitAck::Acknowledged);
        assert!(output(&sink).contains("Press Enter to exit"));
        assert_eq!(sink.input.as_ref().unwrap().position(), 1);
    }

    #[tokio::test]
    async fn interrupt_ends_the_exit_prompt_without_input() {
        let (_keys, rx) = std::sync::mpsc::channel();
        let mut sink = ConsoleSink::new(Vec::new(), std::io::BufReader::new(SilentTerminal(rx)));

        let ack = sink.wait_for_exit_or(async {}).await;

        assert_eq!(ack, ExitAck::Interrupted);
        assert!(String::from_utf8_lossy(&sink.out).contains("Press Enter to exit"));
        assert!(sink.input.is_none());
    }
}
