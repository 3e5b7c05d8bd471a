pub mod console;
pub mod screen;

use crate::api::types::JobSnapshot;

/// Everything the poll loop needs from whatever is drawing the session.
///
/// The loop never formats output itself; it only decides which of these
/// events to emit and when.
pub trait RenderSink: Send {
    /// A plain informational line.
    fn on_message(&mut self, text: &str);

    /// Ephemeral status that the next progress line may overwrite.
    fn on_progress(&mut self, text: &str);

    /// The snapshot changed in a way worth redrawing.
    fn on_live_update(&mut self, snapshot: &JobSnapshot, poll_count: u32);

    /// The session completed; this is the last snapshot.
    fn on_final(&mut self, snapshot: &JobSnapshot);

    fn on_error(&mut self, message: &str, error: &(dyn std::error::Error + 'static));

    fn clear(&mut self);

    /// Block until the user has acknowledged the result.
    fn wait_for_exit(&mut self);
}
