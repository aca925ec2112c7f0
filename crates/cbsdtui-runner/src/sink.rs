//! Live output sink
//!
//! Background producers (pipe scanners, log tailers) never touch the view.
//! They push [`SinkUpdate`]s through an [`OutputSink`]; the task that owns the
//! UI applies them to an [`OutputBuffer`] and redraws.

use tokio::sync::mpsc;

/// A change marshaled from a producer to the buffer owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkUpdate {
    /// Text to append; the buffer adds the trailing newline
    Append(String),
    /// The command behind this sink has completed
    Finished,
}

/// Producer side of the sink
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<SinkUpdate>,
}

impl OutputSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `delta` for appending. A closed receiver is not an error.
    pub fn append(&self, delta: impl Into<String>) {
        let _ = self.tx.send(SinkUpdate::Append(delta.into()));
    }

    pub fn finish(&self) {
        let _ = self.tx.send(SinkUpdate::Finished);
    }

    /// True once the buffer owner has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Append-only text buffer backing the output view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    text: String,
    /// Byte offset of the cursor; always the end of `text` after an append
    cursor: usize,
    finished: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// New content is old content + `delta` + `'\n'`
    pub fn append(&mut self, delta: &str) {
        self.text.push_str(delta);
        self.text.push('\n');
        self.cursor = self.text.len();
    }

    pub fn apply(&mut self, update: SinkUpdate) {
        match update {
            SinkUpdate::Append(delta) => self.append(&delta),
            SinkUpdate::Finished => self.finished = true,
        }
    }

    /// Apply everything currently queued without waiting
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<SinkUpdate>) -> usize {
        let mut applied = 0;
        while let Ok(update) = rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_and_cursor_at_end() {
        let mut buf = OutputBuffer::new();
        buf.append("Starting jail...");

        for line in ["a", "b", "c"] {
            buf.append(line);
            assert_eq!(buf.cursor(), buf.text().len());
        }

        assert!(buf.text().ends_with("a\nb\nc\n"));
        assert_eq!(buf.line_count(), 4);
    }

    #[test]
    fn test_updates_marshaled_through_channel() {
        let (sink, mut rx) = OutputSink::channel();
        let producer = sink.clone();
        producer.append("a");
        producer.append("b");
        sink.append("c");
        sink.finish();

        let mut buf = OutputBuffer::new();
        assert_eq!(buf.drain(&mut rx), 4);
        assert_eq!(buf.text(), "a\nb\nc\n");
        assert!(buf.is_finished());
    }

    #[test]
    fn test_append_after_receiver_dropped_is_silent() {
        let (sink, rx) = OutputSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        sink.append("lost");
        sink.finish();
    }

    #[test]
    fn test_clear_resets() {
        let mut buf = OutputBuffer::new();
        buf.append("x");
        buf.apply(SinkUpdate::Finished);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.cursor(), 0);
        assert!(!buf.is_finished());
    }
}
