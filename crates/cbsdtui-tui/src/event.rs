//! Terminal event handling

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal events
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick
    Tick,
    /// Key press
    Key(KeyEvent),
    /// Mouse event
    Mouse(MouseEvent),
    /// Terminal resize
    Resize(u16, u16),
}

/// Reads terminal events on a background task
///
/// While paused the task leaves stdin alone so the login console can read
/// it directly.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
    paused: Arc<AtomicBool>,
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler with the given tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx_clone = tx.clone();
        let paused = Arc::new(AtomicBool::new(false));
        let paused_flag = Arc::clone(&paused);

        tokio::spawn(async move {
            loop {
                if paused_flag.load(Ordering::SeqCst) {
                    tokio::time::sleep(tick_rate).await;
                    continue;
                }
                let event = match event::poll(tick_rate) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => Some(Event::Resize(w, h)),
                        _ => None,
                    },
                    _ => Some(Event::Tick),
                };
                if let Some(event) = event {
                    if tx_clone.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            _tx: tx,
            paused,
            tick_rate,
        }
    }

    /// Receive the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Stop reading the terminal and drop anything already queued
    pub async fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
        // Let a poll that is already in flight run out
        tokio::time::sleep(self.tick_rate).await;
        while self.rx.try_recv().is_ok() {}
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}
