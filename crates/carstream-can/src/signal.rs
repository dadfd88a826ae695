//! Generation-tagged stop signal for acquisition runs

use tokio::sync::watch;

/// Owner side: flips once to request a stop
#[derive(Debug)]
pub struct StopSignal {
    generation: u64,
    tx: watch::Sender<bool>,
}

/// Run side: polled from blocking loops, awaited from async ones
#[derive(Debug, Clone)]
pub struct StopListener {
    generation: u64,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new(generation: u64) -> (Self, StopListener) {
        let (tx, rx) = watch::channel(false);
        (Self { generation, tx }, StopListener { generation, rx })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl StopListener {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop was requested or the owner went away
    pub async fn stopped(&mut self) {
        // An Err means the sender was dropped, which also ends the run
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
