// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide shutdown signal.

use tokio::sync::watch;

/// Trigger side. Cloneable; any clone may request shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Listener side, one per task
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&mut self) {
        // An error means every trigger was dropped, which also ends the run
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        assert!(!listener.is_triggered());

        let waiter = tokio::spawn(async move {
            listener.wait().await;
            listener.is_triggered()
        });
        shutdown.trigger();
        assert!(waiter.await.unwrap());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut listener = shutdown.subscribe();
        listener.wait().await;
        assert!(listener.is_triggered());
    }
}
