//! Move link: the handle through which moves cross an established session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, instrument, warn};

use crate::game::{Move, MoveExchange};
use crate::net::connection::SessionError;

/// Cloneable handle onto a session's outbound and inbound move queues.
///
/// All clones share one liveness flag. The session clears it on `close()`
/// and the reader/writer tasks clear it on any transport error, after which
/// every clone refuses to send. Moves that arrived before a transport error
/// can still be received; `close()` discards them.
#[derive(Debug, Clone)]
pub struct MoveLink {
    outbound: mpsc::UnboundedSender<Move>,
    inbound: Arc<Mutex<mpsc::UnboundedReceiver<Move>>>,
    alive: Arc<AtomicBool>,
}

impl MoveLink {
    pub(crate) fn new(
        outbound: mpsc::UnboundedSender<Move>,
        inbound: mpsc::UnboundedReceiver<Move>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            outbound,
            inbound: Arc::new(Mutex::new(inbound)),
            alive,
        }
    }

    /// Whether the link is still usable.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the link as down for every clone.
    pub(crate) fn mark_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Marks the link down and discards anything still queued inbound.
    pub(crate) fn shut(&self) {
        self.mark_down();
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        inbound.close();
        let mut discarded = 0usize;
        while inbound.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Dropped unread moves on close");
        }
    }

    /// Number of received moves not yet taken.
    pub fn buffered(&self) -> usize {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queues a move for the writer task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the link is down.
    #[instrument(skip(self))]
    pub fn send(&self, mv: Move) -> Result<(), SessionError> {
        if !self.is_alive() {
            return Err(SessionError::NotConnected);
        }
        self.outbound.send(mv).map_err(|_| {
            warn!("Writer task is gone");
            self.mark_down();
            SessionError::NotConnected
        })?;
        debug!(mv = %mv, "Move queued for peer");
        Ok(())
    }

    /// Returns the next move from the peer without waiting.
    ///
    /// Moves already received are handed out even after the link went down.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] once the link is down and
    /// nothing is left to read.
    pub fn try_recv(&self) -> Result<Option<Move>, SessionError> {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        match inbound.try_recv() {
            Ok(mv) => {
                debug!(mv = %mv, "Move received from peer");
                Ok(Some(mv))
            }
            Err(TryRecvError::Empty) if self.is_alive() => Ok(None),
            Err(TryRecvError::Empty) => Err(SessionError::NotConnected),
            Err(TryRecvError::Disconnected) => {
                warn!("Reader task is gone");
                self.mark_down();
                Err(SessionError::NotConnected)
            }
        }
    }
}

impl MoveExchange for MoveLink {
    fn send_move(&mut self, mv: Move) -> bool {
        self.send(mv).is_ok()
    }

    fn receive_move(&mut self) -> Option<Move> {
        self.try_recv().ok().flatten()
    }

    fn is_connected(&self) -> bool {
        self.is_alive()
    }
}
