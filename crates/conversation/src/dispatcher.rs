use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use {
    async_trait::async_trait,
    tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError},
    tracing::{debug, warn},
    tubepost_channels::{InboundHandler, InboundMessage},
};

#[cfg(feature = "metrics")]
use tubepost_metrics::{conversation as conv_metrics, gauge};

use crate::machine::ConversationStateMachine;

/// Receives events the posting flow did not consume.
pub type FallThrough = Arc<dyn Fn(InboundMessage) + Send + Sync>;

type Queues = Mutex<HashMap<String, UnboundedSender<InboundMessage>>>;

/// Per-sender FIFO in front of the state machine.
///
/// The first event for an idle sender spawns a worker task that drains that
/// sender's queue and exits when it is empty. Enqueue and worker exit both
/// happen under the queue map lock, so no event is stranded.
#[derive(Clone)]
pub struct InboundDispatcher {
    machine: Arc<ConversationStateMachine>,
    queues: Arc<Queues>,
    fall_through: Option<FallThrough>,
}

impl InboundDispatcher {
    pub fn new(machine: Arc<ConversationStateMachine>) -> Self {
        Self {
            machine,
            queues: Arc::default(),
            fall_through: None,
        }
    }

    #[must_use]
    pub fn with_fall_through(mut self, fall_through: FallThrough) -> Self {
        self.fall_through = Some(fall_through);
        self
    }

    /// Queue a message behind any earlier ones from the same sender.
    pub fn dispatch(&self, message: InboundMessage) {
        let mut queues = lock_queues(&self.queues);
        let message = match queues.get(&message.sender) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                // Worker gone without deregistering; start a fresh one.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let sender = message.sender.clone();
        // Fresh channel with its receiver in hand, cannot fail.
        let _ = tx.send(message);
        queues.insert(sender.clone(), tx);

        #[cfg(feature = "metrics")]
        gauge!(conv_metrics::ACTIVE_SENDER_QUEUES).set(queues.len() as f64);

        debug!(sender = %sender, "spawning sender worker");
        tokio::spawn(run_worker(
            Arc::clone(&self.machine),
            Arc::clone(&self.queues),
            self.fall_through.clone(),
            sender,
            rx,
        ));
    }

    /// Senders with a live worker.
    pub fn active_senders(&self) -> usize {
        lock_queues(&self.queues).len()
    }
}

#[async_trait]
impl InboundHandler for InboundDispatcher {
    async fn handle(&self, message: InboundMessage) {
        self.dispatch(message);
    }
}

fn lock_queues(queues: &Queues) -> MutexGuard<'_, HashMap<String, UnboundedSender<InboundMessage>>> {
    queues.lock().unwrap_or_else(|poisoned| {
        warn!("dispatcher queue map lock poisoned");
        poisoned.into_inner()
    })
}

async fn run_worker(
    machine: Arc<ConversationStateMachine>,
    queues: Arc<Queues>,
    fall_through: Option<FallThrough>,
    sender: String,
    mut rx: UnboundedReceiver<InboundMessage>,
) {
    loop {
        let message = match rx.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => {
                let mut map = lock_queues(&queues);
                // Re-check under the lock; dispatch() enqueues under it too.
                match rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => {
                        map.remove(&sender);
                        #[cfg(feature = "metrics")]
                        gauge!(conv_metrics::ACTIVE_SENDER_QUEUES).set(map.len() as f64);
                        debug!(sender = %sender, "sender queue drained");
                        return;
                    },
                }
            },
            Err(TryRecvError::Disconnected) => return,
        };

        if !machine.handle(&message).await {
            match &fall_through {
                Some(callback) => callback(message),
                None => debug!(sender = %sender, "message not consumed"),
            }
        }
    }
}
