//! Scripted transport for driving a session in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use master_core::TransportError;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::transport::{Connector, InboundFrame, Link};

type Delivery = Result<InboundFrame, TransportError>;

/// What the next connect attempt does.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Plan {
    Accept,
    Refuse,
    Hang,
}

#[derive(Default)]
struct Shared {
    plan: VecDeque<Plan>,
    attempts: Vec<Instant>,
    links: Vec<Arc<AtomicBool>>,
    overlapping_connects: usize,
}

/// Connector whose attempts follow a plan (accepting once the plan runs out).
#[derive(Clone)]
pub(crate) struct MockConnector {
    shared: Arc<Mutex<Shared>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            peers,
        };
        (connector, rx)
    }

    pub(crate) fn with_plan(plan: &[Plan]) -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (connector, rx) = Self::new();
        connector.shared.lock().plan.extend(plan.iter().copied());
        (connector, rx)
    }

    /// When each connect attempt started.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.shared.lock().attempts.clone()
    }

    /// Connect attempts made while an earlier link was still open.
    pub(crate) fn overlapping_connects(&self) -> usize {
        self.shared.lock().overlapping_connects
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Link>, TransportError> {
        let plan = {
            let mut shared = self.shared.lock();
            shared.attempts.push(Instant::now());
            if shared.links.iter().any(|closed| !closed.load(Ordering::SeqCst)) {
                shared.overlapping_connects += 1;
            }
            shared.plan.pop_front().unwrap_or(Plan::Accept)
        };

        match plan {
            Plan::Refuse => Err(TransportError::Connect {
                endpoint: endpoint.to_owned(),
                reason: "connection refused".into(),
            }),
            Plan::Hang => std::future::pending().await,
            Plan::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let closed = Arc::new(AtomicBool::new(false));
                let sent = Arc::new(Mutex::new(Vec::new()));
                let fail_sends = Arc::new(AtomicBool::new(false));
                self.shared.lock().links.push(closed.clone());

                let _ = self.peers.send(MockPeer {
                    tx,
                    sent: sent.clone(),
                    closed: closed.clone(),
                    fail_sends: fail_sends.clone(),
                });
                Ok(Box::new(MockLink {
                    rx,
                    sent,
                    closed,
                    fail_sends,
                }))
            }
        }
    }
}

struct MockLink {
    rx: mpsc::UnboundedReceiver<Delivery>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

#[async_trait]
impl Link for MockLink {
    async fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Send("broken pipe".into()));
        }
        self.sent.lock().push(frame.to_owned());
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// The core's end of one accepted link. Dropping it closes the link.
pub(crate) struct MockPeer {
    tx: mpsc::UnboundedSender<Delivery>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl MockPeer {
    pub(crate) fn send(&self, text: &str) {
        let _ = self.tx.send(Ok(InboundFrame::Text(text.to_owned())));
    }

    pub(crate) fn send_binary(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(InboundFrame::Binary(bytes.to_vec())));
    }

    pub(crate) fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }

    pub(crate) fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Frames the client wrote, shared with the link.
    pub(crate) fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Whether the client closed its side.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
