//! Confirmation over an async channel to a UI task

use super::{ConfirmRequest, ConfirmationFlow, Decision};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// A request waiting on the UI, with the handle to answer it
#[derive(Debug)]
pub struct PendingConfirmation {
    pub request: ConfirmRequest,
    responder: oneshot::Sender<Decision>,
}

impl PendingConfirmation {
    pub fn respond(self, decision: Decision) {
        // The requester may have given up; nothing to do then
        let _ = self.responder.send(decision);
    }

    pub fn approve(self) {
        self.respond(Decision::Approved);
    }

    pub fn reject(self, reason: impl Into<String>) {
        self.respond(Decision::rejected(reason));
    }
}

/// Hands each confirmation to whoever holds the receiving end
#[derive(Debug, Clone)]
pub struct ChannelConfirmation {
    sender: mpsc::Sender<PendingConfirmation>,
}

impl ChannelConfirmation {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingConfirmation>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ConfirmationFlow for ChannelConfirmation {
    async fn confirm(&self, request: ConfirmRequest) -> Decision {
        let request_id = request.id;
        let (responder, response) = oneshot::channel();

        if self
            .sender
            .send(PendingConfirmation { request, responder })
            .await
            .is_err()
        {
            warn!(%request_id, "No confirmation handler is listening");
            return Decision::rejected("no confirmation handler is listening");
        }

        match response.await {
            Ok(decision) => {
                info!(%request_id, approved = decision.is_approved(), "Confirmation resolved");
                decision
            }
            Err(_) => {
                warn!(%request_id, "Confirmation dismissed without a decision");
                Decision::rejected("confirmation dismissed without a decision")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::{ConfirmationKind, ConfirmationSummary};
    use crate::types::CallerIdentity;

    fn request() -> ConfirmRequest {
        ConfirmRequest::new(
            CallerIdentity::new("swap", "1.0.0"),
            ConfirmationKind::SignMessage,
            1,
            ConfirmationSummary::new("Sign message").field("message", "hello"),
        )
    }

    #[tokio::test]
    async fn ui_decision_is_returned() {
        let (flow, mut ui) = ChannelConfirmation::new(4);
        tokio::spawn(async move {
            while let Some(pending) = ui.recv().await {
                if pending.request.summary.get("message") == Some("hello") {
                    pending.approve();
                } else {
                    pending.reject("unexpected");
                }
            }
        });

        assert_eq!(flow.confirm(request()).await, Decision::Approved);
    }

    #[tokio::test]
    async fn dropped_responder_rejects() {
        let (flow, mut ui) = ChannelConfirmation::new(4);
        tokio::spawn(async move {
            let pending = ui.recv().await.unwrap();
            drop(pending);
        });

        assert!(!flow.confirm(request()).await.is_approved());
    }

    #[tokio::test]
    async fn closed_channel_rejects() {
        let (flow, ui) = ChannelConfirmation::new(4);
        drop(ui);

        assert_eq!(
            flow.confirm(request()).await,
            Decision::rejected("no confirmation handler is listening")
        );
    }
}
