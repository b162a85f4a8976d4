//! Background handler for kernel events.
//!
//! [`run`] drains the [`KernelEvent`]s the host forwards and applies them to a
//! [`NotebookCommModel`]. Keeping the loop apart from the model lets the
//! routing be tested by pushing events into a channel.

use serde_json::json;
use tokio::sync::mpsc;

use crate::comm_model::NotebookCommModel;
use crate::transport::{KernelEvent, KernelSession};

/// Apply kernel events until the sender side closes.
///
/// # Routing
///
/// - `CommOpened` attaches the channel to the model's link
/// - `CommMessage` goes through [`NotebookCommModel::receive`]; failures are
///   reported with source `receive` and the raw payload
/// - `StatusChanged` ending in `restarting` resets the model and bootstraps again
/// - `CommClosed` detaches the channel
pub async fn run<S: KernelSession>(
    model: &mut NotebookCommModel<S>,
    mut events: mpsc::UnboundedReceiver<KernelEvent>,
) {
    while let Some(event) = events.recv().await {
        handle_event(model, event).await;
    }
    log::debug!("Kernel event channel closed");
}

/// Apply one kernel event.
pub async fn handle_event<S: KernelSession>(model: &mut NotebookCommModel<S>, event: KernelEvent) {
    match event {
        KernelEvent::CommOpened(channel) => model.attach_comm(channel),
        KernelEvent::CommMessage(payload) => {
            if let Err(e) = model.receive(&payload) {
                model.report_error(e, "receive", payload);
            }
        }
        KernelEvent::StatusChanged(status) => {
            if model.handle_status(&status)
                && let Err(e) = model.reconnect().await
                && e.report_id().is_none()
            {
                model.report_error(e, "reconnect", json!([status]));
            }
        }
        KernelEvent::CommClosed => model.detach_comm(),
    }
}
