//! Notifications pushed to the renderer.

use serde_json::Value;

use crate::reporter::ErrorReport;
use crate::status::KernelStatus;

/// A state change the renderer should pick up.
///
/// Events only name what changed; the renderer reads the new state from the
/// model. Config variables are observed separately through `watch` receivers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// History or message contents of an instance changed.
    MessagesChanged { instance: String },
    /// Auto-complete suggestions of an instance changed.
    AutoCompleteChanged { instance: String },
    /// Instances were added or removed.
    InstancesChanged,
    /// The loader registry was replaced.
    LoadersChanged,
    /// The "replying to" pointer moved.
    ReplyingChanged,
    /// A message was staged in the wizard preview, or the preview was cleared.
    WizardPreviewChanged,
    /// A new error report was recorded.
    ErrorReported(ErrorReport),
    /// Whether the model finished bootstrapping the current kernel.
    ConnectionReady(bool),
    KernelStatusChanged(KernelStatus),
    /// Snapshot returned by the kernel for a save request.
    InstancesSnapshot(Value),
}
