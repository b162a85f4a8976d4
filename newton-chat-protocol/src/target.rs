//! Routing targets.
//!
//! A message's `(display, kernelProcess, kernelDisplay)` triple is never set
//! field by field: it always comes from one of the four named
//! [`MessageTarget`]s, and any triple maps back to exactly one of them.

use serde::{Deserialize, Serialize};

use crate::message::{KernelProcess, MessageDisplay};

/// The visibility/processing triple carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDefinition {
    pub display: MessageDisplay,
    pub kernel_process: KernelProcess,
    pub kernel_display: MessageDisplay,
}

/// Where a message is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTarget {
    /// Shown to the user; the kernel bot ignores it.
    User,
    /// Shown and processed by the kernel bot.
    Bot,
    /// Hidden in the client, forced through the kernel.
    Kernel,
    /// Hidden in the client, forced through the kernel as wizard input.
    Build,
}

impl MessageTarget {
    pub const ALL: [MessageTarget; 4] = [Self::User, Self::Bot, Self::Kernel, Self::Build];

    /// Resolve the triple for this target.
    pub fn definition(self) -> TargetDefinition {
        match self {
            Self::User => TargetDefinition {
                display: MessageDisplay::Default,
                kernel_process: KernelProcess::Prevent,
                kernel_display: MessageDisplay::Default,
            },
            Self::Kernel => TargetDefinition {
                display: MessageDisplay::Hidden,
                kernel_process: KernelProcess::Force,
                kernel_display: MessageDisplay::Default,
            },
            Self::Build => TargetDefinition {
                display: MessageDisplay::Hidden,
                kernel_process: KernelProcess::Force,
                kernel_display: MessageDisplay::WizardModeInput,
            },
            Self::Bot => TargetDefinition {
                display: MessageDisplay::Default,
                kernel_process: KernelProcess::Process,
                kernel_display: MessageDisplay::Default,
            },
        }
    }

    /// Map a triple back to its target.
    ///
    /// First match wins: `Process` means bot, then a visible display means
    /// user, then a visible kernel echo means kernel, anything else is build.
    pub fn of(definition: &TargetDefinition) -> Self {
        if definition.kernel_process == KernelProcess::Process {
            Self::Bot
        } else if definition.display == MessageDisplay::Default {
            Self::User
        } else if definition.kernel_display == MessageDisplay::Default {
            Self::Kernel
        } else {
            Self::Build
        }
    }

    /// Targets that never move the "replying to" pointer.
    pub fn is_kernel_bound(self) -> bool {
        matches!(self, Self::Kernel | Self::Build)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
            Self::Kernel => "kernel",
            Self::Build => "build",
        }
    }
}

impl std::fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
