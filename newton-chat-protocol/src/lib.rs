//! newton-chat-protocol: message model and comm wire types for newton-chat.
//!
//! This crate is the leaf of the workspace. It has no I/O and no runtime
//! dependencies beyond serialization and hashing.
//!
//! # Modules
//!
//! - [`message`] - [`ChatMessage`], display/process enums, sparse [`MessagePatch`]es
//! - [`target`] - the four routing targets and their `(display, process, echo)` triples
//! - [`parts`] - the `####type#:` unified message mini-language and option lists
//! - [`reuse`] - reuse stamps that detect edits to build messages
//! - [`wire`] - client requests and validated kernel messages
//! - [`error`] - [`DecodeError`]

pub mod error;
pub mod message;
pub mod parts;
pub mod reuse;
pub mod target;
pub mod wire;

pub use error::DecodeError;
pub use message::{
    ChatMessage, Feedback, FeedbackPatch, KernelProcess, MessageDisplay, MessagePatch,
    MessageType,
};
pub use parts::{
    MessagePart, MessagePartType, OptionItem, OptionListKind, extract_options,
    join_unified_message, split_unified_message,
};
pub use reuse::{ReuseStamp, content_digest, stamp_reuse_metadata};
pub use target::{MessageTarget, TargetDefinition};
pub use wire::{
    ALL_INSTANCES, AutoCompleteItem, ClientRequest, ConfigMode, KernelMessage, KernelOperation,
    LoaderForm, META_INSTANCE,
};
