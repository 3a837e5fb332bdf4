//! Message Module
//!
//! Self-describing messages and the code → decoder dispatch table.
//!
//! ## Application Envelope
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Code (2) │     Serialized message      │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! The code selects the decoder in the receiving [`Registry`]. Codes are
//! unique within one registry; an unknown code on the wire is a recoverable
//! error and only drops that one message.

mod kind;
mod registry;

pub use kind::{Message, MessageDecoder, MessageKind};
pub use registry::{encode_envelope, Registry, CODE_SIZE};
