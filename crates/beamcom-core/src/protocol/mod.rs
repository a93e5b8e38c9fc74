//! Protocol module containing the command/reply types and the text codec.

pub mod codec;
pub mod command;
pub mod reply;

pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, find_frame, Frame, ProtocolError,
    COMMAND_SENTINEL, REPLY_SENTINEL,
};
pub use command::{Request, Verb};
pub use reply::{FaultKind, Reply};
