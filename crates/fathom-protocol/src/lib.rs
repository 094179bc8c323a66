mod codec;
mod error;
mod message;

pub use codec::{encode, FrameDecoder, MAX_FRAME_LEN};
pub use error::{ProtocolError, Result};
pub use message::{Extras, Message};
