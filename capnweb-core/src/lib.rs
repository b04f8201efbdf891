//! Session-local core of the Cap'n Web pipelining protocol: message
//! parsing, export-id allocation, lazy pipeline resolution, and response
//! framing. Transports (WebSocket, HTTP-batch) and method dispatchers are
//! external collaborators; this crate only consumes a stream of text
//! messages and a user-supplied [`dispatcher::RpcTarget`].

pub mod codec;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ids;
pub mod message;
pub mod pipeline;
pub mod session;
pub mod value;

pub use codec::{handle_batch, handle_line};
pub use dispatcher::{MockRpcTarget, RpcTarget};
pub use engine::{Session, SessionError};
pub use error::{ErrorKind, RpcError};
pub use ids::{ExportId, ExportIdAllocator};
pub use message::{Message, MessageError, PendingCall, Response};
pub use value::{PathSegment, Value};
