//! Backend gateway, the asynchronous request/response boundary between the
//! state containers and the backend process.
//!
//! [`BackendGateway`] is the seam every container calls through.
//! [`IpcGateway`] speaks it over a framed message channel, [`serve`] is the
//! other end of that channel, and [`InMemoryBackend`] is a self-contained
//! implementation for tests and the demo binary.

pub mod gateway;
pub mod ipc;
pub mod memory;

pub use gateway::{BackendGateway, Operation};
pub use ipc::{loopback, serve, IpcGateway, ReplyFrame, RequestFrame};
pub use memory::InMemoryBackend;
