//! # scql-apdu
//!
//! ISO7816 command/response layer for the SCQL engine.
//!
//! - [`command`]: command APDU framing (short and extended lengths)
//! - [`request`]: typed SCQL and transaction commands and their data fields
//! - [`response`]: status words and response APDUs
//! - [`applet`]: the command loop that owns a [`scql_engine::Database`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod applet;
pub mod command;
pub mod request;
pub mod response;

pub use applet::ScqlApplet;
pub use command::CommandApdu;
pub use request::{Command, Instruction, ScqlOp, ScqlRequest, TransactionOp};
pub use response::{ResponseApdu, StatusWord};
