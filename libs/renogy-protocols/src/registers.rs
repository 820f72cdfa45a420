//! Renogy register map
//!
//! What to read per device type (`command_table`), how to turn the answer
//! back into named values (`codec`), and the closed set of field names
//! those values live under (`fields`).

mod codec;
mod command_table;
mod fields;

pub use codec::{build_frame, decode};
pub use command_table::{lookup, CommandEntry, Operation, CONTROLLER_COMMANDS};
pub use fields::{FieldKey, FieldValue, ParsedSnapshot};
