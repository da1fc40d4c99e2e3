//! The standard compile stages.
//!
//! | Stage | Reads | Writes |
//! |-------|-------|--------|
//! | [`ResolveStage`] | graph, registry | [`RESOLVED`], [`PARSE_RESULT`] |
//! | [`InterfaceCheckStage`] | [`RESOLVED`] | warnings in [`PARSE_RESULT`] |
//! | [`ExecutableStage`] | [`RESOLVED`] | [`EXECUTABLE`] |

mod executable;
mod interface_check;
mod resolve;

pub use executable::ExecutableStage;
pub use interface_check::InterfaceCheckStage;
pub use resolve::ResolveStage;

use crate::executable::Executable;
use crate::parse_result::ParseResult;
use crate::pipeline::Slot;
use crate::resolver::Resolution;

pub const RESOLVED: Slot<Resolution> = Slot::new("resolved");
pub const PARSE_RESULT: Slot<ParseResult> = Slot::new("parse_result");
pub const EXECUTABLE: Slot<Executable> = Slot::new("executable");
