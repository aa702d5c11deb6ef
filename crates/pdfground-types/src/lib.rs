//! Shared types for the PDFGround history store.

mod history;
mod operation;

pub use history::*;
pub use operation::*;
