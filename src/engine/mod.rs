//! Bookkeeping engine: row placement, derived formulas and the recorder
//! that applies both to the ledger.

pub mod formulas;
pub mod placement;
pub mod recorder;
