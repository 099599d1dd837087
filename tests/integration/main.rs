//! Integration tests: full command flows against in-memory ledgers.

mod bet_flow;
mod flaky_ledger;
