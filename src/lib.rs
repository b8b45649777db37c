//! Toolkit for the IRMEQS fixed-width payout exchange format: converts
//! semicolon-delimited payout extracts into byte-exact 300-byte record
//! files, recovers tax identifiers from generated files, filters extracts
//! against those identifiers, and builds the companion HR upload CSV.

pub mod extract;
pub mod filter;
pub mod generate;
pub mod payroll;
pub mod record;
pub mod sequence;
pub mod tabular;
pub mod text;
