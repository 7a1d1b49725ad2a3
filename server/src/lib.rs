// server/src/lib.rs
pub mod cli;
