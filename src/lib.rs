//! Rule-based auditing and repair of SQLite databases.
//!
//! A [`RuleCatalog`](rules::RuleCatalog) of checks is run by the
//! [`Engine`](engine::Engine) against a [`ConnectionAdapter`](db::ConnectionAdapter),
//! producing a [`Report`](report::Report) of findings and, in fix mode, the
//! outcome of each repair.

pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod output;
pub mod report;
pub mod rules;
