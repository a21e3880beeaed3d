//! erdsync - SQL DDL / ER model / diagram round-trip translator
//!
//! Parses `CREATE TABLE` text into a normalized entity-relationship model,
//! renders the model back as DDL for MySQL, PostgreSQL, SQLite or SQL Server,
//! and converts it to and from the node/edge graph a diagram editor works on.

pub mod core;
