#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Shared vocabulary for the rankdb workspace: error kinds, slot and result
//! types, the collaborator traits the index is wired against, configuration,
//! and document discovery.

pub mod config;
pub mod discovery;
pub mod error;
pub mod traits;
pub mod types;
