//! Core record types for the persona store

mod persona;
mod profile;

pub use persona::{ConnectionConfirmState, LinkedProfileDetails, PersonaRecord};
pub use profile::ProfileRecord;
