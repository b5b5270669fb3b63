//! Service module
//!
//! Business operations over the entity layer.

pub mod department;
