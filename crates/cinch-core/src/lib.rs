//! cinch core - the constraint value lattice.
//!
//! This crate provides the value model shared by the engine and the binder:
//! - [`Kind`] sets describing what a value may be
//! - [`Value`], covering atoms, kind/bound constraints, disjunctions with
//!   defaults, structs, lists and bottom
//! - [`unify`], the lattice meet
//! - [`Path`] and [`Conflict`] for locating failures

pub mod error;
pub mod kind;
pub mod path;
pub mod unify;
pub mod value;

#[cfg(test)]
mod tests;

pub use error::Conflict;
pub use kind::Kind;
pub use path::{Path, Segment};
pub use unify::{unify, unify_all};
pub use value::{
    Alternative, Bound, BoundOp, Constraint, Disjunction, ListValue, StructValue, Value,
};
