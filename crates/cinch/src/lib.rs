//! cinch - bind declarative constraints to Rust values.
//!
//! Annotate a struct with constraints, then check a value against them or
//! let them fill in what the value leaves unset:
//! - [`Context::validate`] checks a value without modifying it
//! - [`Context::complete`] writes back what the constraints determine, and
//!   leaves the value untouched when it fails
//! - [`Context::constrain`] attaches extra constraints to a type
//!
//! # Example
//!
//! ```
//! use cinch::prelude::*;
//!
//! #[derive(Bind, Debug, PartialEq)]
//! struct Order {
//!     #[bind(constraint = ">=1")]
//!     quantity: i64,
//!     #[bind(constraint = "int | *10", optional)]
//!     unit_price: i64,
//!     #[bind(constraint = "quantity * unit_price", optional)]
//!     total: i64,
//! }
//!
//! let ctx = Context::new();
//! let mut order = Order { quantity: 3, unit_price: 0, total: 0 };
//! ctx.complete(&mut order).unwrap();
//! assert_eq!(order, Order { quantity: 3, unit_price: 10, total: 30 });
//!
//! let bad = Order { quantity: 0, unit_price: 10, total: 0 };
//! assert!(matches!(ctx.validate(&bad), Err(BindError::Validation(_))));
//! ```

// Lets `#[derive(Bind)]` expand to `::cinch::...` inside this crate.
extern crate self as cinch;

pub mod bind;
pub mod context;
pub mod decode;
pub mod encode;
pub mod error;
pub mod host;
pub mod schema;

pub use bind::Bind;
pub use cinch_macros::Bind;

pub use context::Context;
pub use decode::StructDecoder;
pub use encode::StructEncoder;
pub use error::{BindError, DecodeError, Diagnostics, EncodeError, Result, SchemaError};
pub use host::{HostField, HostType, ScalarKind, StructType};
pub use schema::{SchemaCache, TypeSchema};

pub use cinch_config::{BinderConfig, CinchConfig, ConfigError, EngineConfig, NilValidation};
pub use cinch_core::{Path, Segment, Value};
pub use cinch_engine::{BoundResult, Classification, CompileError, Issue, IssueKind};

pub mod prelude {
    pub use super::{Bind, BindError, CinchConfig, Context, SchemaCache};
}
