//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use cinch::Bind;
use tracing_subscriber::EnvFilter;

/// Routes binder logs to the test output. Set `RUST_LOG=cinch=debug` to
/// see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Sum - three fields related by c = a + b, c >= 5
// ============================================================================

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Sum {
    #[bind(constraint = "c - b", optional)]
    pub a: i64,
    #[bind(constraint = "c - a", optional)]
    pub b: i64,
    #[bind(constraint = "a + b & >=5", optional)]
    pub c: i64,
}

impl Sum {
    pub fn new(a: i64, b: i64, c: i64) -> Self {
        Self { a, b, c }
    }
}

/// `Sum` with pointer fields: `None` is unset, `Some(0)` is a real zero.
#[derive(Bind, Debug, Clone, PartialEq)]
pub struct SumPtr {
    #[bind(constraint = "c - b")]
    pub a: Option<i64>,
    #[bind(constraint = "c - a")]
    pub b: Option<i64>,
    #[bind(constraint = "a + b & >=5")]
    pub c: Option<i64>,
}

// ============================================================================
// Updated - list defaults
// ============================================================================

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Updated {
    #[bind(constraint = "[...int | *1]")]
    pub a: Option<Vec<Option<i64>>>,
    #[bind(constraint = "3 * [int | *1]")]
    pub b: Option<Vec<i64>>,
    #[bind(optional)]
    pub m: Option<HashMap<String, i64>>,
}

// ============================================================================
// Maps
// ============================================================================

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Mapped {
    pub m: HashMap<String, Option<i64>>,
}

impl Mapped {
    pub fn new(entries: &[(&str, Option<i64>)]) -> Self {
        Self {
            m: entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Listed {
    pub v: Vec<Option<i64>>,
}

pub const MIRRORED_KEYS: &str = "{m: {foo: bar, bar: foo}}";

// ============================================================================
// Defaults and nesting
// ============================================================================

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Scaled {
    #[bind(constraint = "int | *3", optional)]
    pub factor: i64,
    pub base: i64,
    #[bind(constraint = "base * factor", optional)]
    pub scaled: i64,
}

#[derive(Bind, Debug, Clone, Default, PartialEq)]
pub struct Inner {
    pub p: i64,
    #[bind(constraint = "p * 2")]
    pub q: i64,
}

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Outer {
    #[bind(constraint = "{p: 5}")]
    pub inner: Option<Inner>,
    pub plain: Option<Inner>,
}

// ============================================================================
// Float widths
// ============================================================================

#[derive(Bind, Debug, Clone, PartialEq)]
pub struct Narrow {
    #[bind(constraint = "x + 1", optional)]
    pub y: f32,
    pub x: f64,
}
