//! Value kinds as a small bit set.

use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A set of value kinds.
///
/// `int` and `float` are distinct kinds; `number` is their union. The empty
/// set is bottom and the full set is top (`_`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind(u8);

impl Kind {
    pub const NONE: Kind = Kind(0);
    pub const NULL: Kind = Kind(1);
    pub const BOOL: Kind = Kind(1 << 1);
    pub const INT: Kind = Kind(1 << 2);
    pub const FLOAT: Kind = Kind(1 << 3);
    pub const STRING: Kind = Kind(1 << 4);
    pub const LIST: Kind = Kind(1 << 5);
    pub const STRUCT: Kind = Kind(1 << 6);

    pub const NUMBER: Kind = Kind(Self::INT.0 | Self::FLOAT.0);
    pub const SCALAR: Kind =
        Kind(Self::NULL.0 | Self::BOOL.0 | Self::INT.0 | Self::FLOAT.0 | Self::STRING.0);
    pub const TOP: Kind = Kind(Self::SCALAR.0 | Self::LIST.0 | Self::STRUCT.0);

    pub fn union(self, other: Kind) -> Kind {
        Kind(self.0 | other.0)
    }

    pub fn intersect(self, other: Kind) -> Kind {
        Kind(self.0 & other.0)
    }

    /// Returns true if every kind in `other` is also in `self`.
    pub fn contains(self, other: Kind) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn overlaps(self, other: Kind) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }
}

impl BitOr for Kind {
    type Output = Kind;

    fn bitor(self, rhs: Kind) -> Kind {
        self.union(rhs)
    }
}

impl BitAnd for Kind {
    type Output = Kind;

    fn bitand(self, rhs: Kind) -> Kind {
        self.intersect(rhs)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_top() {
            return write!(f, "_");
        }
        if self.is_empty() {
            return write!(f, "_|_");
        }
        let mut names = Vec::new();
        let mut rest = *self;
        if rest.contains(Kind::NUMBER) {
            names.push("number");
            rest = Kind(rest.0 & !Kind::NUMBER.0);
        }
        for (kind, name) in [
            (Kind::NULL, "null"),
            (Kind::BOOL, "bool"),
            (Kind::INT, "int"),
            (Kind::FLOAT, "float"),
            (Kind::STRING, "string"),
            (Kind::LIST, "list"),
            (Kind::STRUCT, "struct"),
        ] {
            if rest.contains(kind) {
                names.push(name);
            }
        }
        write!(f, "{}", names.join("|"))
    }
}
