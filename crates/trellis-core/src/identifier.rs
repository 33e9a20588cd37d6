//! Identifiers used to cross-reference emitted descriptions with parsed
//! geometry results.
//!
//! Two kinds of identity exist during a render:
//!
//! - [`Id`]: an interned node identifier, carried verbatim into the emitted
//!   description and echoed back by the engine in each shape's title block.
//! - [`ColorId`]: a synthetic color value issued by [`ColorSequence`]. Cluster
//!   and connector geometry carries no title block, so these entities are
//!   located in the result by the color they were assigned at build time.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> &'static Mutex<DefaultStringInterner> {
    INTERNER.get_or_init(|| Mutex::new(DefaultStringInterner::new()))
}

/// Interned node identifier.
///
/// Interning keeps registry lookups cheap: comparing two `Id`s is a symbol
/// comparison, not a string comparison.
///
/// # Examples
///
/// ```
/// use trellis_core::identifier::Id;
///
/// let a = Id::new("node12");
/// let b = Id::new("node12");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "node12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string, interning it if new.
    pub fn new(name: &str) -> Self {
        let mut interner = interner().lock().expect("interner lock poisoned");
        Self(interner.get_or_intern(name))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner().lock().expect("interner lock poisoned");
        let name = interner
            .resolve(self.0)
            .expect("symbol missing from interner");
        write!(f, "{name}")
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A synthetic color identity issued by [`ColorSequence`].
///
/// Formats as the 6-hex-digit lowercase string the engine echoes back in its
/// result (`#00000f`), which is the only reliable key for locating cluster
/// and connector geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorId(u32);

impl ColorId {
    /// Returns the raw sequence value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Returns the `#rrggbb` form used in emitted attributes and result
    /// lookup.
    pub fn hex(self) -> String {
        format!("#{:06x}", self.0)
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// Monotonic generator of [`ColorId`]s for one diagram render.
///
/// Ids issued by one sequence are pairwise distinct and deterministic given a
/// fixed creation order. Each render owns its own sequence; nothing here is
/// process-global.
#[derive(Debug, Default)]
pub struct ColorSequence {
    next: u32,
}

impl ColorSequence {
    /// Creates a fresh sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next color in the sequence.
    pub fn next_color(&mut self) -> ColorId {
        self.next += 1;
        ColorId(self.next)
    }
}
