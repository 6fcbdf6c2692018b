//! Locations reported by errors.
//!
//! A location starts at the root (`$`) and walks down through record fields,
//! map keys and sequence elements. Errors raised deep inside a value carry the
//! location relative to that value; callers prepend their own segment with
//! [`ResdocError::with_prefix`](crate::ResdocError::with_prefix) while the error
//! propagates outward.

use std::fmt;

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Seg {
    /// A record field, map key or document member.
    Key(String),
    /// An element of a sequence.
    Index(usize),
    /// The append position of a sequence (`-` in a patch path).
    End,
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, ".{k}"),
            Seg::Index(i) => write!(f, "[{i}]"),
            Seg::End => f.write_str("[-]"),
        }
    }
}

impl From<&str> for Seg {
    fn from(key: &str) -> Self {
        Seg::Key(key.to_owned())
    }
}

impl From<String> for Seg {
    fn from(key: String) -> Self {
        Seg::Key(key)
    }
}

impl From<usize> for Seg {
    fn from(index: usize) -> Self {
        Seg::Index(index)
    }
}

/// Location of a value, rendered as `$.comments[0].body`.
///
/// ```
/// use resdoc::{path, ResdocError};
///
/// let err = ResdocError::invalid_value("out of range").with_prefix(&path!("scores", 2));
/// assert_eq!(err.path().unwrap().to_string(), "$.scores[2]");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The root location.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a segment in place.
    pub fn push(&mut self, seg: impl Into<Seg>) {
        self.0.push(seg.into());
    }

    /// The location one step below this one.
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut out = self.clone();
        out.push(seg);
        out
    }

    /// `self` read relative to `prefix`.
    pub fn under(self, prefix: &Path) -> Path {
        let mut out = prefix.clone();
        out.0.extend(self.0);
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        self.0.iter().try_for_each(|seg| seg.fmt(f))
    }
}

/// Build a [`Path`] from keys and indices.
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut p = $crate::Path::root();
        $( p.push($crate::Seg::from($seg)); )*
        p
    }};
}
