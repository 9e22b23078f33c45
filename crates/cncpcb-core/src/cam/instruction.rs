use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The primary letter of a CAM instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Letter {
    G,
    M,
    S,
    F,
    T,
    /// Synthetic letter for a `(MSG,...)` comment-as-message line.
    Star,
}

impl Letter {
    pub fn to_char(self) -> char {
        match self {
            Letter::G => 'G',
            Letter::M => 'M',
            Letter::S => 'S',
            Letter::F => 'F',
            Letter::T => 'T',
            Letter::Star => '*',
        }
    }

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'G' => Some(Letter::G),
            'M' => Some(Letter::M),
            'S' => Some(Letter::S),
            'F' => Some(Letter::F),
            'T' => Some(Letter::T),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Letter::G => write!(f, "G"),
            Letter::M => write!(f, "M"),
            Letter::S => write!(f, "S"),
            Letter::F => write!(f, "F"),
            Letter::T => write!(f, "T"),
            Letter::Star => write!(f, "*"),
        }
    }
}

/// One parsed CAM instruction record.
///
/// `endpoint` is `None` when no axis was touched by this instruction, and
/// always fully defined (all three axes finite) otherwise — undefined axes
/// at parse time are resolved against the caller's "last point" before the
/// record is built, per the data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamInstruction {
    pub letter: Letter,
    pub arg: i64,
    pub endpoint: Option<Point>,
    pub extra: BTreeMap<char, f64>,
    /// Only meaningful when `letter == Letter::Star`.
    pub message: Option<String>,
}

impl CamInstruction {
    pub fn new(letter: Letter, arg: i64) -> Self {
        CamInstruction {
            letter,
            arg,
            endpoint: None,
            extra: BTreeMap::new(),
            message: None,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        CamInstruction {
            letter: Letter::Star,
            arg: 0,
            endpoint: None,
            extra: BTreeMap::new(),
            message: Some(text.into()),
        }
    }

    pub fn with_endpoint(mut self, pt: Point) -> Self {
        self.endpoint = Some(pt);
        self
    }

    pub fn with_extra(mut self, letter: char, value: f64) -> Self {
        self.extra.insert(letter, value);
        self
    }

    /// True iff this instruction matches `(letter, arg)` exactly.
    pub fn is(&self, letter: Letter, arg: i64) -> bool {
        self.letter == letter && self.arg == arg
    }

    /// Whether this instruction belongs to the accepted set (§4.2
    /// classification); anything else is a parse failure on load.
    pub fn is_kept(&self) -> bool {
        match self.letter {
            Letter::Star => true,
            Letter::M => matches!(self.arg, 0 | 3 | 4 | 5 | 6),
            Letter::G => matches!(self.arg, 0 | 1 | 4 | 21 | 90 | 94),
            Letter::S | Letter::F | Letter::T => true,
        }
    }

    /// Apply `f` to the endpoint, if defined; letter, arg, and residual
    /// args are preserved verbatim.
    pub fn transform(&self, f: impl Fn(Point) -> Point) -> CamInstruction {
        let mut out = self.clone();
        out.endpoint = self.endpoint.map(f);
        out
    }
}

impl fmt::Display for CamInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.letter == Letter::Star {
            return write!(f, "(MSG,{})", self.message.as_deref().unwrap_or(""));
        }
        write!(f, "{}{}", self.letter, self.arg)?;
        if let Some(pt) = self.endpoint {
            write!(f, " X{:.3} Y{:.3} Z{:.3}", pt.x, pt.y, pt.z)?;
        }
        for (letter, value) in &self.extra {
            write!(f, " {}{:.3}", letter, value)?;
        }
        Ok(())
    }
}
