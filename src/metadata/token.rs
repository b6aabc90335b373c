use std::fmt;

/// An index into a class file's constant pool.
///
/// Index `0` is never a valid entry; it is used by the format to mean "absent", e.g. a
/// missing super class or a catch-all exception handler.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u16);

impl Token {
    /// Creates a new token from a raw constant-pool index
    #[must_use]
    pub fn new(value: u16) -> Self {
        Token(value)
    }

    /// Returns the raw index
    #[must_use]
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns the index as a `usize` for slice access
    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }

    /// Returns true if this is the null index (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u16> for Token {
    fn from(value: u16) -> Self {
        Token(value)
    }
}

impl From<Token> for u16 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(#{})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
