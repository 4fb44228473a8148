//! Variable handles into the assignment vector

use std::fmt;

/// Variable index in the constraint system.
///
/// The convention is: z[0] = 1 (constant), z[1..=num_public] = public inputs,
/// z[num_public+1..] = private (witness) variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub usize);

impl Variable {
    /// The constant variable (always has value 1)
    pub const ONE: Variable = Variable(0);

    /// Create a new variable with given index
    pub fn new(index: usize) -> Self {
        Variable(index)
    }

    /// Get the index of this variable
    pub fn index(&self) -> usize {
        self.0
    }

    /// Whether this is the constant-one variable
    pub fn is_constant(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            write!(f, "one")
        } else {
            write!(f, "v{}", self.0)
        }
    }
}
