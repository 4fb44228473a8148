//! R1CS (Rank-1 Constraint System) layer of the zkp proof engine.
//!
//! Constraints have the form `<a, z> * <b, z> = <c, z>` where
//! `z = [1 | public_inputs | private]`. Circuits are written once against
//! the [`Circuit`] trait and frozen into a validated [`CircuitDescriptor`],
//! which setup, proving and verification all share.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod circuits;
pub mod constraint;
pub mod descriptor;
pub mod gadgets;
pub mod linear_combination;
pub mod system;
pub mod variable;

pub use constraint::Constraint;
pub use descriptor::{CircuitAssignment, CircuitDescriptor, CIRCUIT_ID_BYTES};
pub use linear_combination::LinearCombination;
pub use system::{Circuit, ConstraintSystem};
pub use variable::Variable;
pub use zkp_field;

use zkp_field::FieldError;

/// Errors that can occur in R1CS operations
#[derive(Debug, thiserror::Error)]
pub enum R1CSError {
    /// Variable index out of bounds
    #[error("Variable index {var_index} out of bounds (have {num_vars} variables)")]
    VariableOutOfBounds {
        /// Index of the variable that was out of bounds
        var_index: usize,
        /// Total number of variables available
        num_vars: usize,
    },

    /// Invalid assignment size
    #[error("Invalid assignment size: expected {expected}, got {actual}")]
    InvalidAssignmentSize {
        /// Expected number of variables
        expected: usize,
        /// Actual number of variables provided
        actual: usize,
    },

    /// Invalid public input size
    #[error("Invalid public input size: expected {expected}, got {actual}")]
    InvalidPublicInputSize {
        /// Expected number of public inputs
        expected: usize,
        /// Actual number of public inputs provided
        actual: usize,
    },

    /// Invalid witness size
    #[error("Invalid witness size: expected {expected}, got {actual}")]
    InvalidWitnessSize {
        /// Expected number of private variables
        expected: usize,
        /// Actual number of private variables provided
        actual: usize,
    },

    /// Constraint not satisfied
    #[error("Constraint {constraint_index} not satisfied")]
    UnsatisfiedConstraint {
        /// Index of the constraint that failed
        constraint_index: usize,
    },

    /// Invalid constant variable (should always be 1)
    #[error("Invalid constant variable: should always be 1")]
    InvalidConstantVariable,

    /// A variable was allocated without a value while assigning
    #[error("Missing value for variable {var_index}")]
    MissingAssignment {
        /// Index of the variable lacking a value
        var_index: usize,
    },

    /// The circuit instance carries no public input values
    #[error("Circuit instance has no public input values")]
    MissingPublicInputs,

    /// Circuit has no constraints
    #[error("Circuit has no constraints")]
    EmptyCircuit,

    /// A constraint references a variable that was never allocated
    #[error("Constraint {constraint_index} references unallocated variable {var_index}")]
    DanglingVariable {
        /// Index of the offending constraint
        constraint_index: usize,
        /// Index of the unallocated variable
        var_index: usize,
    },

    /// A constraint over constants only that can never hold
    #[error("Constraint {constraint_index} is constant and unsatisfiable")]
    UnsatisfiableConstraint {
        /// Index of the offending constraint
        constraint_index: usize,
    },

    /// Variable count cannot hold the constant and public inputs
    #[error("{num_variables} variables cannot hold the constant and {num_public_inputs} public inputs")]
    TooFewVariables {
        /// Declared number of variables
        num_variables: usize,
        /// Declared number of public inputs
        num_public_inputs: usize,
    },

    /// Assignment-mode synthesis produced a different shape
    #[error(
        "Synthesized shape ({actual_constraints} constraints, {actual_variables} variables) \
         differs from descriptor ({expected_constraints} constraints, {expected_variables} variables)"
    )]
    ShapeMismatch {
        /// Constraints in the descriptor
        expected_constraints: usize,
        /// Constraints synthesized
        actual_constraints: usize,
        /// Variables in the descriptor
        expected_variables: usize,
        /// Variables synthesized
        actual_variables: usize,
    },

    /// A circuit or gadget parameter is out of range
    #[error("Invalid circuit parameter: {0}")]
    InvalidParameter(String),

    /// Malformed canonical encoding
    #[error("Circuit encoding error: {0}")]
    Encoding(String),

    /// Field operation error
    #[error("Field error: {0}")]
    FieldError(#[from] FieldError),
}

impl R1CSError {
    /// Whether the error describes a malformed circuit rather than bad values
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            R1CSError::EmptyCircuit
                | R1CSError::DanglingVariable { .. }
                | R1CSError::UnsatisfiableConstraint { .. }
                | R1CSError::TooFewVariables { .. }
                | R1CSError::InvalidParameter(_)
                | R1CSError::Encoding(_)
        )
    }
}
