//! QAP (Quadratic Arithmetic Program) reduction for the zkp proof engine.
//!
//! Each constraint `j` is mapped to the domain point `ω^j`. After the `m`
//! circuit constraints the domain holds one extra row per input (the constant
//! and every public input) with `A[m+i][i] = 1`. Those rows make the input
//! polynomials linearly independent, which Groth16 needs for the input
//! commitment in the verifying key.
//!
//! Satisfiability becomes `A(x) * B(x) - C(x) = H(x) * Z(x)` where `Z` is the
//! vanishing polynomial of the domain.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use ark_ff::Zero;
use ark_poly::{
    univariate::DensePolynomial, DenseUVPolynomial, EvaluationDomain, Radix2EvaluationDomain,
};
use zkp_field::{FieldError, FieldLike};
use zeroize::Zeroize;
use zkp_r1cs::{CircuitDescriptor, LinearCombination, R1CSError};

pub use zkp_field;
pub use zkp_r1cs;

/// QAP view of a circuit descriptor
#[derive(Debug, Clone)]
pub struct QAP<F: FieldLike> {
    /// Evaluation domain used for polynomial operations
    pub domain: Radix2EvaluationDomain<F>,
    /// Number of constraints in the circuit
    pub num_constraints: usize,
    /// Number of public inputs (excluding the constant)
    pub num_public_inputs: usize,
    /// Total number of variables including the constant
    pub num_variables: usize,
}

/// Per-variable QAP polynomials evaluated at one point.
///
/// Evaluated at the setup secret these values reveal it, so they are wiped
/// on drop.
#[derive(Debug, Clone)]
pub struct QAPEvaluation<F: FieldLike> {
    /// `A_i(x)` for every variable i
    pub a: Vec<F>,
    /// `B_i(x)` for every variable i
    pub b: Vec<F>,
    /// `C_i(x)` for every variable i
    pub c: Vec<F>,
    /// `Z(x)`
    pub z: F,
}

impl<F: FieldLike> Drop for QAPEvaluation<F> {
    fn drop(&mut self) {
        self.a.zeroize();
        self.b.zeroize();
        self.c.zeroize();
        self.z.zeroize();
    }
}

/// Errors that can occur during QAP operations
#[derive(Debug, thiserror::Error)]
pub enum QAPError {
    /// No radix-2 domain is large enough for the circuit
    #[error("No evaluation domain of size {required} is available for this field")]
    DomainUnavailable {
        /// Number of rows the domain must hold
        required: usize,
    },

    /// Polynomial division failed (remainder should be zero)
    #[error("Polynomial division failed: non-zero remainder")]
    PolynomialDivisionFailed,

    /// Field operation error
    #[error("Field error: {0}")]
    FieldError(#[from] FieldError),

    /// Constraint evaluation error
    #[error("R1CS error: {0}")]
    R1CSError(#[from] R1CSError),
}

/// Number of domain rows a circuit occupies
pub fn required_domain_rows(num_constraints: usize, num_public_inputs: usize) -> usize {
    num_constraints + num_public_inputs + 1
}

impl<F: FieldLike> QAP<F> {
    /// Build the QAP view of a descriptor
    pub fn from_descriptor(circuit: &CircuitDescriptor<F>) -> Result<Self, QAPError> {
        let required =
            required_domain_rows(circuit.num_constraints(), circuit.num_public_inputs());
        let domain = Radix2EvaluationDomain::<F>::new(required)
            .ok_or(QAPError::DomainUnavailable { required })?;

        tracing::trace!(
            constraints = circuit.num_constraints(),
            domain_size = domain.size(),
            "built QAP domain"
        );

        Ok(Self {
            domain,
            num_constraints: circuit.num_constraints(),
            num_public_inputs: circuit.num_public_inputs(),
            num_variables: circuit.num_variables(),
        })
    }

    /// Size of the evaluation domain
    pub fn domain_size(&self) -> usize {
        self.domain.size()
    }

    /// Evaluate every `A_i`, `B_i`, `C_i` and `Z` at `point`.
    ///
    /// This uses the Lagrange basis directly and never interpolates the
    /// per-variable polynomials.
    pub fn evaluate_at(&self, circuit: &CircuitDescriptor<F>, point: F) -> Result<QAPEvaluation<F>, QAPError> {
        self.check_circuit(circuit)?;

        let lagrange = self.domain.evaluate_all_lagrange_coefficients(point);
        let mut a = vec![F::zero(); self.num_variables];
        let mut b = vec![F::zero(); self.num_variables];
        let mut c = vec![F::zero(); self.num_variables];

        let scatter = |target: &mut [F], lc: &LinearCombination<F>, l: F| {
            for (var, coeff) in lc.terms() {
                target[var.index()] += l * coeff;
            }
        };
        for (j, constraint) in circuit.constraints().iter().enumerate() {
            scatter(a.as_mut_slice(), &constraint.a, lagrange[j]);
            scatter(b.as_mut_slice(), &constraint.b, lagrange[j]);
            scatter(c.as_mut_slice(), &constraint.c, lagrange[j]);
        }
        for i in 0..=self.num_public_inputs {
            a[i] += lagrange[self.num_constraints + i];
        }

        Ok(QAPEvaluation {
            a,
            b,
            c,
            z: self.domain.evaluate_vanishing_polynomial(point),
        })
    }

    /// Coefficients of `H(x) = (A(x) * B(x) - C(x)) / Z(x)` for an assignment.
    ///
    /// The result always has `domain_size - 1` coefficients. An assignment
    /// that does not satisfy the circuit leaves a non-zero remainder.
    /// Intermediate witness-dependent polynomials are wiped before returning.
    pub fn compute_quotient(&self, circuit: &CircuitDescriptor<F>, assignment: &[F]) -> Result<Vec<F>, QAPError> {
        self.check_circuit(circuit)?;
        if assignment.len() != self.num_variables {
            return Err(FieldError::DimensionMismatch {
                left: assignment.len(),
                right: self.num_variables,
            }
            .into());
        }

        let (a_evals, b_evals, c_evals) = self.row_evaluations(circuit, assignment)?;
        let domain = self.domain;
        let interpolate = |mut evals: Vec<F>| {
            let coeffs = domain.ifft(&evals);
            evals.zeroize();
            DensePolynomial::from_coefficients_vec(coeffs)
        };

        let (mut a_poly, (mut b_poly, mut c_poly)) = rayon::join(
            || interpolate(a_evals),
            || rayon::join(|| interpolate(b_evals), || interpolate(c_evals)),
        );

        let mut numerator = &(&a_poly * &b_poly) - &c_poly;
        for poly in [&mut a_poly, &mut b_poly, &mut c_poly] {
            poly.coeffs.zeroize();
        }
        let divided = numerator.divide_by_vanishing_poly(domain);
        numerator.coeffs.zeroize();
        let (quotient, mut remainder) = divided.ok_or(QAPError::PolynomialDivisionFailed)?;
        let satisfied = remainder.is_zero();
        remainder.coeffs.zeroize();

        let num_coeffs = self.domain_size() - 1;
        let mut coeffs = quotient.coeffs;
        if !satisfied || coeffs.len() > num_coeffs {
            coeffs.zeroize();
            return Err(QAPError::PolynomialDivisionFailed);
        }
        coeffs.resize(num_coeffs, F::zero());
        Ok(coeffs)
    }

    /// Values of `<A_j,z>`, `<B_j,z>`, `<C_j,z>` on every domain row
    fn row_evaluations(
        &self,
        circuit: &CircuitDescriptor<F>,
        assignment: &[F],
    ) -> Result<(Vec<F>, Vec<F>, Vec<F>), QAPError> {
        let n = self.domain_size();
        let mut a = vec![F::zero(); n];
        let mut b = vec![F::zero(); n];
        let mut c = vec![F::zero(); n];

        for (j, constraint) in circuit.constraints().iter().enumerate() {
            a[j] = constraint.a.evaluate(assignment)?;
            b[j] = constraint.b.evaluate(assignment)?;
            c[j] = constraint.c.evaluate(assignment)?;
        }
        for i in 0..=self.num_public_inputs {
            a[self.num_constraints + i] = assignment[i];
        }
        Ok((a, b, c))
    }

    fn check_circuit(&self, circuit: &CircuitDescriptor<F>) -> Result<(), QAPError> {
        if circuit.num_constraints() != self.num_constraints
            || circuit.num_variables() != self.num_variables
            || circuit.num_public_inputs() != self.num_public_inputs
        {
            return Err(FieldError::DimensionMismatch {
                left: circuit.num_variables(),
                right: self.num_variables,
            }
            .into());
        }
        Ok(())
    }
}
