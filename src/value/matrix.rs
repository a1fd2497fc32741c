//! # matrix.rs
//!
//! Dense row-major matrix helpers used by the vector and matrix values.

use crate::errors::ExecutionError;

/// Row-major matrix of reals.
pub type Matrix = Vec<Vec<f64>>;

/// Pivots smaller than this are treated as zero.
const SINGULAR_EPSILON: f64 = 1.0e-12;

fn mismatch(operation: &str) -> ExecutionError {
    ExecutionError::DimensionMismatch { operation: operation.to_string() }
}

/// Returns `(rows, columns)`.
pub fn dimensions(m: &Matrix) -> (usize, usize) {
    (m.len(), m.first().map_or(0, Vec::len))
}

/// Checks that every row has the same length.
pub fn validate(rows: Matrix) -> Result<Matrix, ExecutionError> {
    let (_, cols) = dimensions(&rows);
    if rows.iter().any(|row| row.len() != cols) {
        return Err(mismatch("matrix literal"));
    }
    Ok(rows)
}

pub fn identity(n: usize) -> Matrix {
    (0..n).map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect()).collect()
}

pub fn transpose(m: &Matrix) -> Matrix {
    let (rows, cols) = dimensions(m);
    (0..cols).map(|j| (0..rows).map(|i| m[i][j]).collect()).collect()
}

/// Applies `op` to every pair of elements of two matrices of the same shape.
pub fn elementwise<F>(a: &Matrix, b: &Matrix, operation: &str, op: F) -> Result<Matrix, ExecutionError>
where
    F: Fn(f64, f64) -> f64,
{
    if dimensions(a) != dimensions(b) {
        return Err(mismatch(operation));
    }
    Ok(a.iter().zip(b)
        .map(|(ra, rb)| ra.iter().zip(rb).map(|(x, y)| op(*x, *y)).collect())
        .collect())
}

/// Applies `op` to every element.
pub fn map<F>(m: &Matrix, op: F) -> Matrix
where
    F: Fn(f64) -> f64,
{
    m.iter().map(|row| row.iter().map(|x| op(*x)).collect()).collect()
}

/// Matrix product `a · b`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix, ExecutionError> {
    let (rows, inner) = dimensions(a);
    let (b_rows, cols) = dimensions(b);
    if inner != b_rows {
        return Err(mismatch("matrix product"));
    }
    Ok((0..rows)
        .map(|i| (0..cols).map(|j| (0..inner).map(|k| a[i][k] * b[k][j]).sum()).collect())
        .collect())
}

/// Matrix-vector product `a · v`.
pub fn mul_vector(a: &Matrix, v: &[f64]) -> Result<Vec<f64>, ExecutionError> {
    let (_, cols) = dimensions(a);
    if cols != v.len() {
        return Err(mismatch("matrix product"));
    }
    Ok(a.iter().map(|row| row.iter().zip(v).map(|(x, y)| x * y).sum()).collect())
}

fn require_square(m: &Matrix, operation: &str) -> Result<usize, ExecutionError> {
    let (rows, cols) = dimensions(m);
    if rows != cols {
        return Err(mismatch(operation));
    }
    Ok(rows)
}

/// Index of the row with the largest pivot in `col`, starting at `from`.
fn pivot_row(m: &Matrix, col: usize, from: usize) -> usize {
    (from..m.len())
        .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
        .unwrap_or(from)
}

/// Determinant by Gaussian elimination with partial pivoting.
pub fn determinant(m: &Matrix) -> Result<f64, ExecutionError> {
    let n = require_square(m, "det")?;
    let mut a = m.clone();
    let mut det = 1.0;

    for col in 0..n {
        let pivot = pivot_row(&a, col, col);
        if a[pivot][col].abs() < SINGULAR_EPSILON {
            return Ok(0.0);
        }
        if pivot != col {
            a.swap(pivot, col);
            det = -det;
        }
        det *= a[col][col];
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    Ok(det)
}

/// Inverse by Gauss-Jordan elimination.
pub fn inverse(m: &Matrix) -> Result<Matrix, ExecutionError> {
    let n = require_square(m, "inverse")?;
    let mut a = m.clone();
    let mut inv = identity(n);

    for col in 0..n {
        let pivot = pivot_row(&a, col, col);
        if a[pivot][col].abs() < SINGULAR_EPSILON {
            return Err(ExecutionError::InvalidArgument {
                function: "inverse".into(),
                reason: "the matrix is singular".into(),
            });
        }
        a.swap(pivot, col);
        inv.swap(pivot, col);

        let p = a[col][col];
        for k in 0..n {
            a[col][k] /= p;
            inv[col][k] /= p;
        }
        for row in (0..n).filter(|&row| row != col) {
            let factor = a[row][col];
            for k in 0..n {
                a[row][k] -= factor * a[col][k];
                inv[row][k] -= factor * inv[col][k];
            }
        }
    }

    Ok(inv)
}

/// Integer power by repeated squaring; negative exponents invert first.
pub fn power(m: &Matrix, exp: i64) -> Result<Matrix, ExecutionError> {
    let n = require_square(m, "^")?;
    let mut base = if exp < 0 { inverse(m)? } else { m.clone() };
    let mut result = identity(n);
    let mut remaining = exp.unsigned_abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = multiply(&result, &base)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            base = multiply(&base, &base)?;
        }
    }
    Ok(result)
}
