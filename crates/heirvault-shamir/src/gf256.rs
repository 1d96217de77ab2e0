//! Arithmetic in GF(2^8) for Shamir's Secret Sharing
//!
//! Reduction polynomial x^8 + x^4 + x^3 + x + 1 (0x11B), the AES field.
//! Multiplication is computed bit by bit rather than through log/exp tables
//! so that the work done does not depend on secret operand values.

/// Low byte of the reduction polynomial (the x^8 term is implicit).
const REDUCTION: u8 = 0x1B;

/// Add two field elements (XOR)
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Subtraction is addition in characteristic 2
#[inline]
pub fn sub(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Multiply two field elements
pub fn mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        // mask is 0xFF when the low bit of b is set, 0x00 otherwise
        let mask = (b & 1).wrapping_neg();
        product ^= a & mask;
        let carry = (a >> 7).wrapping_neg();
        a = (a << 1) ^ (REDUCTION & carry);
        b >>= 1;
    }
    product
}

/// Multiplicative inverse, computed as a^254. `inv(0)` returns 0.
pub fn inv(a: u8) -> u8 {
    // a^254 = a^(2+4+8+16+32+64+128)
    let mut result = 1u8;
    let mut square = a;
    for _ in 1..8 {
        square = mul(square, square);
        result = mul(result, square);
    }
    result
}

/// Divide `a` by `b`. Panics if `b` is zero.
pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(256)");
    mul(a, inv(b))
}

/// Evaluate a polynomial at `x` with Horner's rule.
/// `coefficients[0]` is the constant term.
pub fn poly_eval(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &coef| add(mul(acc, x), coef))
}

/// Lagrange interpolation at x = 0 over the given `(x, y)` points.
///
/// The x coordinates must be distinct and non-zero.
pub fn interpolate_at_zero(points: &[(u8, u8)]) -> u8 {
    let mut value = 0u8;
    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, &(xj, _)) in points.iter().enumerate() {
            if i != j {
                // (0 - xj) == xj in characteristic 2
                numerator = mul(numerator, xj);
                denominator = mul(denominator, sub(xi, xj));
            }
        }
        value = add(value, mul(yi, div(numerator, denominator)));
    }
    value
}
