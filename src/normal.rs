//! The normal distribution's cumulative density.

use std::f64::consts::SQRT_2;

/// Complementary error function, accurate to about 1.2e-7 everywhere.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1. / (1. + 0.5 * z);
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = t * poly.exp();
    if x >= 0. {
        ans
    } else {
        2. - ans
    }
}

/// P(X ≤ x) for X ~ N(`mean`, `std_dev`²).
pub fn cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    0.5 * erfc(-(x - mean) / (std_dev * SQRT_2))
}
