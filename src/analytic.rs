//! Closed-form Fourier transforms over the reference triangle.
//!
//! The reference triangle is `0 <= y <= x <= 1`, so every transform is
//!
//! ```text
//! D(u, v) = ∫₀¹ ∫₀ˣ w(x, y) exp(-i 2π (u x + v y)) dy dx
//! ```
//!
//! with `w = 1` (D3), `w = x` (D1) or `w = y` (D2). Integrating over `y` first
//! reduces each of them to the one-dimensional edge integrals
//! `E_k(t) = ∫₀¹ xᵏ exp(-i t x) dx`. The general expressions divide by `v` (and
//! by `u` or `u + v` through the edge integrals), so the lines `v = 0`, `u = 0`,
//! `u = -v` and the origin each get their own limiting form.
//!
//! Dividing by `v` (D2 divides by `v²`) loses every digit once `|v|` is small, so
//! near `v = 0` the cases that divide by it are expanded in `v` instead:
//!
//! ```text
//! D = Σₙ (-i 2π v)ⁿ / (n! (n + m + 1)) E_{n+p}(2π u)
//! ```
//!
//! with `(m, p) = (0, 1)` for D3, `(0, 2)` for D1 and `(1, 2)` for D2.

use std::f64::consts::PI;

use nalgebra::Vector3;
use ndarray::Array2;
use num_complex::Complex64;

use crate::config::{FLAT_SHADING_GAIN, FLAT_SHADING_OFFSET, VERTEX_SHADING_OFFSET};
use crate::frequency::LocalFrequencies;


/// Which closed form applies at a pair of frequency terms. Tested in declaration
/// order, the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateCase {
    /// `u = -v`, `v != 0`
    OppositeTerms,
    /// `u = v = 0`
    Origin,
    /// `u != 0`, `v = 0`
    ZeroV,
    /// `u = 0`, `v != 0`
    ZeroU,
    General,
}

pub fn classify(u: f64, v: f64) -> DegenerateCase {
    if u == -v && v != 0.0 {
        DegenerateCase::OppositeTerms
    } else if u == v && u == 0.0 {
        DegenerateCase::Origin
    } else if u != 0.0 && v == 0.0 {
        DegenerateCase::ZeroV
    } else if u == 0.0 && v != 0.0 {
        DegenerateCase::ZeroU
    } else {
        DegenerateCase::General
    }
}

/// Below this |t| the edge integrals are summed as a power series.
const SERIES_LIMIT: f64 = 0.5;
const SERIES_TERMS: usize = 20;
/// Extra orders the downward recurrence starts above the highest one needed.
const RECURRENCE_PADDING: usize = 60;

/// `E_k(t) = ∫₀¹ xᵏ exp(-i t x) dx`.
fn edge_integral(k: u32, t: f64) -> Complex64 {
    if t.abs() < SERIES_LIMIT {
        // Σ (-i t)ⁿ / (n! (n + k + 1)), the closed forms cancel catastrophically here
        let step = Complex64::new(0.0, -t);
        let mut term = Complex64::new(1.0, 0.0);
        let mut sum = Complex64::new(0.0, 0.0);
        for n in 0..SERIES_TERMS {
            sum += term / (n as f64 + k as f64 + 1.0);
            term = term * step / (n as f64 + 1.0);
        }
        sum
    } else {
        closed_edge_integral(k, t)
    }
}

/// Closed forms for k = 0, 1, 2.
fn closed_edge_integral(k: u32, t: f64) -> Complex64 {
    let i = Complex64::i();
    let e = Complex64::from_polar(1.0, -t);
    let e0 = (1.0 - e) / (i * t);
    if k == 0 {
        return e0;
    }
    let e1 = i * e / t + (e - 1.0) / (t * t);
    if k == 1 {
        return e1;
    }
    i * e / t - 2.0 * i * e1 / t
}

/// `E_0(t) .. E_{count-1}(t)`.
///
/// Integration by parts gives `E_k = i (e^{-it} - k E_{k-1}) / t`. Run upwards it
/// amplifies errors by `k / |t|` per step, so it is only used for `k <= |t|`; the
/// higher orders come from the same relation run downwards from well above `count`.
fn edge_integrals(t: f64, count: usize) -> Vec<Complex64> {
    if t.abs() < SERIES_LIMIT {
        return (0..count).map(|k| edge_integral(k as u32, t)).collect();
    }
    let i = Complex64::i();
    let e = Complex64::from_polar(1.0, -t);
    let mut values = vec![Complex64::new(0.0, 0.0); count];

    let turn = (t.abs().floor() as usize + 1).min(count);
    let mut previous = (1.0 - e) / (i * t);
    for (k, value) in values.iter_mut().enumerate().take(turn) {
        if k > 0 {
            previous = i * (e - k as f64 * previous) / t;
        }
        *value = previous;
    }

    if turn < count {
        let mut next = Complex64::new(0.0, 0.0);
        for k in (turn + 1..=count + RECURRENCE_PADDING).rev() {
            // E_{k-1} from E_k
            next = (e + i * t * next) / k as f64;
            if k - 1 < count {
                values[k - 1] = next;
            }
        }
    }
    values
}

/// All three moments as a power series in `b = 2πv`, for `|b| < SERIES_LIMIT`.
fn moments_near_zero_v(a: f64, b: f64) -> Moments {
    let orders = edge_integrals(a, SERIES_TERMS + 2);
    let step = Complex64::new(0.0, -b);
    let mut term = Complex64::new(1.0, 0.0);
    let mut moments = Moments::default();
    for n in 0..SERIES_TERMS {
        let n1 = n as f64 + 1.0;
        moments.d3 += term * orders[n + 1] / n1;
        moments.d1 += term * orders[n + 2] / n1;
        moments.d2 += term * orders[n + 2] / (n1 + 1.0);
        term = term * step / n1;
    }
    moments
}

/// Fourier transform of the reference triangle's indicator (D3).
pub fn triangle_transform(u: f64, v: f64) -> Complex64 {
    let (a, b) = (2.0 * PI * u, 2.0 * PI * v);
    let ib = Complex64::new(0.0, b);
    let near_zero_v = b.abs() < SERIES_LIMIT;
    match classify(u, v) {
        DegenerateCase::Origin => Complex64::new(0.5, 0.0),
        DegenerateCase::ZeroV => edge_integral(1, a),
        _ if near_zero_v => moments_near_zero_v(a, b).d3,
        DegenerateCase::OppositeTerms => (edge_integral(0, a) - 1.0) / ib,
        DegenerateCase::ZeroU => (1.0 - edge_integral(0, b)) / ib,
        DegenerateCase::General => (edge_integral(0, a) - edge_integral(0, a + b)) / ib,
    }
}

/// First moments of the reference triangle transform, weighted by x (D1), by y (D2)
/// and unweighted (D3).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub d1: Complex64,
    pub d2: Complex64,
    pub d3: Complex64,
}

pub fn triangle_moments(u: f64, v: f64) -> Moments {
    let (a, b) = (2.0 * PI * u, 2.0 * PI * v);
    let ib = Complex64::new(0.0, b);
    let case = classify(u, v);
    let divides_by_v = !matches!(case, DegenerateCase::Origin | DegenerateCase::ZeroV);
    if divides_by_v && b.abs() < SERIES_LIMIT {
        return moments_near_zero_v(a, b);
    }
    let d3 = triangle_transform(u, v);
    let (d1, d2) = match case {
        DegenerateCase::OppositeTerms => {
            let d1 = (edge_integral(1, a) - 0.5) / ib;
            let d2 = -0.5 / ib - (edge_integral(0, a) - 1.0) / (b * b);
            (d1, d2)
        }
        DegenerateCase::Origin => (Complex64::new(1.0 / 3.0, 0.0), Complex64::new(1.0 / 6.0, 0.0)),
        DegenerateCase::ZeroV => {
            let e2 = edge_integral(2, a);
            (e2, e2 / 2.0)
        }
        DegenerateCase::ZeroU => {
            let e1 = edge_integral(1, b);
            let d1 = (0.5 - e1) / ib;
            let d2 = -e1 / ib - (1.0 - edge_integral(0, b)) / (b * b);
            (d1, d2)
        }
        DegenerateCase::General => {
            let s = a + b;
            let e1s = edge_integral(1, s);
            let d1 = (edge_integral(1, a) - e1s) / ib;
            let d2 = -e1s / ib - (edge_integral(0, a) - edge_integral(0, s)) / (b * b);
            (d1, d2)
        }
    };
    Moments { d1, d2, d3 }
}

/// Flat shading factor for a unit normal `n` and illumination direction `light`.
/// The zero vector disables shading.
pub fn shading_factor(n: &Vector3<f64>, light: &Vector3<f64>) -> f64 {
    match light.try_normalize(0.0) {
        None => 1.0,
        Some(l) => (FLAT_SHADING_GAIN * n.dot(&l) + FLAT_SHADING_OFFSET).max(0.0),
    }
}

/// Reflectance of a facet over the reference triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FacetShading {
    /// Constant reflectance.
    Flat(f64),
    /// Linear reflectance through the vertex values (av0, av1, av2) at (0,0), (1,0), (1,1).
    Continuous([f64; 3]),
}

impl FacetShading {
    pub fn flat(unit_normal: &Vector3<f64>, light: &Vector3<f64>) -> Self {
        FacetShading::Flat(shading_factor(unit_normal, light))
    }

    /// Takes the averaged normals of V1, V2, V3. V3 lands on (1, 0) and V2 on (1, 1)
    /// of the reference triangle. `light` is used unnormalised.
    pub fn continuous(vertex_normals: &[Vector3<f64>; 3], light: &Vector3<f64>) -> Self {
        let av = |n: &Vector3<f64>| n.dot(light) + VERTEX_SHADING_OFFSET;
        FacetShading::Continuous([
            av(&vertex_normals[0]),
            av(&vertex_normals[2]),
            av(&vertex_normals[1]),
        ])
    }

    /// Reference-triangle spectrum at one pair of frequency terms.
    pub fn evaluate(&self, u: f64, v: f64) -> Complex64 {
        if !(u.is_finite() && v.is_finite()) {
            return Complex64::new(0.0, 0.0);
        }
        match *self {
            FacetShading::Flat(factor) => factor * triangle_transform(u, v),
            FacetShading::Continuous([av0, av1, av2]) => {
                let m = triangle_moments(u, v);
                (av1 - av0) * m.d1 + (av2 - av1) * m.d2 + av0 * m.d3
            }
        }
    }
}

/// Evaluates the facet's reference spectrum over the whole grid. Non-propagating
/// points are zero.
pub fn reference_spectrum(local: &LocalFrequencies, shading: &FacetShading) -> Array2<Complex64> {
    local.terms.map(|term| shading.evaluate(term.u, term.v))
}
