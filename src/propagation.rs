use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::FftPlanner;

#[cfg(test)]
mod tests {

    use super::*;
    use std::f64::consts::PI;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn shift_moves_origin_to_centre() {
        let data = Array2::from_shape_fn((5, 4), |(r, c)| Complex64::new((10 * r + c) as f64, 0.0));
        let shifted = fft_shift(&data);
        // element (0, 0) lands on (5/2, 4/2)
        assert_eq!(shifted[[2, 2]], data[[0, 0]]);
        assert_eq!(shifted[[0, 0]], data[[3, 2]]);
    }

    #[test]
    fn inverse_shift_undoes_shift() {
        for &(rows, cols) in [(4, 6), (5, 7), (3, 8)].iter() {
            let data = Array2::from_shape_fn((rows, cols), |(r, c)| Complex64::new(r as f64, c as f64));
            assert_eq!(ifft_shift(&fft_shift(&data)), data);
            assert_eq!(fft_shift(&ifft_shift(&data)), data);
        }
    }

    #[test]
    fn centred_impulse_gives_flat_field() {
        let mut spectrum = Array2::zeros((8, 8));
        spectrum[[4, 4]] = Complex64::new(2.0, 0.0);
        let field = propagate(&spectrum);
        assert!(field.iter().all(|&v| close(v, Complex64::new(2.0, 0.0))));
    }

    #[test]
    fn inverse_transform_is_unnormalised() {
        let mut spectrum = Array2::zeros((4, 6));
        spectrum.fill(Complex64::new(1.0, 0.0));
        let field = propagate(&spectrum);
        // all the energy collects at the centre, scaled by the point count
        assert!(close(field[[2, 3]], Complex64::new(24.0, 0.0)));
        assert!(close(field[[0, 0]], Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn plane_wave_orientation() {
        // one step of positive fx and positive fy from the centre
        let (n, m) = (8, 8);
        let mut spectrum = Array2::zeros((m, n));
        spectrum[[m / 2 - 1, n / 2 + 1]] = Complex64::new(1.0, 0.0);
        let field = propagate(&spectrum);
        for ((row, col), value) in field.indexed_iter() {
            let x = col as f64 - (n / 2) as f64;
            let y = (m / 2) as f64 - row as f64;
            let expected = Complex64::from_polar(1.0, 2.0 * PI * (x / n as f64 + y / m as f64));
            assert!(close(*value, expected), "({}, {}): {} vs {}", row, col, value, expected);
        }
    }
}

/// Moves the zero-index element of each axis to index `N / 2`.
pub fn fft_shift(data: &Array2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        data[[(r + rows - rows / 2) % rows, (c + cols - cols / 2) % cols]]
    })
}

/// Inverse of [`fft_shift`], moves index `N / 2` of each axis back to zero.
pub fn ifft_shift(data: &Array2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        data[[(r + rows / 2) % rows, (c + cols / 2) % cols]]
    })
}

/// Propagates a centred angular spectrum to the hologram plane:
/// `fft_shift(IDFT(ifft_shift(spectrum)))`, unnormalised.
pub fn propagate(spectrum: &Array2<Complex64>) -> Array2<Complex64> {
    let mut planner = FftPlanner::new();
    let rows_done = inverse_fft_rows(ifft_shift(spectrum).view(), &mut planner);
    let cols_done = inverse_fft_rows(rows_done.t(), &mut planner);
    fft_shift(&cols_done.reversed_axes())
}

/// Unnormalised inverse DFT along the last axis, rows transformed in parallel.
fn inverse_fft_rows(data: ArrayView2<Complex64>, planner: &mut FftPlanner<f64>) -> Array2<Complex64> {
    let (rows, cols) = data.dim();
    let fft = planner.plan_fft_inverse(cols);
    let mut buffer: Vec<Complex64> = data.iter().copied().collect();
    buffer.par_chunks_mut(cols).for_each(|row| fft.process(row));
    Array2::from_shape_fn((rows, cols), |(r, c)| buffer[r * cols + c])
}
