/// Reference triangle that every facet is affinely mapped onto, as (x1, y1, x2, y2, x3, y3).
/// The analytic spectra in `analytic` are derived for this triangle only.
pub const REFERENCE_TRIANGLE: [f64; 6] = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
/// Gain applied to the normal-illumination cosine in flat shading.
pub const FLAT_SHADING_GAIN: f64 = 2.0;
/// Ambient offset added to the flat shading factor before clamping.
pub const FLAT_SHADING_OFFSET: f64 = 0.3;
/// Offset added to each vertex illumination value in continuous shading, keeps the
/// interpolated reflectance away from zero.
pub const VERTEX_SHADING_OFFSET: f64 = 0.1;
/// Facet contributions with modulus at or below this are dropped before accumulation.
pub const NEGLIGIBLE_AMPLITUDE: f64 = f64::MIN_POSITIVE;
/// Minimum |field lens| for the viewing window transform. Normalised vertices lie in [-0.5, 0.5].
pub const MIN_FIELD_LENS: f64 = 0.5;
