/// Offset between the Kelvin and Celsius scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert a Kelvin temperature into `(celsius, fahrenheit)`.
///
/// No rounding happens here; callers round when displaying.
pub fn to_celsius_and_fahrenheit(kelvin: f64) -> (f64, f64) {
    let celsius = kelvin - KELVIN_OFFSET;
    let fahrenheit = celsius * (9.0 / 5.0) + 32.0;
    (celsius, fahrenheit)
}
