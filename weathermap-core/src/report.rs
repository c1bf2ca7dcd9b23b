use crate::{
    model::{Place, WeatherReading},
    units::to_celsius_and_fahrenheit,
};

/// Human-readable weather report for a place, one fact per line.
///
/// Wind and sunrise/sunset lines only appear when the provider sent them.
pub fn render(place: &Place, reading: &WeatherReading) -> String {
    let location = place.label();
    let (temp_c, temp_f) = to_celsius_and_fahrenheit(reading.temperature_k);
    let (feels_c, _) = to_celsius_and_fahrenheit(reading.feels_like_k);

    let mut lines = vec![
        format!(
            "Temperature in {location}: {temp_c:.2} degrees Celsius or {temp_f:.2} degrees Fahrenheit."
        ),
        format!("Temperature in {location} feels like: {feels_c:.2} degrees Celsius."),
        format!("Humidity in {location}: {}%", reading.humidity_pct),
    ];

    if let Some(speed) = reading.wind_speed_mps {
        lines.push(format!("Wind Speed in {location}: {speed} m/s"));
    }

    lines.push(format!("General Weather in {location}: {}", reading.description));

    if let Some(sunrise) = reading.sunrise {
        lines.push(format!("Sun rises in {location} at {sunrise} local time."));
    }
    if let Some(sunset) = reading.sunset {
        lines.push(format!("Sun sets in {location} at {sunset} local time."));
    }

    lines.join("\n")
}
