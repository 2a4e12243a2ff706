//! Health levels and the per-parameter bands that map values onto them.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Comfortable,
    Uncomfortable,
    Dangerous,
    Unknown,
}

/// Worst first. Levels not listed (only `Unknown`) never drive the overall result.
const PRIORITY: [Level; 9] = [
    Level::Hazardous,
    Level::VeryUnhealthy,
    Level::Unhealthy,
    Level::UnhealthySensitive,
    Level::Uncomfortable,
    Level::Dangerous,
    Level::Moderate,
    Level::Good,
    Level::Comfortable,
];

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Good => "good",
            Level::Moderate => "moderate",
            Level::UnhealthySensitive => "unhealthy_sensitive",
            Level::Unhealthy => "unhealthy",
            Level::VeryUnhealthy => "very_unhealthy",
            Level::Hazardous => "hazardous",
            Level::Comfortable => "comfortable",
            Level::Uncomfortable => "uncomfortable",
            Level::Dangerous => "dangerous",
            Level::Unknown => "unknown",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Level::Good | Level::Comfortable => "#00E400",
            Level::Moderate => "#FFFF00",
            Level::UnhealthySensitive | Level::Uncomfortable => "#FF7E00",
            Level::Unhealthy | Level::Dangerous => "#FF0000",
            Level::VeryUnhealthy => "#8F3F97",
            Level::Hazardous => "#7E0023",
            Level::Unknown => "#666666",
        }
    }

    pub fn health_message(self) -> &'static str {
        match self {
            Level::Good => "Air quality is satisfactory with little to no risk.",
            Level::Moderate => {
                "Acceptable air quality, but sensitive groups may experience minor effects."
            }
            Level::UnhealthySensitive => {
                "Members of sensitive groups may experience health effects."
            }
            Level::Unhealthy => "Everyone may begin to experience health effects.",
            Level::VeryUnhealthy => {
                "Health alert: everyone may experience more serious health effects."
            }
            Level::Hazardous => "Health warning of emergency conditions.",
            Level::Comfortable => "Conditions are comfortable and ideal.",
            Level::Uncomfortable => "Conditions may cause discomfort for some people.",
            Level::Dangerous => "Conditions pose health risks, take precautions.",
            Level::Unknown => "Air quality assessment completed",
        }
    }

    /// Position in the worst-first ordering; lower is worse.
    pub fn severity_rank(self) -> Option<usize> {
        PRIORITY.iter().position(|l| *l == self)
    }

    /// Levels that warrant a parameter-specific recommendation.
    pub fn is_severe(self) -> bool {
        matches!(
            self,
            Level::Unhealthy | Level::VeryUnhealthy | Level::Hazardous | Level::Dangerous
        )
    }
}

/// A closed range of values mapped to a level.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub level: Level,
    pub min: f64,
    pub max: f64,
}

const fn band(level: Level, min: f64, max: f64) -> Band {
    Band { level, min, max }
}

const FINE_PARTICLES: [Band; 6] = [
    band(Level::Good, 0.0, 12.0),
    band(Level::Moderate, 12.1, 35.4),
    band(Level::UnhealthySensitive, 35.5, 55.4),
    band(Level::Unhealthy, 55.5, 150.4),
    band(Level::VeryUnhealthy, 150.5, 250.4),
    band(Level::Hazardous, 250.5, 500.4),
];

const PM10: [Band; 6] = [
    band(Level::Good, 0.0, 54.0),
    band(Level::Moderate, 55.0, 154.0),
    band(Level::UnhealthySensitive, 155.0, 254.0),
    band(Level::Unhealthy, 255.0, 354.0),
    band(Level::VeryUnhealthy, 355.0, 424.0),
    band(Level::Hazardous, 425.0, 604.0),
];

const TEMPERATURE: [Band; 4] = [
    band(Level::Comfortable, 18.0, 26.0),
    band(Level::Moderate, 26.1, 30.0),
    band(Level::Uncomfortable, 30.1, 35.0),
    band(Level::Dangerous, 35.1, 50.0),
];

const RELATIVE_HUMIDITY: [Band; 4] = [
    band(Level::Comfortable, 30.0, 60.0),
    band(Level::Moderate, 60.1, 70.0),
    band(Level::Uncomfortable, 70.1, 85.0),
    band(Level::Dangerous, 85.1, 100.0),
];

const ULTRAFINE: [Band; 6] = [
    band(Level::Good, 0.0, 1000.0),
    band(Level::Moderate, 1001.0, 5000.0),
    band(Level::UnhealthySensitive, 5001.0, 10000.0),
    band(Level::Unhealthy, 10001.0, 20000.0),
    band(Level::VeryUnhealthy, 20001.0, 50000.0),
    band(Level::Hazardous, 50001.0, 100000.0),
];

pub const PARTICULATE_PARAMETERS: [&str; 4] = ["pm25", "pm10", "pm1", "um003"];
pub const COMFORT_PARAMETERS: [&str; 2] = ["temperature", "relativehumidity"];

/// Lowercase, drop spaces and underscores, then resolve aliases.
pub fn canonical_parameter(name: &str) -> String {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect();
    match normalized.as_str() {
        "rh" | "humidity" => "relativehumidity".to_string(),
        "temp" => "temperature".to_string(),
        "ultrafine" | "particles" => "um003".to_string(),
        _ => normalized,
    }
}

/// Bands for a canonical parameter name.
pub fn bands_for(parameter: &str) -> Option<&'static [Band]> {
    match parameter {
        "pm25" | "pm1" => Some(&FINE_PARTICLES),
        "pm10" => Some(&PM10),
        "temperature" => Some(&TEMPERATURE),
        "relativehumidity" => Some(&RELATIVE_HUMIDITY),
        "um003" => Some(&ULTRAFINE),
        _ => None,
    }
}

/// The level for `value`, or `None` when it lies outside every band.
///
/// Values in the gap between two bands belong to the upper one.
pub fn classify(bands: &[Band], value: f64) -> Option<Level> {
    let first = bands.first()?;
    if value.is_nan() || value < first.min {
        return None;
    }
    bands.iter().find(|b| value <= b.max).map(|b| b.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let pm25 = bands_for("pm25").unwrap();
        assert_eq!(classify(pm25, 0.0), Some(Level::Good));
        assert_eq!(classify(pm25, 12.0), Some(Level::Good));
        assert_eq!(classify(pm25, 12.05), Some(Level::Moderate));
        assert_eq!(classify(pm25, 35.4), Some(Level::Moderate));
        assert_eq!(classify(pm25, 35.45), Some(Level::UnhealthySensitive));
        assert_eq!(classify(pm25, 500.4), Some(Level::Hazardous));
        assert_eq!(classify(pm25, 500.5), None);
        assert_eq!(classify(pm25, -1.0), None);

        let pm10 = bands_for("pm10").unwrap();
        assert_eq!(classify(pm10, 54.5), Some(Level::Moderate));

        let temperature = bands_for("temperature").unwrap();
        assert_eq!(classify(temperature, 17.9), None);
        assert_eq!(classify(temperature, 35.05), Some(Level::Dangerous));
    }

    #[test]
    fn test_canonical_parameter() {
        assert_eq!(canonical_parameter("PM 25"), "pm25");
        assert_eq!(canonical_parameter("relative_humidity"), "relativehumidity");
        assert_eq!(canonical_parameter("RH"), "relativehumidity");
        assert_eq!(canonical_parameter("Temp"), "temperature");
        assert_eq!(canonical_parameter("particles"), "um003");
        assert_eq!(canonical_parameter("no2"), "no2");
    }

    #[test]
    fn test_severity_order() {
        assert!(Level::Hazardous.severity_rank() < Level::Moderate.severity_rank());
        assert!(Level::Good.severity_rank() < Level::Comfortable.severity_rank());
        assert_eq!(Level::Unknown.severity_rank(), None);
    }
}
