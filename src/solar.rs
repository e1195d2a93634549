//! Sunrise/sunset arithmetic for the solar-relative saving filters.
//!
//! Implements the NOAA solar position approximation. Accurate to a couple of
//! minutes, which is plenty for deciding whether a recording sits near dawn
//! or dusk. Longitude is positive east; times are UTC.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Sunrise and sunset for a date and location, or None during polar day and
/// polar night when the sun never crosses the horizon.
pub fn sun_times(date: NaiveDate, latitude: f64, longitude: f64) -> Option<SunTimes> {
    // Fractional year at solar noon, radians.
    let day_of_year = f64::from(date.ordinal());
    let gamma = 2.0 * PI / 365.0 * (day_of_year - 1.0 + 0.5);

    // Equation of time (minutes) and solar declination (radians).
    let eqtime = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // Hour angle for the official zenith of 90.833 degrees (accounts for
    // refraction and the solar disc radius).
    let lat = latitude.to_radians();
    let zenith = 90.833_f64.to_radians();
    let cos_ha = zenith.cos() / (lat.cos() * decl.cos()) - lat.tan() * decl.tan();
    if !(-1.0..=1.0).contains(&cos_ha) {
        return None;
    }
    let ha_deg = cos_ha.acos().to_degrees();

    let sunrise_minutes = 720.0 - 4.0 * (longitude + ha_deg) - eqtime;
    let sunset_minutes = 720.0 - 4.0 * (longitude - ha_deg) - eqtime;

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(SunTimes {
        sunrise: midnight + Duration::seconds((sunrise_minutes * 60.0).round() as i64),
        sunset: midnight + Duration::seconds((sunset_minutes * 60.0).round() as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn equator_sun_rises_and_sets_around_six() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let times = sun_times(date, 0.0, 0.0).unwrap();
        // Within +/- 20 minutes of 06:00 / 18:00 UTC at the equinox.
        let sunrise_minutes = times.sunrise.hour() * 60 + times.sunrise.minute();
        let sunset_minutes = times.sunset.hour() * 60 + times.sunset.minute();
        assert!((340..=380).contains(&sunrise_minutes), "{sunrise_minutes}");
        assert!((1060..=1100).contains(&sunset_minutes), "{sunset_minutes}");
    }

    #[test]
    fn london_summer_sunrise_is_early() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(date, 51.5, -0.13).unwrap();
        // Around 03:43 UTC; allow a few minutes of slack.
        assert_eq!(times.sunrise.hour(), 3);
        assert!(times.sunset.hour() >= 20);
    }

    #[test]
    fn polar_night_has_no_sunrise() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(sun_times(date, 78.0, 15.6).is_none());
    }

    #[test]
    fn polar_day_has_no_sunset() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert!(sun_times(date, 78.0, 15.6).is_none());
    }
}
