//! Context classification rules for playlist recommendations.
//!
//! Maps a [`DriveContext`] to a priority-ordered list of categories. The
//! classifier knows nothing about catalog contents, so rules and catalogs
//! can change independently.

use crate::catalog::Category;
use crate::context::DriveContext;
use log::debug;
use std::fmt;

/// Speeds strictly above this (km/h) trigger the focus rule.
pub const HIGH_SPEED_KMH: u32 = 90;

/// Morning window `[start, end)`.
pub const MORNING_HOURS: (u8, u8) = (5, 12);

/// Night starts at this hour and lasts until the morning start.
pub const NIGHT_START_HOUR: u8 = 20;

/// The classification branch that fired. Exactly one rule matches any
/// context; they are evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Fast driving: rhythmic, energizing music.
    HighSpeedFocus,
    /// Fair-weather morning: gentle wake-up.
    MorningMild,
    /// Night drive: relaxation.
    NightRelax,
    /// Daytime rain or snow.
    CozyWeather,
    /// Daytime, moderate speed, fair weather.
    Standard,
}

impl Rule {
    /// Evaluation order.
    pub const ORDERED: [Rule; 5] = [
        Rule::HighSpeedFocus,
        Rule::MorningMild,
        Rule::NightRelax,
        Rule::CozyWeather,
        Rule::Standard,
    ];

    /// First rule whose guard matches `context`.
    ///
    /// # Examples
    ///
    /// ```
    /// use adaptive_drive::classifier::Rule;
    /// use adaptive_drive::context::{DriveContext, Weather};
    ///
    /// let ctx = DriveContext::new(95, 14, Weather::Clear)?;
    /// assert_eq!(Rule::matching(&ctx), Rule::HighSpeedFocus);
    /// # Ok::<(), adaptive_drive::error::ContextError>(())
    /// ```
    #[must_use]
    pub fn matching(context: &DriveContext) -> Rule {
        Self::ORDERED
            .into_iter()
            .find(|rule| rule.guard(context))
            .unwrap_or(Rule::Standard)
    }

    /// Guard for this rule in isolation. Earlier rules are not consulted.
    #[must_use]
    pub const fn guard(self, context: &DriveContext) -> bool {
        let hour = context.time_of_day();
        match self {
            Rule::HighSpeedFocus => context.speed() > HIGH_SPEED_KMH,
            Rule::MorningMild => {
                hour >= MORNING_HOURS.0 && hour < MORNING_HOURS.1 && context.weather().is_fair()
            }
            Rule::NightRelax => hour >= NIGHT_START_HOUR || hour < MORNING_HOURS.0,
            Rule::CozyWeather => context.weather().is_wet(),
            Rule::Standard => true,
        }
    }

    /// Preferred categories, highest priority first.
    #[must_use]
    pub fn categories(self) -> Vec<Category> {
        match self {
            Rule::HighSpeedFocus => vec![Category::Rock, Category::Electro, Category::Pop],
            Rule::MorningMild => vec![Category::Acoustic, Category::Chill, Category::Pop],
            Rule::NightRelax => vec![Category::Jazz, Category::Chill, Category::Slow],
            Rule::CozyWeather => vec![Category::Chill, Category::Jazz, Category::Acoustic],
            Rule::Standard => vec![Category::Pop, Category::Rock, Category::Electro],
        }
    }

    /// Stable label for status displays.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Rule::HighSpeedFocus => "HIGH_SPEED_FOCUS",
            Rule::MorningMild => "MORNING_MILD",
            Rule::NightRelax => "NIGHT_RELAX",
            Rule::CozyWeather => "COZY_WEATHER",
            Rule::Standard => "STANDARD",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a context into an ordered, non-empty category list.
///
/// Pure and deterministic: identical contexts yield identical lists.
///
/// # Examples
///
/// ```
/// use adaptive_drive::catalog::Category;
/// use adaptive_drive::classifier::classify;
/// use adaptive_drive::context::{DriveContext, Weather};
///
/// let ctx = DriveContext::new(40, 22, Weather::Clear)?;
/// assert_eq!(classify(&ctx), vec![Category::Jazz, Category::Chill, Category::Slow]);
/// # Ok::<(), adaptive_drive::error::ContextError>(())
/// ```
#[must_use]
pub fn classify(context: &DriveContext) -> Vec<Category> {
    let rule = Rule::matching(context);
    debug!("Analyzing context [{context}] -> rule {rule}");
    rule.categories()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Weather;

    fn ctx(speed: u32, hour: u8, weather: Weather) -> DriveContext {
        DriveContext::new(speed, hour, weather).unwrap()
    }

    #[test]
    fn test_high_speed_overrides_everything() {
        for hour in 0..24 {
            for weather in Weather::ALL {
                assert_eq!(
                    classify(&ctx(91, hour, weather)),
                    vec![Category::Rock, Category::Electro, Category::Pop],
                    "hour {hour}, {weather}"
                );
            }
        }
    }

    #[test]
    fn test_speed_ninety_falls_through() {
        assert_eq!(Rule::matching(&ctx(90, 14, Weather::Clear)), Rule::Standard);
        assert_eq!(Rule::matching(&ctx(90, 22, Weather::Clear)), Rule::NightRelax);
    }

    #[test]
    fn test_hour_boundaries() {
        // 5 is daytime
        assert_eq!(Rule::matching(&ctx(40, 5, Weather::Clear)), Rule::MorningMild);
        assert_eq!(Rule::matching(&ctx(40, 4, Weather::Clear)), Rule::NightRelax);
        // 12 leaves the morning window
        assert_eq!(Rule::matching(&ctx(40, 12, Weather::Clear)), Rule::Standard);
        // 20 is night
        assert_eq!(Rule::matching(&ctx(40, 19, Weather::Clear)), Rule::Standard);
        assert_eq!(Rule::matching(&ctx(40, 20, Weather::Clear)), Rule::NightRelax);
    }

    #[test]
    fn test_wet_morning_is_cozy_not_mild() {
        assert_eq!(Rule::matching(&ctx(40, 8, Weather::Rain)), Rule::CozyWeather);
        assert_eq!(Rule::matching(&ctx(40, 8, Weather::Snow)), Rule::CozyWeather);
        assert_eq!(Rule::matching(&ctx(40, 8, Weather::Cloudy)), Rule::MorningMild);
    }

    #[test]
    fn test_wet_night_is_night() {
        assert_eq!(Rule::matching(&ctx(40, 23, Weather::Rain)), Rule::NightRelax);
    }

    #[test]
    fn test_scenarios() {
        assert_eq!(
            classify(&ctx(40, 22, Weather::Clear)),
            vec![Category::Jazz, Category::Chill, Category::Slow]
        );
        assert_eq!(
            classify(&ctx(40, 14, Weather::Rain)),
            vec![Category::Chill, Category::Jazz, Category::Acoustic]
        );
        assert_eq!(
            classify(&ctx(40, 14, Weather::Cloudy)),
            vec![Category::Pop, Category::Rock, Category::Electro]
        );
    }

    #[test]
    fn test_classification_is_deterministic_and_non_empty() {
        for speed in [0, 45, 90, 91, 180] {
            for hour in 0..24 {
                for weather in Weather::ALL {
                    let context = ctx(speed, hour, weather);
                    let first = classify(&context);
                    assert!(!first.is_empty());
                    assert_eq!(first, classify(&context));
                }
            }
        }
    }

    #[test]
    fn test_exactly_one_rule_fires_first() {
        // The matching rule is the first guard that holds, and every
        // earlier guard is false.
        for hour in 0..24 {
            for weather in Weather::ALL {
                let context = ctx(60, hour, weather);
                let rule = Rule::matching(&context);
                let position = Rule::ORDERED.iter().position(|r| *r == rule).unwrap();
                assert!(Rule::ORDERED[..position].iter().all(|r| !r.guard(&context)));
            }
        }
    }

    #[test]
    fn test_rule_labels() {
        assert_eq!(Rule::HighSpeedFocus.to_string(), "HIGH_SPEED_FOCUS");
        assert_eq!(Rule::NightRelax.label(), "NIGHT_RELAX");
    }
}
