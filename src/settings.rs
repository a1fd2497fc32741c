//! # settings.rs
//!
//! Calculation settings shared by every evaluation in an environment.

use crate::units::{AngleUnit, Unit};

/// Unit in which plain numbers are read by circular functions, and in which
/// inverse circular functions report their result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    Degree,
    #[default]
    Radian,
    Gradian,
}

impl AngleMode {
    /// Returns the angle unit of the mode.
    pub fn unit(&self) -> AngleUnit {
        match self {
            Self::Degree => AngleUnit::Degree,
            Self::Radian => AngleUnit::Radian,
            Self::Gradian => AngleUnit::Gradian,
        }
    }
}

impl From<AngleUnit> for AngleMode {
    fn from(unit: AngleUnit) -> Self {
        match unit {
            AngleUnit::Degree => Self::Degree,
            AngleUnit::Radian => Self::Radian,
            AngleUnit::Gradian => Self::Gradian,
        }
    }
}

impl std::str::FromStr for AngleMode {
    type Err = String;

    /// Accepts every spelling of the angle units, e.g. `deg`, `radians`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Unit::from_name(&s.to_lowercase()) {
            Some(Unit::Angle(unit)) => Ok(unit.into()),
            _ => Err(format!("unknown angle mode '{}'", s)),
        }
    }
}

/// Settings of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub angle_mode: AngleMode,
}

impl Settings {
    pub fn with_angle_mode(mut self, angle_mode: AngleMode) -> Self {
        self.angle_mode = angle_mode;
        self
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_is_radian() {
        assert_eq!(Settings::default().angle_mode, AngleMode::Radian);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(AngleMode::from_str("deg"), Ok(AngleMode::Degree));
        assert_eq!(AngleMode::from_str("Gradians"), Ok(AngleMode::Gradian));
        assert!(AngleMode::from_str("km").is_err());
    }
}
