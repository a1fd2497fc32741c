//! # units.rs
//!
//! Unit-tagged numeric values.
//!
//! A [`Quantity`] pairs a magnitude with a [`Unit`] of one [`Family`]
//! (angle, length, area, volume, mass, time, temperature, power).
//! Each unit carries a `factor` and an `offset` to the base unit of its family:
//!
//! ```text
//! base = (magnitude + offset) * factor
//! ```
//!
//! The offset is zero for every unit except the affine temperature scales.
//! Arithmetic between two quantities of the same family converts the right operand
//! into the unit of the left one, so the result always carries the left unit.

use crate::errors::ExecutionError;
use paste::paste;
use std::cmp::Ordering;

#[doc(hidden)]
/// Internal macro to define every unit family.
///
/// This macro is **not intended for public use**.
/// For each family it generates a `<Family>Unit` enum with `factor`, `offset` and
/// `name`, and it generates the [`Family`] and [`Unit`] enums tying them together.
/// The first name listed for a unit is its canonical spelling; the others are aliases
/// accepted as suffixes and by `convert`.
macro_rules! unit_families {
    ($( $family:ident {
        $( $unit:ident => { names: [$canonical:literal $(, $alias:literal)*], factor: $factor:expr, offset: $offset:expr } ),+ $(,)?
    } )+) => {
        paste! {
            /// A family of units that convert into each other.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum Family {
                $( $family ),+
            }

            impl std::fmt::Display for Family {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    let s = match self {
                        $( Self::$family => stringify!([<$family:lower>]), )+
                    };
                    write!(f, "{}", s)
                }
            }

            $(
                #[doc = concat!("Units of the ", stringify!($family), " family.")]
                #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
                pub enum [<$family Unit>] {
                    $( $unit ),+
                }

                impl [<$family Unit>] {
                    /// Every unit of the family.
                    pub const ALL: &'static [Self] = &[ $( Self::$unit ),+ ];

                    /// Multiplier into the base unit of the family.
                    pub fn factor(&self) -> f64 {
                        match self {
                            $( Self::$unit => $factor, )+
                        }
                    }

                    /// Shift applied before the factor.
                    pub fn offset(&self) -> f64 {
                        match self {
                            $( Self::$unit => $offset, )+
                        }
                    }

                    /// Canonical spelling of the unit.
                    pub fn name(&self) -> &'static str {
                        match self {
                            $( Self::$unit => $canonical, )+
                        }
                    }
                }
            )+

            /// A unit of any family.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum Unit {
                $( $family([<$family Unit>]) ),+
            }

            impl Unit {
                /// Looks a unit up by any of its spellings.
                pub fn from_name(name: &str) -> Option<Self> {
                    match name {
                        $( $(
                            $canonical $( | $alias )* => Some(Self::$family([<$family Unit>]::$unit)),
                        )+ )+
                        _ => None,
                    }
                }

                /// Returns the family of the unit.
                pub fn family(&self) -> Family {
                    match self {
                        $( Self::$family(_) => Family::$family, )+
                    }
                }

                pub fn factor(&self) -> f64 {
                    match self {
                        $( Self::$family(unit) => unit.factor(), )+
                    }
                }

                pub fn offset(&self) -> f64 {
                    match self {
                        $( Self::$family(unit) => unit.offset(), )+
                    }
                }

                pub fn name(&self) -> &'static str {
                    match self {
                        $( Self::$family(unit) => unit.name(), )+
                    }
                }

                /// Returns every unit of every family.
                pub fn all() -> Vec<Self> {
                    let mut units = Vec::new();
                    $( units.extend([<$family Unit>]::ALL.iter().map(|unit| Self::$family(*unit))); )+
                    units
                }
            }
        }
    };
}

unit_families! {
    Angle {
        Degree              => { names: ["deg", "degree", "degrees", "°"], factor: 1.0, offset: 0.0 },
        Radian              => { names: ["rad", "radian", "radians"], factor: 180.0 / std::f64::consts::PI, offset: 0.0 },
        Gradian             => { names: ["grad", "gradian", "gradians"], factor: 0.9, offset: 0.0 },
    }
    Length {
        Millimetre          => { names: ["mm"], factor: 1.0e-3, offset: 0.0 },
        Centimetre          => { names: ["cm"], factor: 1.0e-2, offset: 0.0 },
        Decimetre           => { names: ["dm"], factor: 0.1, offset: 0.0 },
        Metre               => { names: ["m"], factor: 1.0, offset: 0.0 },
        Kilometre           => { names: ["km"], factor: 1.0e3, offset: 0.0 },
        Inch                => { names: ["in"], factor: 0.0254, offset: 0.0 },
        Foot                => { names: ["ft"], factor: 0.3048, offset: 0.0 },
        Yard                => { names: ["yd"], factor: 0.9144, offset: 0.0 },
        Mile                => { names: ["mi"], factor: 1609.344, offset: 0.0 },
        NauticalMile        => { names: ["nmi"], factor: 1852.0, offset: 0.0 },
        AstronomicalUnit    => { names: ["au"], factor: 149_597_870_700.0, offset: 0.0 },
        LightYear           => { names: ["ly"], factor: 9_460_730_472_580_800.0, offset: 0.0 },
    }
    Area {
        SquareMillimetre    => { names: ["mm2"], factor: 1.0e-6, offset: 0.0 },
        SquareCentimetre    => { names: ["cm2"], factor: 1.0e-4, offset: 0.0 },
        SquareMetre         => { names: ["m2"], factor: 1.0, offset: 0.0 },
        SquareKilometre     => { names: ["km2"], factor: 1.0e6, offset: 0.0 },
        SquareInch          => { names: ["in2"], factor: 6.4516e-4, offset: 0.0 },
        SquareFoot          => { names: ["ft2"], factor: 0.09290304, offset: 0.0 },
        SquareYard          => { names: ["yd2"], factor: 0.83612736, offset: 0.0 },
        SquareMile          => { names: ["mi2"], factor: 2_589_988.110336, offset: 0.0 },
        Hectare             => { names: ["ha"], factor: 1.0e4, offset: 0.0 },
        Acre                => { names: ["ac"], factor: 4046.8564224, offset: 0.0 },
    }
    Volume {
        CubicCentimetre     => { names: ["cm3"], factor: 1.0e-6, offset: 0.0 },
        CubicMetre          => { names: ["m3"], factor: 1.0, offset: 0.0 },
        Litre               => { names: ["l"], factor: 1.0e-3, offset: 0.0 },
        CubicInch           => { names: ["in3"], factor: 1.6387064e-5, offset: 0.0 },
        CubicFoot           => { names: ["ft3"], factor: 0.028316846592, offset: 0.0 },
        CubicYard           => { names: ["yd3"], factor: 0.764554857984, offset: 0.0 },
        Gallon              => { names: ["gal"], factor: 3.785411784e-3, offset: 0.0 },
    }
    Mass {
        Milligram           => { names: ["mg"], factor: 1.0e-6, offset: 0.0 },
        Gram                => { names: ["g"], factor: 1.0e-3, offset: 0.0 },
        Kilogram            => { names: ["kg"], factor: 1.0, offset: 0.0 },
        Tonne               => { names: ["t"], factor: 1.0e3, offset: 0.0 },
        Ounce               => { names: ["oz"], factor: 0.028349523125, offset: 0.0 },
        Pound               => { names: ["lb"], factor: 0.45359237, offset: 0.0 },
    }
    Time {
        Nanosecond          => { names: ["ns"], factor: 1.0e-9, offset: 0.0 },
        Microsecond         => { names: ["us"], factor: 1.0e-6, offset: 0.0 },
        Millisecond         => { names: ["ms"], factor: 1.0e-3, offset: 0.0 },
        Second              => { names: ["s"], factor: 1.0, offset: 0.0 },
        Minute              => { names: ["min"], factor: 60.0, offset: 0.0 },
        Hour                => { names: ["h"], factor: 3600.0, offset: 0.0 },
        Day                 => { names: ["day"], factor: 86_400.0, offset: 0.0 },
        Week                => { names: ["week"], factor: 604_800.0, offset: 0.0 },
        Year                => { names: ["year"], factor: 31_557_600.0, offset: 0.0 },
    }
    Temperature {
        Kelvin              => { names: ["kelvin"], factor: 1.0, offset: 0.0 },
        Celsius             => { names: ["celsius"], factor: 1.0, offset: 273.15 },
        Fahrenheit          => { names: ["fahrenheit"], factor: 5.0 / 9.0, offset: 459.67 },
    }
    Power {
        Watt                => { names: ["w"], factor: 1.0, offset: 0.0 },
        Kilowatt            => { names: ["kw"], factor: 1.0e3, offset: 0.0 },
        Horsepower          => { names: ["hp"], factor: 745.69987158227022, offset: 0.0 },
    }
}

impl Unit {
    /// Base unit of the area family, the result of multiplying two lengths.
    pub const SQUARE_METRE: Self = Self::Area(AreaUnit::SquareMetre);

    /// Base unit of the volume family.
    pub const CUBIC_METRE: Self = Self::Volume(VolumeUnit::CubicMetre);

    /// Base unit of the length family.
    pub const METRE: Self = Self::Length(LengthUnit::Metre);
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A magnitude tagged with a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// Creates an angle.
    pub fn angle(magnitude: f64, unit: AngleUnit) -> Self {
        Self::new(magnitude, Unit::Angle(unit))
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn family(&self) -> Family {
        self.unit.family()
    }

    /// Returns the magnitude expressed in the base unit of the family.
    pub fn to_base(&self) -> f64 {
        (self.magnitude + self.unit.offset()) * self.unit.factor()
    }

    /// Creates a quantity in `unit` from a magnitude in the base unit of its family.
    pub fn from_base(base: f64, unit: Unit) -> Self {
        Self::new(base / unit.factor() - unit.offset(), unit)
    }

    /// Converts the quantity into `unit`.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::IncompatibleUnits`] if `unit` belongs to another family.
    pub fn to(&self, unit: Unit) -> Result<Self, ExecutionError> {
        if self.family() != unit.family() {
            return Err(ExecutionError::IncompatibleUnits {
                from: self.unit.name().to_string(),
                to: unit.name().to_string(),
            });
        }
        if self.unit == unit {
            return Ok(*self);
        }
        Ok(Self::from_base(self.to_base(), unit))
    }

    /// Returns the angle in radians, or `None` for a quantity of another family.
    pub fn to_radians(&self) -> Option<f64> {
        match self.unit {
            Unit::Angle(AngleUnit::Radian) => Some(self.magnitude),
            Unit::Angle(_) => Some(self.to_base().to_radians()),
            _ => None,
        }
    }

    /// Returns the same unit with another magnitude.
    pub fn with_magnitude(&self, magnitude: f64) -> Self {
        Self::new(magnitude, self.unit)
    }

    /// `self + rhs` in the unit of `self`.
    pub fn add(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        let rhs = rhs.to(self.unit)?;
        Ok(self.with_magnitude(self.magnitude + rhs.magnitude))
    }

    /// `self - rhs` in the unit of `self`.
    pub fn sub(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        let rhs = rhs.to(self.unit)?;
        Ok(self.with_magnitude(self.magnitude - rhs.magnitude))
    }

    /// `self % rhs` in the unit of `self`.
    pub fn rem(&self, rhs: &Self) -> Result<Self, ExecutionError> {
        let rhs = rhs.to(self.unit)?;
        Ok(self.with_magnitude(self.magnitude % rhs.magnitude))
    }

    /// Multiplies two quantities whose product is a quantity itself.
    ///
    /// Length × Length is an area and Area × Length a volume, both in base units.
    pub fn product(&self, rhs: &Self) -> Option<Self> {
        let unit = match (self.family(), rhs.family()) {
            (Family::Length, Family::Length) => Unit::SQUARE_METRE,
            (Family::Area, Family::Length) | (Family::Length, Family::Area) => Unit::CUBIC_METRE,
            _ => return None,
        };
        Some(Self::new(self.to_base() * rhs.to_base(), unit))
    }

    /// Divides two quantities whose quotient is a quantity of another family.
    pub fn quotient(&self, rhs: &Self) -> Option<Self> {
        let unit = match (self.family(), rhs.family()) {
            (Family::Area, Family::Length) | (Family::Volume, Family::Area) => Unit::METRE,
            (Family::Volume, Family::Length) => Unit::SQUARE_METRE,
            _ => return None,
        };
        Some(Self::new(self.to_base() / rhs.to_base(), unit))
    }

    /// Compares two quantities of the same family through their base values.
    pub fn compare(&self, rhs: &Self) -> Result<Option<Ordering>, ExecutionError> {
        if self.family() != rhs.family() {
            return Err(ExecutionError::IncompatibleUnits {
                from: rhs.unit.name().to_string(),
                to: self.unit.name().to_string(),
            });
        }
        Ok(self.to_base().partial_cmp(&rhs.to_base()))
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

#[cfg(test)]
mod units_tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_name_accepts_aliases() {
        assert_eq!(Unit::from_name("deg"), Some(Unit::Angle(AngleUnit::Degree)));
        assert_eq!(Unit::from_name("radians"), Some(Unit::Angle(AngleUnit::Radian)));
        assert_eq!(Unit::from_name("°"), Some(Unit::Angle(AngleUnit::Degree)));
        assert_eq!(Unit::from_name("km"), Some(Unit::Length(LengthUnit::Kilometre)));
        assert_eq!(Unit::from_name("furlong"), None);
    }

    #[test]
    fn test_conversion_uses_factors() {
        let q = Quantity::new(1.5, Unit::Length(LengthUnit::Kilometre));
        let m = q.to(Unit::METRE).unwrap();
        assert_abs_diff_eq!(m.magnitude(), 1500.0, epsilon=1.0e-12);

        let angle = Quantity::angle(180.0, AngleUnit::Degree);
        let rad = angle.to(Unit::Angle(AngleUnit::Radian)).unwrap();
        assert_abs_diff_eq!(rad.magnitude(), std::f64::consts::PI, epsilon=1.0e-12);
        let grad = angle.to(Unit::Angle(AngleUnit::Gradian)).unwrap();
        assert_abs_diff_eq!(grad.magnitude(), 200.0, epsilon=1.0e-12);
    }

    #[test]
    fn test_temperature_is_affine() {
        let boiling = Quantity::new(100.0, Unit::Temperature(TemperatureUnit::Celsius));
        let f = boiling.to(Unit::Temperature(TemperatureUnit::Fahrenheit)).unwrap();
        assert_abs_diff_eq!(f.magnitude(), 212.0, epsilon=1.0e-9);
        let k = boiling.to(Unit::Temperature(TemperatureUnit::Kelvin)).unwrap();
        assert_abs_diff_eq!(k.magnitude(), 373.15, epsilon=1.0e-9);
    }

    #[test]
    fn test_round_trip_for_every_pair_in_a_family() {
        for u1 in Unit::all() {
            for u2 in Unit::all().into_iter().filter(|u| u.family() == u1.family()) {
                let value = Quantity::new(12.375, u1);
                let back = value.to(u2).unwrap().to(u1).unwrap();
                assert_abs_diff_eq!(back.magnitude(), value.magnitude(), epsilon=1.0e-9);
                assert_eq!(back.unit(), u1);
            }
        }
    }

    #[test]
    fn test_incompatible_families() {
        let q = Quantity::new(1.0, Unit::METRE);
        assert!(matches!(
            q.to(Unit::Mass(MassUnit::Kilogram)),
            Err(ExecutionError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_arithmetic_keeps_left_unit() {
        let km = Quantity::new(1.0, Unit::Length(LengthUnit::Kilometre));
        let m = Quantity::new(500.0, Unit::METRE);

        let sum = km.add(&m).unwrap();
        assert_eq!(sum.unit(), Unit::Length(LengthUnit::Kilometre));
        assert_abs_diff_eq!(sum.magnitude(), 1.5, epsilon=1.0e-12);

        let sum = m.add(&km).unwrap();
        assert_eq!(sum.unit(), Unit::METRE);
        assert_abs_diff_eq!(sum.magnitude(), 1500.0, epsilon=1.0e-12);
    }

    #[test]
    fn test_product_and_quotient_change_family() {
        let a = Quantity::new(2.0, Unit::METRE);
        let b = Quantity::new(300.0, Unit::Length(LengthUnit::Centimetre));
        let area = a.product(&b).unwrap();
        assert_eq!(area.unit(), Unit::SQUARE_METRE);
        assert_abs_diff_eq!(area.magnitude(), 6.0, epsilon=1.0e-12);

        let volume = area.product(&a).unwrap();
        assert_eq!(volume.unit(), Unit::CUBIC_METRE);
        let length = volume.quotient(&area).unwrap();
        assert_abs_diff_eq!(length.magnitude(), 2.0, epsilon=1.0e-12);

        let mass = Quantity::new(1.0, Unit::Mass(MassUnit::Kilogram));
        assert!(a.product(&mass).is_none());
    }

    #[test]
    fn test_ordering_uses_base_unit() {
        let a = Quantity::new(1.0, Unit::Length(LengthUnit::Kilometre));
        let b = Quantity::new(999.0, Unit::METRE);
        assert_eq!(a.compare(&b).unwrap(), Some(Ordering::Greater));
    }

    #[test]
    fn test_display() {
        let q = Quantity::new(2.5, Unit::Length(LengthUnit::Kilometre));
        assert_eq!(q.to_string(), "2.5 km");
        assert_eq!(Family::Temperature.to_string(), "temperature");
    }
}
