//! Random diameters and colours for new circles.

use crate::initials::Initials;
use circles_protocol::CircleEvent;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Smallest generated diameter.
pub const MIN_DIAMETER: i32 = 10;

/// Largest generated diameter.
pub const MAX_DIAMETER: i32 = 100;

/// Smallest generated alpha, in tenths.
pub const MIN_ALPHA_TENTHS: u8 = 2;

/// Largest generated alpha, in tenths.
pub const MAX_ALPHA_TENTHS: u8 = 10;

/// Uniform integer in `[min, max]`.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: i32, max: i32) -> i32 {
    rng.random_range(min..=max)
}

/// Uniform diameter in `[MIN_DIAMETER, MAX_DIAMETER]`.
pub fn random_diameter<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    random_between(rng, MIN_DIAMETER, MAX_DIAMETER)
}

/// Error returned when parsing an `rgba(...)` string fails.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid rgba colour: {0}")]
pub struct RgbaParseError(String);

/// A translucent colour with alpha in tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha times ten, `2..=10` when generated.
    pub alpha_tenths: u8,
}

impl Rgba {
    /// Random colour with alpha drawn from `{0.2, 0.3, ..., 1.0}`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            r: rng.random(),
            g: rng.random(),
            b: rng.random(),
            alpha_tenths: rng.random_range(MIN_ALPHA_TENTHS..=MAX_ALPHA_TENTHS),
        }
    }

    /// Alpha as a fraction.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        f64::from(self.alpha_tenths) / 10.0
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},", self.r, self.g, self.b)?;
        match self.alpha_tenths {
            t if t % 10 == 0 => write!(f, "{})", t / 10),
            t => write!(f, "{}.{})", t / 10, t % 10),
        }
    }
}

impl FromStr for Rgba {
    type Err = RgbaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RgbaParseError(s.to_string());

        let inner = s
            .trim()
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let &[r, g, b, a] = parts.as_slice() else {
            return Err(invalid());
        };

        let channel = |v: &str| v.parse::<u8>().map_err(|_| invalid());
        let alpha: f64 = a.parse().map_err(|_| invalid())?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(invalid());
        }
        let tenths = alpha * 10.0;
        if (tenths - tenths.round()).abs() > 1e-9 {
            return Err(invalid());
        }

        Ok(Self {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
            alpha_tenths: tenths.round() as u8,
        })
    }
}

/// Build the add-circle event for a click at `(x, y)`.
pub fn compose_circle<R: Rng + ?Sized>(
    initials: &Initials,
    x: i32,
    y: i32,
    rng: &mut R,
) -> CircleEvent {
    CircleEvent {
        initials: initials.to_string(),
        x: x.into(),
        y: y.into(),
        diameter: random_diameter(rng).into(),
        color: Rgba::random(rng).to_string(),
    }
}
