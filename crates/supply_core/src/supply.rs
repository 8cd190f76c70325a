//! Supply quantities.
//!
//! Supply is the transportable resource that powers construction and
//! mining. Producers and packets only ever deal in whole units, but miners
//! burn supply continuously, so stock is counted in ten-thousandths of a
//! unit. Burning one ten-thousandth per millisecond is then exact integer
//! math.

use serde::{Deserialize, Serialize};

/// An amount of supply, counted in ten-thousandths of a unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Supply(u32);

impl Supply {
    /// Sub-units per whole unit of supply.
    pub const SCALE: u32 = 10_000;

    /// No supply.
    pub const ZERO: Self = Self(0);

    /// Exactly one unit (the payload of a single packet).
    pub const ONE: Self = Self(Self::SCALE);

    /// Create an amount from whole units.
    #[must_use]
    pub const fn units(units: u32) -> Self {
        Self(units * Self::SCALE)
    }

    /// Create an amount from raw sub-units.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw sub-unit count.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whole units contained (rounded down).
    #[must_use]
    pub const fn whole_units(self) -> u32 {
        self.0 / Self::SCALE
    }

    /// Check if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtract, stopping at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Add, capping at `max`.
    #[must_use]
    pub fn add_capped(self, rhs: Self, max: Self) -> Self {
        Self(self.0.saturating_add(rhs.0).min(max.0))
    }
}

impl std::ops::Add for Supply {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Supply {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Supply {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::fmt::Display for Supply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            write!(f, "{}", self.whole_units())
        } else {
            write!(f, "{}.{:04}", self.whole_units(), frac)
        }
    }
}
