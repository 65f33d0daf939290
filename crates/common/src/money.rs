use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// All marketplace prices carry two decimal places of currency precision,
/// so one cent is the smallest representable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole-unit value (e.g. pesos).
    pub fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after whole units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Computes a percentage of this amount given in basis points,
    /// rounded half-up to the nearest cent.
    ///
    /// 100 basis points = 1%. A 3% commission on $1000.00 is
    /// `percent_bps(300)` = $30.00.
    pub fn percent_bps(&self, basis_points: u32) -> Money {
        let scaled = self.cents as i128 * basis_points as i128;
        let rounded = (scaled + 5_000) / 10_000;
        Money {
            cents: rounded as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_parts() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn from_units() {
        let money = Money::from_units(50);
        assert_eq!(money.cents(), 5000);
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let mut c = a;
        c += b;
        assert_eq!(c.cents(), 1500);
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [100, 250, 75].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total.cents(), 425);
    }

    #[test]
    fn percent_three_percent_commission() {
        // $1000.00 at 3% -> $30.00
        assert_eq!(Money::from_units(1000).percent_bps(300).cents(), 3000);
    }

    #[test]
    fn percent_rounds_half_up_to_cent() {
        // $0.33 at 5% = 1.65 cents -> rounds to 2 cents
        assert_eq!(Money::from_cents(33).percent_bps(500).cents(), 2);
        // $0.30 at 5% = 1.5 cents -> rounds up to 2 cents
        assert_eq!(Money::from_cents(30).percent_bps(500).cents(), 2);
        // $0.29 at 5% = 1.45 cents -> rounds down to 1 cent
        assert_eq!(Money::from_cents(29).percent_bps(500).cents(), 1);
    }

    #[test]
    fn serialization_is_transparent() {
        let money = Money::from_cents(9900);
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "9900");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money);
    }
}
