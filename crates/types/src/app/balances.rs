// Path: crates/types/src/app/balances.rs
use super::Color;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mapping from token color to a non-negative amount.
///
/// Zero amounts are never stored, so two balances holding the same tokens
/// always compare (and encode) equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ColoredBalances(BTreeMap<Color, u64>);

impl ColoredBalances {
    /// An empty balance set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A balance set holding a single color.
    pub fn single(color: Color, amount: u64) -> Self {
        Self::new().with(color, amount)
    }

    /// A balance set holding only base tokens.
    pub fn base(amount: u64) -> Self {
        Self::single(Color::BASE, amount)
    }

    /// Builder-style addition. Saturates on overflow.
    pub fn with(mut self, color: Color, amount: u64) -> Self {
        let current = self.get(&color);
        self.set(color, current.saturating_add(amount));
        self
    }

    /// The amount held of `color`.
    pub fn get(&self, color: &Color) -> u64 {
        self.0.get(color).copied().unwrap_or(0)
    }

    /// Sets the amount of `color`, dropping the entry when it is zero.
    pub fn set(&mut self, color: Color, amount: u64) {
        if amount == 0 {
            self.0.remove(&color);
        } else {
            self.0.insert(color, amount);
        }
    }

    /// Removes `color` entirely and returns the amount it held.
    pub fn take(&mut self, color: &Color) -> u64 {
        self.0.remove(color).unwrap_or(0)
    }

    /// Adds `amount` of `color`, returning `None` on overflow.
    pub fn checked_add(&mut self, color: Color, amount: u64) -> Option<()> {
        let sum = self.get(&color).checked_add(amount)?;
        self.set(color, sum);
        Some(())
    }

    /// Subtracts `amount` of `color`, returning `None` if it would go negative.
    pub fn checked_sub(&mut self, color: Color, amount: u64) -> Option<()> {
        let rest = self.get(&color).checked_sub(amount)?;
        self.set(color, rest);
        Some(())
    }

    /// Adds every color of `other`, returning `None` on overflow.
    pub fn checked_add_all(&mut self, other: &ColoredBalances) -> Option<()> {
        for (color, amount) in other.iter() {
            self.checked_add(*color, amount)?;
        }
        Some(())
    }

    /// Whether `self` holds at least `other` for every color.
    pub fn covers(&self, other: &ColoredBalances) -> bool {
        other.iter().all(|(color, amount)| self.get(color) >= amount)
    }

    /// Whether no tokens are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates colors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Color, u64)> + '_ {
        self.0.iter().map(|(c, a)| (c, *a))
    }

    /// Number of distinct colors held.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(Color, u64)> for ColoredBalances {
    fn from_iter<I: IntoIterator<Item = (Color, u64)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |acc, (color, amount)| acc.with(color, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amounts_are_not_stored() {
        let mut b = ColoredBalances::base(5);
        b.checked_sub(Color::BASE, 5).unwrap();
        assert!(b.is_empty());
        assert_eq!(b, ColoredBalances::new());
        assert_eq!(ColoredBalances::base(0), ColoredBalances::new());
    }

    #[test]
    fn checked_sub_refuses_to_go_negative() {
        let mut b = ColoredBalances::base(3);
        assert!(b.checked_sub(Color::BASE, 4).is_none());
        assert_eq!(b.get(&Color::BASE), 3);
    }

    #[test]
    fn covers_checks_every_color() {
        let red = Color([1u8; 32]);
        let have = ColoredBalances::base(10).with(red, 2);
        assert!(have.covers(&ColoredBalances::base(10)));
        assert!(!have.covers(&ColoredBalances::single(red, 3)));
        assert!(have.covers(&ColoredBalances::new()));
    }
}
