//! 标识与 token 取值：有限计数或 ω（无界）.
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// Token count of a single place. `Omega` stands for "arbitrarily many" and
/// only appears in coverability markings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Token {
    Finite(Weight),
    Omega,
}

impl Token {
    pub const ZERO: Token = Token::Finite(0);

    pub fn is_omega(self) -> bool {
        matches!(self, Token::Omega)
    }

    pub fn finite(self) -> Option<Weight> {
        match self {
            Token::Finite(value) => Some(value),
            Token::Omega => None,
        }
    }

    pub fn covers_weight(self, weight: Weight) -> bool {
        match self {
            Token::Finite(value) => value >= weight,
            Token::Omega => true,
        }
    }

    pub fn checked_add(self, weight: Weight) -> Option<Token> {
        match self {
            Token::Finite(value) => value.checked_add(weight).map(Token::Finite),
            Token::Omega => Some(Token::Omega),
        }
    }

    pub fn checked_sub(self, weight: Weight) -> Option<Token> {
        match self {
            Token::Finite(value) => value.checked_sub(weight).map(Token::Finite),
            Token::Omega => Some(Token::Omega),
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Token::ZERO
    }
}

impl From<Weight> for Token {
    fn from(value: Weight) -> Self {
        Token::Finite(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Finite(value) => write!(f, "{value}"),
            Token::Omega => f.write_str("ω"),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Token vector over the places of a net, indexed by [`PlaceId`] in the
/// net's place order. Markings are values: firing produces a new one.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marking(IndexVec<PlaceId, Token>);

impl Marking {
    pub fn new(tokens: IndexVec<PlaceId, Token>) -> Self {
        Self(tokens)
    }

    pub fn zero(places: usize) -> Self {
        Self(IndexVec::from_elem(Token::ZERO, places))
    }

    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = Weight>,
    {
        Self(counts.into_iter().map(Token::Finite).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self, place: PlaceId) -> Token {
        self.0.get(place).copied().unwrap_or(Token::ZERO)
    }

    pub fn set(&mut self, place: PlaceId, tokens: Token) {
        if let Some(slot) = self.0.get_mut(place) {
            *slot = tokens;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Token)> {
        self.0.iter_enumerated().map(|(place, tokens)| (place, *tokens))
    }

    pub fn has_omega(&self) -> bool {
        self.0.iter().any(|tokens| tokens.is_omega())
    }

    pub fn omega_places(&self) -> impl Iterator<Item = PlaceId> {
        self.iter()
            .filter(|(_, tokens)| tokens.is_omega())
            .map(|(place, _)| place)
    }

    /// `self >= other` in every place.
    pub fn covers(&self, other: &Marking) -> bool {
        matches!(
            self.partial_cmp(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// `self >= other` everywhere and `self > other` somewhere.
    pub fn strictly_covers(&self, other: &Marking) -> bool {
        self.partial_cmp(other) == Some(Ordering::Greater)
    }

    pub fn as_slice(&self) -> &[Token] {
        self.0.as_slice()
    }

    pub fn into_inner(self) -> IndexVec<PlaceId, Token> {
        self.0
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, &tokens);
        }
        map.finish()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, tokens) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tokens}")?;
        }
        f.write_str("]")
    }
}

/// Domination order: comparable only when one marking covers the other.
impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            match left.cmp(right) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omega_dominates_every_finite_count() {
        assert!(Token::Omega > Token::Finite(u64::MAX));
        assert_eq!(Token::Omega.checked_sub(5), Some(Token::Omega));
        assert_eq!(Token::Finite(2).checked_sub(3), None);
        assert!(Token::Omega.covers_weight(1_000));
    }

    #[test]
    fn domination_order() {
        let small = Marking::from_counts([1, 0, 2]);
        let big = Marking::from_counts([1, 1, 2]);
        let other = Marking::from_counts([0, 2, 2]);

        assert!(big.strictly_covers(&small));
        assert!(big.covers(&big));
        assert!(!big.strictly_covers(&big));
        assert_eq!(small.partial_cmp(&other), None);

        let mut omega = small.clone();
        omega.set(PlaceId::new(1), Token::Omega);
        assert!(omega.strictly_covers(&big));
        assert_eq!(omega.omega_places().collect::<Vec<_>>(), vec![PlaceId::new(1)]);
        assert_eq!(omega.to_string(), "[1, ω, 2]");
    }
}
