//! Rupiah amounts.

use std::fmt;

use serde::{Serialize, Serializer};

/// Number of sen in one rupiah.
const SEN_PER_RUPIAH: i64 = 100;

/// A non-negative rupiah amount, stored as an integer number of sen.
///
/// Deposit slips almost always print whole rupiah (`Rp 1.500.000,00`), but
/// we keep two decimal places so that the occasional `12,50` survives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    sen: i64,
}

impl Amount {
    /// Build an amount from whole rupiah.
    pub fn from_rupiah(rupiah: i64) -> Option<Self> {
        Self::from_parts(rupiah, 0)
    }

    /// Build an amount from whole rupiah plus sen (0..=99).
    pub fn from_parts(rupiah: i64, sen: i64) -> Option<Self> {
        if rupiah < 0 || !(0..SEN_PER_RUPIAH).contains(&sen) {
            return None;
        }
        let sen = rupiah.checked_mul(SEN_PER_RUPIAH)?.checked_add(sen)?;
        Some(Self { sen })
    }

    /// Whole rupiah, with the sen part dropped.
    pub fn rupiah(self) -> i64 {
        self.sen / SEN_PER_RUPIAH
    }

    /// The sen part (0..=99).
    pub fn sen_part(self) -> i64 {
        self.sen % SEN_PER_RUPIAH
    }

    /// Is this amount greater than zero?
    pub fn is_positive(self) -> bool {
        self.sen > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sen_part() == 0 {
            write!(f, "{}", self.rupiah())
        } else {
            write!(f, "{}.{:02}", self.rupiah(), self.sen_part())
        }
    }
}

/// Whole amounts are written as JSON integers, everything else as a float.
impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.sen_part() == 0 {
            serializer.serialize_i64(self.rupiah())
        } else {
            serializer.serialize_f64(self.sen as f64 / SEN_PER_RUPIAH as f64)
        }
    }
}
