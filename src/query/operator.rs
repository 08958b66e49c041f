use std::fmt;
use std::str::FromStr;

use super::QueryError;
use crate::money::Amount;

/// Comparison applied as `remaining_amount <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 6] = [
        FilterOperator::Eq,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Ne,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Ne => "ne",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Ne => "<>",
        }
    }

    pub fn compare(self, lhs: Amount, rhs: Amount) -> bool {
        match self {
            FilterOperator::Eq => lhs == rhs,
            FilterOperator::Lt => lhs < rhs,
            FilterOperator::Lte => lhs <= rhs,
            FilterOperator::Gt => lhs > rhs,
            FilterOperator::Gte => lhs >= rhs,
            FilterOperator::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .into_iter()
            .find(|op| op.key() == s)
            .ok_or_else(|| {
                QueryError::invalid(format!(
                    "unknown operator '{}', expected one of eq, lt, lte, gt, gte, ne",
                    s
                ))
            })
    }
}

/// Magnitude, in cents, past which a threshold no longer needs exact digits:
/// no remaining amount comes anywhere near it.
const THRESHOLD_CAP: i128 = 10i128.pow(30);

/// A decimal threshold of any precision, reduced to what a comparison against
/// whole cents needs.
///
/// `floor` is the largest whole cent not above the value and `exact` tells
/// whether the value is that cent. A value strictly between two cents has
/// `exact == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    floor: i128,
    exact: bool,
}

impl From<Amount> for Threshold {
    fn from(amount: Amount) -> Self {
        Threshold {
            floor: i128::from(amount.cents()),
            exact: true,
        }
    }
}

fn ascii_digits(part: &str) -> bool {
    part.bytes().all(|b| b.is_ascii_digit())
}

fn parse_exponent(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !ascii_digits(digits) {
        return None;
    }
    // Anything this large already saturates the threshold.
    let value = digits.parse::<i64>().unwrap_or(i64::MAX).min(1_000_000);
    Some(if negative { -value } else { value })
}

impl FromStr for Threshold {
    type Err = QueryError;

    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_numeric = || QueryError::invalid(format!("'{}' is not a number", s));
        let text = s.trim();
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            Some(_) => (false, text),
            None => return Err(not_numeric()),
        };
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(i) => {
                let exponent = parse_exponent(&unsigned[i + 1..]).ok_or_else(not_numeric)?;
                (&unsigned[..i], exponent)
            }
            None => (unsigned, 0),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let empty = whole.is_empty() && fraction.is_empty();
        if empty || !ascii_digits(whole) || !ascii_digits(fraction) {
            return Err(not_numeric());
        }

        // value in cents = digits * 10^shift
        let joined = format!("{}{}", whole, fraction);
        let digits = joined.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Threshold { floor: 0, exact: true });
        }
        let shift = exponent + 2 - fraction.len() as i64;
        let integer_len = digits.len() as i64 + shift;

        let (magnitude, exact) = if integer_len > 31 {
            (THRESHOLD_CAP, false)
        } else if integer_len <= 0 {
            (0, false)
        } else if shift >= 0 {
            let value = digits.parse::<i128>().map_err(|_| not_numeric())?;
            (value * 10i128.pow(shift as u32), true)
        } else {
            let (integer, rest) = digits.split_at(integer_len as usize);
            let value = integer.parse::<i128>().map_err(|_| not_numeric())?;
            (value, rest.bytes().all(|b| b == b'0'))
        };

        let floor = match (negative, exact) {
            (false, _) => magnitude,
            (true, true) => -magnitude,
            (true, false) => -magnitude - 1,
        };
        Ok(Threshold { floor, exact })
    }
}

/// How a remaining amount in whole cents is tested against a [`Threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentsCheck {
    Compare(FilterOperator, Amount),
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingAmountFilter {
    pub operator: FilterOperator,
    pub threshold: Threshold,
}

impl RemainingAmountFilter {
    pub fn new(operator: FilterOperator, threshold: impl Into<Threshold>) -> Self {
        Self {
            operator,
            threshold: threshold.into(),
        }
    }

    /// Builds a filter from `operator key -> threshold` entries.
    ///
    /// Exactly one entry is accepted. No entry, several entries, an unknown key
    /// or a non-numeric threshold are all rejected.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = entries.into_iter();
        let (key, value) = entries
            .next()
            .ok_or_else(|| QueryError::invalid("remainingAmount needs exactly one operator"))?;
        if entries.next().is_some() {
            return Err(QueryError::invalid(
                "remainingAmount accepts a single operator, got several",
            ));
        }

        let operator: FilterOperator = key.as_ref().parse()?;
        let threshold: Threshold = value.as_ref().parse().map_err(|e| {
            QueryError::invalid(format!("remainingAmount[{}] must be numeric: {}", operator, e))
        })?;
        Ok(Self::new(operator, threshold))
    }

    /// Restates the comparison over whole cents. Sub-cent thresholds move to
    /// the neighbouring cent; thresholds past any storable amount collapse to
    /// a constant outcome.
    pub fn cents_check(&self) -> CentsCheck {
        use FilterOperator as Op;

        let Threshold { floor, exact } = self.threshold;
        let operator = match (self.operator, exact) {
            (op, true) => op,
            (Op::Lt | Op::Lte, false) => Op::Lte,
            (Op::Gt | Op::Gte, false) => Op::Gt,
            (Op::Eq, false) => return CentsCheck::Never,
            (Op::Ne, false) => return CentsCheck::Always,
        };

        match i64::try_from(floor) {
            Ok(cents) => CentsCheck::Compare(operator, Amount::from_cents(cents)),
            Err(_) => {
                let above = floor > 0;
                let holds = match operator {
                    Op::Lt | Op::Lte => above,
                    Op::Gt | Op::Gte => !above,
                    Op::Eq => false,
                    Op::Ne => true,
                };
                if holds {
                    CentsCheck::Always
                } else {
                    CentsCheck::Never
                }
            }
        }
    }

    pub fn matches(&self, remaining: Amount) -> bool {
        match self.cents_check() {
            CentsCheck::Compare(operator, bound) => operator.compare(remaining, bound),
            CentsCheck::Always => true,
            CentsCheck::Never => false,
        }
    }
}
