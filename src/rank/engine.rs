use super::key::OrderKey;
use crate::error::{RankboardError, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";
const DEFAULT_INITIAL_SYMBOL_INDEX: usize = 13;
const DEFAULT_MAX_KEY_LENGTH: usize = 10;

/// Tunable constants of the ranking scheme
///
/// `max_key_length` can change on a running system without migrating data;
/// changing the alphabet cannot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Ordered symbols keys are drawn from, lowest first
    pub alphabet: String,
    /// Index of the symbol used for the first key of an empty sequence
    pub initial_symbol_index: usize,
    /// Keys longer than this trigger a rebalance of their sequence
    pub max_key_length: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            initial_symbol_index: DEFAULT_INITIAL_SYMBOL_INDEX,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

/// Computes order keys between neighbors and evenly spaced key sets for rebalancing
///
/// All operations are pure: the same inputs always give the same key. Internally keys
/// are handled as vectors of symbol indices and rendered back to strings at the edge.
#[derive(Debug, Clone)]
pub struct RankEngine {
    symbols: Vec<u8>,
    positions: [Option<u8>; 256],
    initial: usize,
    max_key_length: usize,
}

impl RankEngine {
    /// Creates an engine, validating the configuration
    pub fn new(config: RankConfig) -> Result<Self> {
        let symbols = config.alphabet.as_bytes();

        if symbols.len() < 3 {
            return Err(RankboardError::ConfigError(format!(
                "alphabet needs at least 3 symbols, got {}",
                symbols.len()
            )));
        }
        if !symbols.iter().all(u8::is_ascii_graphic) {
            return Err(RankboardError::ConfigError(
                "alphabet must consist of printable ASCII symbols".to_string(),
            ));
        }
        if !symbols.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(RankboardError::ConfigError(
                "alphabet symbols must be strictly ascending".to_string(),
            ));
        }
        if config.initial_symbol_index == 0 || config.initial_symbol_index >= symbols.len() - 1 {
            return Err(RankboardError::ConfigError(format!(
                "initial symbol index {} must lie strictly inside the alphabet",
                config.initial_symbol_index
            )));
        }
        if config.max_key_length == 0 {
            return Err(RankboardError::ConfigError(
                "max key length must be at least 1".to_string(),
            ));
        }

        Ok(Self::from_validated(config))
    }

    fn from_validated(config: RankConfig) -> Self {
        let symbols = config.alphabet.into_bytes();
        let mut positions = [None; 256];
        for (index, &symbol) in symbols.iter().enumerate() {
            positions[symbol as usize] = Some(index as u8);
        }

        Self {
            symbols,
            positions,
            initial: config.initial_symbol_index,
            max_key_length: config.max_key_length,
        }
    }

    /// Key given to the first item of an empty sequence
    pub fn initial_key(&self) -> OrderKey {
        self.render(&[self.initial])
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    pub fn alphabet_size(&self) -> usize {
        self.symbols.len()
    }

    /// Parses a key, rejecting empty keys and symbols outside the alphabet
    pub fn parse_key(&self, key: &str) -> Result<OrderKey> {
        self.digits(key)?;
        Ok(OrderKey::new(key))
    }

    /// Returns a key that sorts strictly between `before` and `after`
    ///
    /// Either side may be open. With both sides open the initial key is returned.
    /// Fails with `InvalidOrder` when `before >= after`, or when the gap holds no key at
    /// all (nothing sorts below a key made only of the lowest symbol, and nothing sorts
    /// between `k` and `k` followed only by lowest symbols).
    pub fn key_between(
        &self,
        before: Option<&OrderKey>,
        after: Option<&OrderKey>,
    ) -> Result<OrderKey> {
        match (before, after) {
            (None, None) => Ok(self.initial_key()),
            (None, Some(after)) => {
                let upper = self.digits(after.as_str())?;
                self.digits_before(&upper)
                    .map(|digits| self.render(&digits))
                    .ok_or_else(|| invalid_order("(start)", after.as_str()))
            }
            (Some(before), None) => {
                let lower = self.digits(before.as_str())?;
                Ok(self.render(&self.digits_after(&lower)))
            }
            (Some(before), Some(after)) => {
                let lower = self.digits(before.as_str())?;
                let upper = self.digits(after.as_str())?;
                if before >= after {
                    return Err(invalid_order(before.as_str(), after.as_str()));
                }
                self.digits_between(&lower, &upper)
                    .map(|digits| self.render(&digits))
                    .ok_or_else(|| invalid_order(before.as_str(), after.as_str()))
            }
        }
    }

    /// True when a key has grown past the configured maximum length
    pub fn needs_rebalancing(&self, key: &OrderKey) -> bool {
        key.len() > self.max_key_length
    }

    /// Generates `count` strictly increasing, evenly spaced keys
    ///
    /// Keys use the smallest width whose capacity (all keys of that width minus the two
    /// extremes) holds `count`, so one-symbol keys are used up to `alphabet_size - 2` items.
    pub fn balanced_keys(&self, count: usize) -> Result<Vec<OrderKey>> {
        match count {
            0 => return Ok(Vec::new()),
            1 => return Ok(vec![self.initial_key()]),
            _ => {}
        }

        let base = self.symbols.len() as u128;
        let wanted = count as u128;
        let mut width = 1;
        let mut space = base;
        while space - 2 < wanted {
            width += 1;
            space = space.checked_mul(base).ok_or_else(|| {
                RankboardError::RebalanceInvariant(format!("{} items exceed key space", count))
            })?;
        }

        let slots = wanted + 1;
        let mut keys: Vec<OrderKey> = Vec::with_capacity(count);
        for i in 1..=wanted {
            let value = i * space / slots;
            let mut key = self.render(&self.fixed_width(value, width));
            if let Some(previous) = keys.last() {
                if key <= *previous {
                    key = self.lengthen(previous);
                }
            }
            keys.push(key);
        }

        if keys.len() != count {
            return Err(RankboardError::RebalanceInvariant(format!(
                "generated {} keys for {} items",
                keys.len(),
                count
            )));
        }
        if !Self::is_strictly_increasing(&keys) {
            return Err(RankboardError::RebalanceInvariant(
                "balanced keys are not strictly increasing".to_string(),
            ));
        }
        if let Some(long) = keys.iter().find(|key| self.needs_rebalancing(key)) {
            return Err(RankboardError::RebalanceInvariant(format!(
                "balanced key '{}' exceeds max length {}",
                long, self.max_key_length
            )));
        }

        Ok(keys)
    }

    /// Checks that keys are in strictly ascending order
    pub fn is_strictly_increasing(keys: &[OrderKey]) -> bool {
        keys.windows(2).all(|pair| pair[0] < pair[1])
    }

    fn digits(&self, key: &str) -> Result<Vec<usize>> {
        if key.is_empty() {
            return Err(RankboardError::InvalidKey {
                key: key.to_string(),
                reason: "key is empty".to_string(),
            });
        }
        key.bytes()
            .map(|byte| {
                self.positions[byte as usize]
                    .map(usize::from)
                    .ok_or_else(|| RankboardError::InvalidKey {
                        key: key.to_string(),
                        reason: format!("symbol '{}' is outside the alphabet", byte as char),
                    })
            })
            .collect()
    }

    fn render(&self, digits: &[usize]) -> OrderKey {
        OrderKey::new(
            digits
                .iter()
                .map(|&digit| self.symbols[digit] as char)
                .collect::<String>(),
        )
    }

    fn fixed_width(&self, mut value: u128, width: usize) -> Vec<usize> {
        let base = self.symbols.len() as u128;
        let mut digits = vec![0; width];
        for slot in digits.iter_mut().rev() {
            *slot = (value % base) as usize;
            value /= base;
        }
        digits
    }

    fn lengthen(&self, key: &OrderKey) -> OrderKey {
        let mut lengthened = key.as_str().to_string();
        lengthened.push(self.symbols[self.initial] as char);
        OrderKey::new(lengthened)
    }

    /// First symbol with room below it is halved; a `1` becomes `0` plus the midpoint
    fn digits_before(&self, upper: &[usize]) -> Option<Vec<usize>> {
        let (position, &digit) = upper.iter().enumerate().find(|(_, &digit)| digit > 0)?;
        let mut digits = upper[..position].to_vec();
        if digit > 1 {
            digits.push(digit / 2);
        } else {
            digits.push(0);
            digits.push(self.initial);
        }
        Some(digits)
    }

    /// Last symbol with room above it moves halfway to the top; otherwise append
    fn digits_after(&self, lower: &[usize]) -> Vec<usize> {
        if lower.is_empty() {
            return vec![self.initial];
        }

        let top = self.symbols.len() - 1;
        for position in (0..lower.len()).rev() {
            let digit = lower[position];
            if digit < top {
                let mut digits = lower[..position].to_vec();
                digits.push((digit + 1 + top) / 2);
                return digits;
            }
        }

        let mut digits = lower.to_vec();
        digits.push(self.initial);
        digits
    }

    /// Caller guarantees `lower < upper`
    fn digits_between(&self, lower: &[usize], upper: &[usize]) -> Option<Vec<usize>> {
        let width = lower.len().max(upper.len());
        let mut digits = Vec::with_capacity(width + 1);

        for position in 0..width {
            let low = lower.get(position).copied().unwrap_or(0);
            let high = upper.get(position).copied().unwrap_or(0);

            if low == high {
                digits.push(low);
                continue;
            }

            let mid = (low + high) / 2;
            if mid > low {
                digits.push(mid);
                return Some(digits);
            }

            // Adjacent symbols: keep the lower one and grow past the rest of `lower`
            digits.push(low);
            let rest = lower.get(position + 1..).unwrap_or(&[]);
            digits.extend(self.digits_after(rest));
            return Some(digits);
        }

        None
    }
}

impl Default for RankEngine {
    fn default() -> Self {
        Self::from_validated(RankConfig::default())
    }
}

fn invalid_order(before: &str, after: &str) -> RankboardError {
    RankboardError::InvalidOrder {
        before: before.to_string(),
        after: after.to_string(),
    }
}
