use std::fmt;
use std::str::FromStr;

/// TCP option kinds that take part in layout comparison.
///
/// Every other kind (EOL padding, SACK blocks, MD5, unknown) is ignored on
/// both the signature side and the observed side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionTag {
    Mss,
    Ws,
    Sok,
    Ts,
    Nop,
}

impl OptionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionTag::Mss => "mss",
            OptionTag::Ws => "ws",
            OptionTag::Sok => "sok",
            OptionTag::Ts => "ts",
            OptionTag::Nop => "nop",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            OptionTag::Mss => 1,
            OptionTag::Ws => 1 << 1,
            OptionTag::Sok => 1 << 2,
            OptionTag::Ts => 1 << 3,
            OptionTag::Nop => 1 << 4,
        }
    }
}

impl fmt::Display for OptionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mss" => Ok(OptionTag::Mss),
            "ws" => Ok(OptionTag::Ws),
            "sok" => Ok(OptionTag::Sok),
            "ts" => Ok(OptionTag::Ts),
            "nop" => Ok(OptionTag::Nop),
            _ => Err(()),
        }
    }
}

/// Normalizes option tokens: trims, lowercases, drops empty tokens, `eol*`
/// padding markers and anything outside `mss`, `ws`, `sok`, `ts`, `nop`.
///
/// Order and duplicates are preserved.
pub fn normalize<I, S>(raw: I) -> Vec<OptionTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|token| {
            let token = token.as_ref().trim().to_ascii_lowercase();
            if token.is_empty() || token.starts_with("eol") {
                return None;
            }
            token.parse::<OptionTag>().ok()
        })
        .collect()
}

/// Splits a comma separated option layout (`mss,nop,ws,sok`) and normalizes it.
pub fn normalize_layout(layout: &str) -> Vec<OptionTag> {
    normalize(layout.split(','))
}

/// Set of option kinds, order and multiplicity dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionSet(u8);

impl OptionSet {
    pub fn contains(&self, tag: OptionTag) -> bool {
        self.0 & tag.bit() != 0
    }

    pub fn insert(&mut self, tag: OptionTag) {
        self.0 |= tag.bit();
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Jaccard similarity `|A ∩ B| / |A ∪ B|`. Two empty sets are identical.
    pub fn similarity(&self, other: &OptionSet) -> f64 {
        let union = (self.0 | other.0).count_ones();
        if union == 0 {
            return 1.0;
        }
        let intersection = (self.0 & other.0).count_ones();
        f64::from(intersection) / f64::from(union)
    }
}

impl FromIterator<OptionTag> for OptionSet {
    fn from_iter<T: IntoIterator<Item = OptionTag>>(iter: T) -> Self {
        let mut set = OptionSet::default();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<'a> FromIterator<&'a OptionTag> for OptionSet {
    fn from_iter<T: IntoIterator<Item = &'a OptionTag>>(iter: T) -> Self {
        iter.into_iter().copied().collect()
    }
}
