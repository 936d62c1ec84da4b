// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

/// A search result's sort key, as a tagged union over the four variants
/// `spi.h` recognizes. Replaces the original C union-plus-discriminant with a
/// genuine sum type, per the "macros for swapping tagged-union search
/// results" REDESIGN FLAG.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SortKey {
    Double(f64),
    Float(f32),
    U32(u32),
    U64(u64),
    Str(String),
}

/// The response-level sort type, mirroring `SPI_SORT_TYPE_*` in `spi.h`
/// (values 0..11: Unknown, DoubleAsc/Desc, FloatAsc/Desc, UintAsc/Desc,
/// UlongAsc/Desc, UcharAsc/Desc, NoSort). This port renames the u8/uchar
/// variant to `Str`, since the original's "uchar sort" operates on
/// null-terminated byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortType {
    DoubleAsc,
    DoubleDesc,
    FloatAsc,
    FloatDesc,
    U32Asc,
    U32Desc,
    U64Asc,
    U64Desc,
    StrAsc,
    StrDesc,
    NoSort,
}

impl SortType {
    /// True when `key`'s variant matches this sort type, the invariant that
    /// every result in a search response must satisfy.
    pub fn matches(self, key: &SortKey) -> bool {
        matches!(
            (self, key),
            (SortType::DoubleAsc | SortType::DoubleDesc, SortKey::Double(_))
                | (SortType::FloatAsc | SortType::FloatDesc, SortKey::Float(_))
                | (SortType::U32Asc | SortType::U32Desc, SortKey::U32(_))
                | (SortType::U64Asc | SortType::U64Desc, SortKey::U64(_))
                | (SortType::StrAsc | SortType::StrDesc, SortKey::Str(_))
        ) || self == SortType::NoSort
    }

    pub fn is_descending(self) -> bool {
        matches!(
            self,
            SortType::DoubleDesc | SortType::FloatDesc | SortType::U32Desc | SortType::U64Desc | SortType::StrDesc
        )
    }

    /// Token used on the wire (`<sortType>double:desc</sortType>` etc).
    pub fn wire_token(self) -> &'static str {
        match self {
            SortType::DoubleAsc => "double:asc",
            SortType::DoubleDesc => "double:desc",
            SortType::FloatAsc => "float:asc",
            SortType::FloatDesc => "float:desc",
            SortType::U32Asc => "uint:asc",
            SortType::U32Desc => "uint:desc",
            SortType::U64Asc => "ulong:asc",
            SortType::U64Desc => "ulong:desc",
            SortType::StrAsc => "string:asc",
            SortType::StrDesc => "string:desc",
            SortType::NoSort => "none",
        }
    }
}

/// Orders two keys of the same variant per `SortType`'s direction. Callers
/// must only compare keys that `SortType::matches` accepts; mismatched
/// variants are treated as equal so a stray entry can't panic a sort.
pub fn compare_keys(sort_type: SortType, a: &SortKey, b: &SortKey) -> Ordering {
    let ord = match (a, b) {
        (SortKey::Double(x), SortKey::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Float(x), SortKey::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::U32(x), SortKey::U32(y)) => x.cmp(y),
        (SortKey::U64(x), SortKey::U64(y)) => x.cmp(y),
        (SortKey::Str(x), SortKey::Str(y)) => x.cmp(y),
        _ => Ordering::Equal,
    };
    if sort_type.is_descending() {
        ord.reverse()
    } else {
        ord
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_checks_variant_tag() {
        assert!(SortType::DoubleDesc.matches(&SortKey::Double(0.5)));
        assert!(!SortType::DoubleDesc.matches(&SortKey::U32(1)));
        assert!(SortType::NoSort.matches(&SortKey::Str("x".into())));
    }

    #[test]
    fn compare_keys_respects_direction() {
        use Ordering::*;
        assert_eq!(
            compare_keys(SortType::DoubleDesc, &SortKey::Double(0.8), &SortKey::Double(0.4)),
            Less
        );
        assert_eq!(
            compare_keys(SortType::DoubleAsc, &SortKey::Double(0.8), &SortKey::Double(0.4)),
            Greater
        );
    }
}
