//! core::version
//!
//! Plugin version ordering.
//!
//! Versions are dotted segments (`1.10.2`, `v2.0.0-beta1`). Each segment is
//! a leading number plus an optional suffix. Numbers compare numerically,
//! missing segments count as `0`, and within equal numbers a segment with no
//! suffix sorts after one with a suffix (`1.0.0` > `1.0.0-beta`).

use std::cmp::Ordering;

fn segments(version: &str) -> Vec<(u64, &str)> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    version
        .split('.')
        .map(|segment| {
            let digits = segment
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(segment.len());
            let number = segment[..digits].parse().unwrap_or(0);
            (number, &segment[digits..])
        })
        .collect()
}

fn compare_suffix(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Total order over version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let (ln, ls) = left.get(i).copied().unwrap_or((0, ""));
        let (rn, rs) = right.get(i).copied().unwrap_or((0, ""));
        let ord = ln.cmp(&rn).then_with(|| compare_suffix(ls, rs));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// The newest version in `versions`, if any.
pub fn latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare(a, b))
}
