//! Selection of version-ranged entries.
//!
//! NRF52 signing key sets are valid from a start version onward. For a given
//! firmware version, the applicable set is the one with the greatest start
//! version that is not greater than the firmware version.

use crate::version::Version;

/// Select the entry whose start version is the greatest one `<= version`.
///
/// Returns `None` if every entry starts after `version`. If several entries
/// share the greatest start version, the first one wins.
///
/// ```
/// use nitrokey_version::{Version, select_by_start};
///
/// let ranges = [(Version::new(0, 1, 0), "old"), (Version::new(1, 4, 0), "new")];
/// let picked = select_by_start(&ranges, &Version::new(1, 3, 0), |(start, _)| start);
/// assert_eq!(picked.map(|(_, name)| *name), Some("old"));
/// ```
pub fn select_by_start<'a, T, F>(items: &'a [T], version: &Version, start: F) -> Option<&'a T>
where
    F: Fn(&T) -> &Version,
{
    items
        .iter()
        .filter(|item| version >= start(*item))
        .fold(None, |best: Option<&'a T>, item| match best {
            Some(current) if start(item) > start(current) => Some(item),
            Some(current) => Some(current),
            None => Some(item),
        })
}
