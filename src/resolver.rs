// Region name matching.
//
// Datasets come from independent generators that disagree on casing and
// accents ("Yucatán", "YUCATAN", "yucatan"), so lookups go through two phases:
// an exact key match, then a diacritic-insensitive, case-insensitive scan.
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison key for a region name: NFD-decompose, drop combining
/// marks, upper-case. `None` and `""` both map to an empty key.
pub fn normalize(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// Find the dataset key that `query` refers to.
///
/// The exact key wins if present. Otherwise the first key, in the order the
/// iterator yields them, whose normalized form equals the normalized query.
pub fn resolve<'a, I>(keys: I, query: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let keys = keys.into_iter();
    if let Some(k) = keys.clone().find(|k| *k == query) {
        return Some(k);
    }
    let wanted = normalize(Some(query));
    if wanted.is_empty() {
        return None;
    }
    keys.into_iter().find(|k| normalize(Some(k)) == wanted)
}
