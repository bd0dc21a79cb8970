use std::collections::BTreeMap;

/// Known spelling variants seen in the raw snapshot, keyed by the lowercased,
/// whitespace-collapsed variant.
const DEFAULT_VARIANTS: &[(&str, &str)] = &[
    ("mckinnon", "McKinnon"),
    ("macleod", "Macleod"),
    ("saint kilda", "St Kilda"),
    ("st. kilda", "St Kilda"),
    ("saint albans", "St Albans"),
    ("st. albans", "St Albans"),
    ("mt waverley", "Mount Waverley"),
    ("mt. waverley", "Mount Waverley"),
    ("mt evelyn", "Mount Evelyn"),
    ("moonee pond", "Moonee Ponds"),
];

/// Maps suburb name variants onto one canonical spelling.
///
/// Lookup is case-insensitive and ignores surrounding and repeated inner
/// whitespace. Names with no entry fall back to title casing, so
/// `"  RESERVOIR "` and `"reservoir"` both become `"Reservoir"`.
#[derive(Debug, Clone)]
pub struct SuburbCanonicalizer {
    variants: BTreeMap<String, String>,
}

impl SuburbCanonicalizer {
    /// Build from `(variant, canonical)` pairs.
    ///
    /// A canonical spelling that is itself listed as a variant is followed to
    /// the end of the chain, so every lookup lands on a name that maps to
    /// itself. Cycles resolve to their alphabetically first member.
    pub fn new<I, K, V>(variants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let direct: BTreeMap<String, String> = variants
            .into_iter()
            .map(|(variant, canonical)| (lookup_key(variant.as_ref()), canonical.into()))
            .collect();
        let mut map: BTreeMap<String, String> = direct
            .iter()
            .map(|(key, canonical)| (key.clone(), resolve(&direct, canonical)))
            .collect();
        // Canonical spellings must map to themselves even when title casing
        // would alter them (e.g. "McKinnon").
        let resolved: Vec<String> = map.values().cloned().collect();
        for canonical in resolved {
            map.entry(lookup_key(&canonical)).or_insert(canonical);
        }
        Self { variants: map }
    }

    pub fn canonicalize(&self, name: &str) -> String {
        let collapsed = collapse_whitespace(name);
        match self.variants.get(&collapsed.to_lowercase()) {
            Some(canonical) => canonical.clone(),
            None => title_case(&collapsed),
        }
    }
}

impl Default for SuburbCanonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_VARIANTS.iter().copied())
    }
}

/// Follow `start` through the table until it reaches a name that maps to
/// itself or to nothing.
fn resolve<'a>(direct: &'a BTreeMap<String, String>, start: &'a str) -> String {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(next) = direct.get(&lookup_key(current)) {
        if next == current {
            break;
        }
        if let Some(pos) = chain.iter().position(|c| c == next) {
            let first = chain[pos..].iter().min().copied().unwrap_or(current);
            return first.to_string();
        }
        chain.push(next.as_str());
        current = next.as_str();
    }
    current.to_string()
}

fn lookup_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_words() {
        assert_eq!(title_case("moonee ponds"), "Moonee Ponds");
        assert_eq!(title_case("BRUNSWICK EAST"), "Brunswick East");
        assert_eq!(title_case("o'connor"), "O'Connor");
    }

    #[test]
    fn test_unknown_name_is_trimmed_and_title_cased() {
        let canon = SuburbCanonicalizer::default();
        assert_eq!(canon.canonicalize("  reservoir  "), "Reservoir");
        assert_eq!(canon.canonicalize("Moonee   PONDS"), "Moonee Ponds");
    }

    #[test]
    fn test_known_variant_maps_to_canonical() {
        let canon = SuburbCanonicalizer::default();
        assert_eq!(canon.canonicalize("Saint Kilda"), "St Kilda");
        assert_eq!(canon.canonicalize("st.  kilda"), "St Kilda");
        assert_eq!(canon.canonicalize("MCKINNON"), "McKinnon");
        assert_eq!(canon.canonicalize("Mt Waverley"), "Mount Waverley");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let canon = SuburbCanonicalizer::default();
        for raw in [
            "mckinnon",
            "st. albans",
            " coburg ",
            "BRUNSWICK west",
            "Mt Evelyn",
            "Macleod",
        ] {
            let once = canon.canonicalize(raw);
            assert_eq!(canon.canonicalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_custom_table() {
        let canon = SuburbCanonicalizer::new([("Nth Melbourne", "North Melbourne")]);
        assert_eq!(canon.canonicalize("nth   melbourne"), "North Melbourne");
        assert_eq!(canon.canonicalize("North Melbourne"), "North Melbourne");
    }

    #[test]
    fn test_chained_entries_resolve_to_end_of_chain() {
        let canon = SuburbCanonicalizer::new([
            ("Nth Melb", "North Melbourne"),
            ("north melbourne", "Melbourne North"),
        ]);
        for raw in ["Nth Melb", "north melbourne", "MELBOURNE NORTH"] {
            let once = canon.canonicalize(raw);
            assert_eq!(once, "Melbourne North", "for {raw:?}");
            assert_eq!(canon.canonicalize(&once), once);
        }
    }

    #[test]
    fn test_cyclic_entries_settle_on_one_name() {
        let canon = SuburbCanonicalizer::new([("Foo", "Bar"), ("bar", "Foo")]);
        assert_eq!(canon.canonicalize("foo"), "Bar");
        assert_eq!(canon.canonicalize("BAR"), "Bar");
        assert_eq!(canon.canonicalize("Bar"), "Bar");
    }
}
