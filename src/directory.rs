//! Complex Directory (§4.4): name/id lookup, fuzzy search and
//! deduplication over `ResidentialComplex` rows. Pure in-memory logic over
//! whatever the Store hands it — the Store owns persistence, this module
//! owns the matching/scoring rules.

use crate::domain::ResidentialComplex;

const SUFFIXES_TO_STRIP: [&str; 8] = [
    " apartments",
    " apartment",
    " жк",
    " жилой комплекс",
    " residential complex",
    " complex",
    " квартал",
    " quarter",
];

/// §4.4.a: lower-case, trim, strip known suffixes in order. Idempotent —
/// `normalize(normalize(x)) == normalize(x)` (§8 property 9).
pub fn normalize_complex_name(name: &str) -> String {
    let mut normalized = name.trim().to_lowercase();
    loop {
        let mut stripped_any = false;
        for suffix in SUFFIXES_TO_STRIP {
            if let Some(stripped) = normalized.strip_suffix(suffix) {
                normalized = stripped.trim_end().to_string();
                stripped_any = true;
            }
        }
        if !stripped_any {
            break;
        }
    }
    normalized
}

fn ends_with_stripped_suffix(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUFFIXES_TO_STRIP.iter().any(|suffix| lower.ends_with(suffix))
}

fn is_title_cased_or_all_caps(name: &str) -> bool {
    let all_caps = name.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
        && name.chars().any(|c| c.is_alphabetic());
    let title_cased = name
        .split_whitespace()
        .all(|word| word.chars().next().map(|c| c.is_uppercase()).unwrap_or(true));
    all_caps || title_cased
}

/// §4.4.a scoring: pick the best representative within a normalized-name
/// group.
fn score(name: &str, search_term: &str) -> i64 {
    let mut score = name.chars().count() as i64;
    if is_title_cased_or_all_caps(name) {
        score += 10;
    }
    if !ends_with_stripped_suffix(name) {
        score += 5;
    }
    if name.to_lowercase().starts_with(&search_term.to_lowercase()) {
        score += 20;
    }
    score
}

/// Groups matches by normalized name and picks the highest-scoring
/// representative from each group (§4.4.a).
pub fn deduplicate<'a>(
    matches: &'a [ResidentialComplex],
    search_term: &str,
) -> Vec<&'a ResidentialComplex> {
    let mut groups: Vec<(String, Vec<&ResidentialComplex>)> = Vec::new();
    for complex in matches {
        let key = normalize_complex_name(&complex.name);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(complex),
            None => groups.push((key, vec![complex])),
        }
    }

    groups
        .into_iter()
        .map(|(_, members)| {
            members
                .into_iter()
                .max_by(|a, b| {
                    score(&a.name, search_term)
                        .cmp(&score(&b.name, search_term))
                        .then_with(|| a.complex_id.cmp(&b.complex_id))
                })
                .expect("group is never empty")
        })
        .collect()
}

/// §4.4 `find_by_name`: exact case-insensitive match first, else
/// deduplicated substring search, returning the best representative.
pub fn find_by_name<'a>(
    complexes: &'a [ResidentialComplex],
    name: &str,
) -> Option<&'a ResidentialComplex> {
    let lower = name.to_lowercase();
    if let Some(exact) = complexes.iter().find(|c| c.name.to_lowercase() == lower) {
        return Some(exact);
    }
    let matches: Vec<ResidentialComplex> = complexes
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&lower))
        .cloned()
        .collect();
    if matches.is_empty() {
        return None;
    }
    let deduped = deduplicate(&matches, name);
    let best = deduped.into_iter().max_by_key(|c| score(&c.name, name))?;
    complexes.iter().find(|c| c.complex_id == best.complex_id)
}

/// §4.4 `search`: every substring match, deduplicated.
pub fn search<'a>(complexes: &'a [ResidentialComplex], name: &str) -> Vec<&'a ResidentialComplex> {
    let lower = name.to_lowercase();
    let matches: Vec<ResidentialComplex> = complexes
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&lower))
        .cloned()
        .collect();
    let deduped_ids: Vec<String> = deduplicate(&matches, name)
        .into_iter()
        .map(|c| c.complex_id.clone())
        .collect();
    complexes
        .iter()
        .filter(|c| deduped_ids.contains(&c.complex_id))
        .collect()
}

/// Excludes complexes whose name is blacklisted or whose `(city,
/// district)` pair is in the district blacklist (§4.4).
pub fn list_excluding_blacklists<'a>(
    complexes: &'a [ResidentialComplex],
    blacklisted_names: &[String],
    blacklisted_districts: &[(String, String)],
) -> Vec<&'a ResidentialComplex> {
    let blacklisted_names_lower: Vec<String> =
        blacklisted_names.iter().map(|n| n.to_lowercase()).collect();
    complexes
        .iter()
        .filter(|c| !blacklisted_names_lower.contains(&c.name.to_lowercase()))
        .filter(|c| {
            !c.district.as_ref().is_some_and(|district| {
                blacklisted_districts
                    .iter()
                    .any(|(city, d)| *city == c.city && d == district)
            })
        })
        .collect()
}
