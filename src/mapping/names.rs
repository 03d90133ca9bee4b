//! Bone-name normalization shared by the auto-mapper and skeleton analysis.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Everything up to the last `:` or `|`, e.g. `mixamorig:` or `Armature|`
static NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*[:|]").expect("namespace pattern is valid"));

/// Rig prefixes that are glued to the bone name without a namespace separator
static KNOWN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(mixamorig\d*_?|armature_|bip0*1[ _]?|def[-_]|orig[-_]|mch[-_])")
        .expect("prefix pattern is valid")
});

/// Body-part synonym groups. A word's first group is its primary meaning.
const SYNONYMS: &[&[&str]] = &[
    &["hips", "hip", "pelvis"],
    &["clavicle", "shoulder", "collar", "collarbone"],
    &["upperarm", "arm", "shoulder"],
    &["forearm", "lowerarm", "elbow"],
    &["hand", "wrist"],
    &["thigh", "upperleg", "upleg"],
    &["shin", "lowerleg", "calf", "leg", "knee"],
    &["foot", "ankle"],
    &["toe", "toes", "toebase", "ball"],
    &["head", "skull"],
    &["neck"],
    &["chest", "upperchest", "ribcage"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const fn token(self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }
}

/// Remove namespaces and known rig prefixes. Never returns an empty name.
pub fn strip_prefix(name: &str) -> &str {
    let without_namespace = strip_match(name, &NAMESPACE);
    strip_match(without_namespace, &KNOWN_PREFIX)
}

fn strip_match<'a>(name: &'a str, pattern: &Regex) -> &'a str {
    match pattern.find(name) {
        Some(m) if name[m.end()..].chars().any(char::is_alphanumeric) => &name[m.end()..],
        _ => name,
    }
}

/// Lowercase words of a bone name, split on separators and camelCase humps.
pub fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for part in name.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = part.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
                {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

fn token_side(token: &str) -> Option<Side> {
    match token {
        "l" | "left" => Some(Side::Left),
        "r" | "right" => Some(Side::Right),
        _ => None,
    }
}

/// Split a name into its side and the remaining body words.
fn split_side(name: &str) -> (Option<Side>, Vec<String>) {
    let mut side = None;
    let mut rest = Vec::new();
    for token in tokenize(name) {
        if let Some(s) = token_side(&token) {
            side.get_or_insert(s);
            continue;
        }
        // Lowercase names like "leftarm" carry the side glued on.
        let glued = [("left", Side::Left), ("right", Side::Right)]
            .into_iter()
            .find(|(prefix, _)| token.len() > prefix.len() && token.starts_with(prefix));
        match glued {
            Some((prefix, s)) => {
                side.get_or_insert(s);
                rest.push(token[prefix.len()..].to_string());
            }
            None => rest.push(token),
        }
    }
    (side, rest)
}

/// Left/right hint carried by a bone name.
pub fn side_of(name: &str) -> Option<Side> {
    split_side(strip_prefix(name)).0
}

/// Side-less body part of a name, e.g. `"upperarm"` for `"upperarm_l"`.
pub fn body_part(name: &str) -> String {
    split_side(strip_prefix(name)).1.concat()
}

/// Lowercase, separator-free form with the side collapsed to a leading
/// `l`/`r`: `"LeftUpperArm"`, `"upper_arm.L"` and `"L_UpperArm"` all give
/// `"lupperarm"`.
pub fn canonical_name(name: &str) -> String {
    let (side, rest) = split_side(strip_prefix(name));
    let mut out = String::from(side.map_or("", Side::token));
    for token in rest {
        out.push_str(&token);
    }
    out
}

/// Indices into the synonym table of every group containing `word`, in
/// table order.
pub fn synonym_groups(word: &str) -> Vec<usize> {
    SYNONYMS
        .iter()
        .enumerate()
        .filter(|(_, group)| group.contains(&word))
        .map(|(i, _)| i)
        .collect()
}

/// Edit distance counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
