//! Pseudo-element stripping.
//!
//! A pseudo-element never matches an element of its own, so before a
//! selector is tested against the document its pseudo-element tokens are
//! taken out: `a::before` is live whenever `a` is.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Pseudo-elements accepted with or without a vendor prefix, in either
/// colon form (`:before`, `::before`, `::-moz-selection`).
const PSEUDO_ELEMENTS: &[&str] = &[
    "after",
    "backdrop",
    "before",
    "cue",
    "cue-region",
    "details-content",
    "file-selector-button",
    "first-letter",
    "first-line",
    "grammar-error",
    "highlight",
    "marker",
    "part",
    "picker",
    "placeholder",
    "scroll-marker",
    "scroll-marker-group",
    "selection",
    "slotted",
    "spelling-error",
    "target-text",
    "view-transition",
    "view-transition-group",
    "view-transition-image-pair",
    "view-transition-new",
    "view-transition-old",
];

/// Pseudo-elements that only exist behind a vendor prefix
/// (`::-webkit-scrollbar`, `:-ms-input-placeholder`).
const VENDOR_PSEUDO_ELEMENTS: &[&str] = &[
    "browse",
    "calendar-picker-indicator",
    "check",
    "clear",
    "color-swatch",
    "color-swatch-wrapper",
    "details-marker",
    "expand",
    "file-upload-button",
    "fill-lower",
    "fill-upper",
    "focus-inner",
    "inner-spin-button",
    "input-placeholder",
    "meter-bar",
    "outer-spin-button",
    "progress-bar",
    "progress-value",
    "range-progress",
    "range-thumb",
    "range-track",
    "resizer",
    "reveal",
    "scrollbar",
    "scrollbar-button",
    "scrollbar-corner",
    "scrollbar-thumb",
    "scrollbar-track",
    "scrollbar-track-piece",
    "search-cancel-button",
    "search-decoration",
    "search-results-button",
    "slider-runnable-track",
    "slider-thumb",
    "thumb",
    "ticks-after",
    "ticks-before",
    "tooltip",
    "track",
    "value",
];

const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

lazy_static! {
    /// `:name`, `::name` or `::name(args)`.
    static ref PSEUDO_TOKEN: Regex =
        Regex::new(r"::?(-?[A-Za-z_][A-Za-z0-9_-]*)(\([^)]*\))?").unwrap();
}

/// Whether `name` (without colons) is a pseudo-element.
pub fn is_pseudo_element(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let unprefixed = VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix));
    match unprefixed {
        Some(base) => PSEUDO_ELEMENTS.contains(&base) || VENDOR_PSEUDO_ELEMENTS.contains(&base),
        None => PSEUDO_ELEMENTS.contains(&lower.as_str()),
    }
}

/// `selector` with every pseudo-element token removed.
///
/// Returns an empty string when nothing but pseudo-elements remains
/// (`::selection`); such a selector counts as live. A token that made up a
/// whole compound becomes `*` so the rest keeps its shape:
/// `ul > ::marker` becomes `ul > *`.
pub fn pseudoless(selector: &str) -> String {
    let bare = strip(selector, false);
    if bare.trim().is_empty() {
        return String::new();
    }
    strip(selector, true).trim().to_string()
}

fn strip(selector: &str, fill_compounds: bool) -> String {
    PSEUDO_TOKEN
        .replace_all(selector, |caps: &Captures<'_>| {
            let token = &caps[0];
            let start = caps.get(0).map_or(0, |m| m.start());
            let before = selector[..start].chars().next_back();

            // `.print\:before` is a class name, not a pseudo-element.
            if before == Some('\\') || !is_pseudo_element(&caps[1]) {
                return token.to_string();
            }

            let opens_compound = matches!(before, None | Some(' ' | '\t' | '\n' | '>' | '+' | '~' | ',' | '('));
            if fill_compounds && opens_compound {
                "*".to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}
