use draftguard_common::GuardResult;

use crate::references::{has_references_section, reference_links, REFERENCES_HEADING};

pub const SECTION_GUARD: &str = "References section";
pub const LINKS_GUARD: &str = "Reference links";

pub fn check_references_section(body: &str) -> GuardResult {
    if has_references_section(body) {
        GuardResult::pass(SECTION_GUARD, "Found")
    } else {
        GuardResult::fail(SECTION_GUARD, format!("Missing '{REFERENCES_HEADING}' section"))
    }
}

pub fn check_reference_links(body: &str, min_links: usize) -> GuardResult {
    let found = reference_links(body).len();
    let detail = format!("Found {found}, need at least {min_links}");
    if found >= min_links {
        GuardResult::pass(LINKS_GUARD, detail)
    } else {
        GuardResult::fail(LINKS_GUARD, detail)
    }
}
