use scraper::ElementRef;

use crate::constants::{SHOW_MAP_MARKER, VIDEO_ANCHOR_SUFFIX};
use crate::parse::{child_elements, has_exact_class, own_text, TextNormalizer};

const PLACE_HOST: &str = "place.weibo.com";

/// Location a post was tagged with, read from its first content block.
///
/// Only geotagged posts render a "show map" anchor to the place service;
/// the place name itself is the last anchor of the body span, unless that
/// anchor is an inline video link.
#[must_use]
pub fn publish_place(lead_block: ElementRef<'_>, normalizer: &TextNormalizer) -> Option<String> {
    let geotagged = child_elements(lead_block, "a").any(|a| {
        a.value().attr("href").is_some_and(|href| href.contains(PLACE_HOST))
            && own_text(&a).trim() == SHOW_MAP_MARKER
    });
    if !geotagged {
        return None;
    }

    let body_anchors: Vec<ElementRef<'_>> = child_elements(lead_block, "span")
        .filter(|span| has_exact_class(span, "ctt"))
        .flat_map(|span| child_elements(span, "a"))
        .collect();

    let place = match body_anchors.as_slice() {
        [] => return None,
        [.., second_last, last] if is_video_anchor(last) => *second_last,
        [last] if is_video_anchor(last) => return None,
        [.., last] => *last,
    };

    let name = normalizer.normalize(&place).trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn is_video_anchor(anchor: &ElementRef<'_>) -> bool {
    own_text(anchor).trim_end().ends_with(VIDEO_ANCHOR_SUFFIX)
}
