//! Original-versus-repost classification.

use scraper::ElementRef;

use super::model::PostKind;
use crate::parse::{child_elements, has_exact_class};

/// Most `span.cmt` metadata spans an original post renders.
///
/// This is a property of the listing markup, not of the content: the time,
/// edit state and counter spans add up to at most three on an original,
/// and a repost always carries one more for its attribution line. If the
/// markup changes, this constant and [`count_meta_spans`] are the only
/// things to revisit.
pub const ORIGINAL_MAX_META_SPANS: usize = 3;

/// Number of `span.cmt` elements directly inside the entry's `div` blocks.
#[must_use]
pub fn count_meta_spans(entry: ElementRef<'_>) -> usize {
    child_elements(entry, "div")
        .flat_map(|block| child_elements(block, "span"))
        .filter(|span| has_exact_class(span, "cmt"))
        .count()
}

/// Kind implied by a metadata-span count.
#[must_use]
pub fn kind_for_meta_spans(count: usize) -> PostKind {
    if count <= ORIGINAL_MAX_META_SPANS {
        PostKind::Original
    } else {
        PostKind::Repost
    }
}

/// Classify a listing entry.
#[must_use]
pub fn classify(entry: ElementRef<'_>) -> PostKind {
    kind_for_meta_spans(count_meta_spans(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn entry_with_spans(n: usize) -> String {
        let spans = "<span class=\"cmt\">x</span>".repeat(n);
        format!(r#"<div class="c" id="M_A"><div>{spans}</div><div><span class="ct">t</span></div></div>"#)
    }

    fn classify_html(html: &str) -> PostKind {
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse("div.c").unwrap();
        classify(doc.select(&selector).next().unwrap())
    }

    #[test]
    fn test_three_spans_is_original() {
        assert_eq!(classify_html(&entry_with_spans(3)), PostKind::Original);
    }

    #[test]
    fn test_four_spans_is_repost() {
        assert_eq!(classify_html(&entry_with_spans(4)), PostKind::Repost);
    }

    #[test]
    fn test_no_spans_is_original() {
        assert_eq!(classify_html(&entry_with_spans(0)), PostKind::Original);
    }

    #[test]
    fn test_spans_across_blocks_are_summed() {
        let html = r#"<div class="c" id="M_A">
            <div><span class="cmt">转发了 <a>someone</a> 的微博:</span><span class="ctt">x</span></div>
            <div><span class="cmt">赞[1]</span><span class="cmt">原文转发[2]</span></div>
            <div><span class="cmt">转发理由:</span>reason <span class="ct">t</span></div>
        </div>"#;
        assert_eq!(classify_html(html), PostKind::Repost);
    }

    #[test]
    fn test_nested_and_multi_class_spans_do_not_count() {
        let html = r#"<div class="c" id="M_A">
            <div><span class="cmt">a</span><span class="cmt">b</span><span class="cmt">c</span>
                 <p><span class="cmt">nested</span></p><span class="cmt ct">mixed</span></div>
        </div>"#;
        assert_eq!(classify_html(html), PostKind::Original);
    }
}
