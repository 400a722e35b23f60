//! Profile metadata: nickname, counters and page count.

use regex::Regex;
use scraper::{Html, Selector};

use crate::constants::LOGIN_PAGE_NICKNAMES;
use crate::parse::{has_exact_class, own_text};

/// Characters of site suffix after the nickname in a profile page title.
const TITLE_SUFFIX_CHARS: usize = 3;

static BRACKETED_NUMBER: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());
static DIV_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("div").unwrap());
static PAGE_COUNT_SELECTOR: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse(r#"input[name="mp"]"#).unwrap());

/// Post, following and follower counts shown on the first listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub posts: u64,
    pub following: u64,
    pub followers: u64,
}

/// Nickname carried by a profile page title.
#[must_use]
pub fn nickname_from_title(title: &str) -> String {
    let chars: Vec<char> = title.trim().chars().collect();
    chars[..chars.len().saturating_sub(TITLE_SUFFIX_CHARS)]
        .iter()
        .collect()
}

/// Whether a page title is the login page's, i.e. the session is gone.
#[must_use]
pub fn is_login_title(title: &str) -> bool {
    LOGIN_PAGE_NICKNAMES.contains(&nickname_from_title(title).as_str())
}

/// Counters from the `div.tip2` summary; `None` when the block is absent.
#[must_use]
pub fn parse_profile_counts(document: &Html) -> Option<ProfileCounts> {
    let tip = document
        .select(&DIV_SELECTOR)
        .find(|div| has_exact_class(div, "tip2"))?;

    let mut numbers = tip
        .children()
        .filter_map(scraper::ElementRef::wrap)
        .filter_map(|child| {
            BRACKETED_NUMBER
                .captures(&own_text(&child))
                .and_then(|caps| caps[1].parse::<u64>().ok())
        });

    Some(ProfileCounts {
        posts: numbers.next().unwrap_or(0),
        following: numbers.next().unwrap_or(0),
        followers: numbers.next().unwrap_or(0),
    })
}

/// Number of listing pages, from the pager's hidden field.
///
/// Single-page timelines render no pager, so a missing field means one page.
#[must_use]
pub fn parse_page_count(document: &Html) -> u32 {
    document
        .select(&PAGE_COUNT_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_from_title() {
        assert_eq!(nickname_from_title("Dear-迪丽热巴的微博"), "Dear-迪丽热巴");
        assert_eq!(nickname_from_title("微博"), "");
    }

    #[test]
    fn test_login_titles() {
        assert!(is_login_title("登录 - 新浪微博"));
        assert!(is_login_title("新浪通行证"));
        assert!(!is_login_title("Dear-迪丽热巴的微博"));
    }

    #[test]
    fn test_profile_counts() {
        let doc = Html::parse_document(
            r#"<div class="tip2"><span class="tc">微博[1234]</span>&nbsp;<a href="/1/follow">关注[56]</a>&nbsp;<a href="/1/fans">粉丝[7890]</a>&nbsp;<a href="/at">分组[1]</a></div>"#,
        );
        assert_eq!(
            parse_profile_counts(&doc),
            Some(ProfileCounts {
                posts: 1234,
                following: 56,
                followers: 7890
            })
        );
        assert_eq!(parse_profile_counts(&Html::parse_document("<p>x</p>")), None);
    }

    #[test]
    fn test_page_count() {
        let doc = Html::parse_document(
            r#"<form><input name="mp" type="hidden" value="25" /><input type="submit" value="跳页"/></form>"#,
        );
        assert_eq!(parse_page_count(&doc), 25);
        assert_eq!(parse_page_count(&Html::parse_document("<div></div>")), 1);
    }
}
