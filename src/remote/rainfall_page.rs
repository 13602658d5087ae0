use regex::Regex;

use crate::utils::constants::RAINFALL_LINK_TITLE;

/// Find the href of the anchor that carries the daily-rainfall archive title.
///
/// The page is scanned tag by tag so the title and href attributes may appear
/// in either order. When several anchors match, the first one wins.
pub fn find_archive_link(html: &str) -> Option<String> {
    let anchor = Regex::new(r"(?is)<a\s[^>]*>").expect("static regex");
    let title = Regex::new(&format!(
        r#"(?i)title\s*=\s*["']{}["']"#,
        regex::escape(RAINFALL_LINK_TITLE)
    ))
    .expect("static regex");
    let href = Regex::new(r#"(?i)href\s*=\s*["']([^"']*)["']"#).expect("static regex");

    for tag in anchor.find_iter(html) {
        if !title.is_match(tag.as_str()) {
            continue;
        }
        if let Some(captures) = href.captures(tag.as_str()) {
            return Some(captures[1].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_found() {
        let html = r#"
            <html><body>
            <a href="/other">unrelated</a>
            <a title="Data file for daily rainfall data for all years"
               href="/jsp/ncc/cdio/weatherData/av?p_display_type=dailyZippedDataFile&p_stn_num=009519">
               All years of data</a>
            </body></html>"#;

        let link = find_archive_link(html).unwrap();
        assert!(link.contains("dailyZippedDataFile"));
    }

    #[test]
    fn test_attribute_order_does_not_matter() {
        let html = r#"<a href="/zip" title="Data file for daily rainfall data for all years">x</a>"#;
        assert_eq!(find_archive_link(html), Some("/zip".to_string()));
    }

    #[test]
    fn test_first_match_wins() {
        let html = r#"
            <a title="Data file for daily rainfall data for all years" href="/first">x</a>
            <a title="Data file for daily rainfall data for all years" href="/second">y</a>"#;
        assert_eq!(find_archive_link(html), Some("/first".to_string()));
    }

    #[test]
    fn test_missing_link() {
        assert_eq!(find_archive_link("<html><body>nothing</body></html>"), None);
    }
}
