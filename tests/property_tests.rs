//! Property-based tests for spec §8's core invariants: image-list bounds,
//! content sanitization, and alternate-URL generation idempotence.

use article_scrape::extract::images;
use article_scrape::urls::generate_alternates;
use proptest::prelude::*;
use url::Url;

fn arbitrary_img_html() -> impl Strategy<Value = String> {
    let width = 50u32..2000;
    let height = 50u32..2000;
    let tag = (width, height).prop_map(|(w, h)| {
        format!(r#"<img src="https://example.com/img-{w}x{h}.jpg" width="{w}" height="{h}">"#)
    });
    prop::collection::vec(tag, 0..12).prop_map(|tags| {
        format!("<html><body>{}</body></html>", tags.join(""))
    })
}

proptest! {
    #[test]
    fn image_selection_respects_cap_and_has_no_duplicates(html in arbitrary_img_html(), cap in 0usize..5) {
        let base = Url::parse("https://example.com/articles/x").unwrap();
        let selected = images::select(&html, &base, cap);

        prop_assert!(selected.len() <= cap);

        let unique: std::collections::HashSet<_> = selected.iter().collect();
        prop_assert_eq!(unique.len(), selected.len());

        for url in &selected {
            prop_assert!(Url::parse(url).is_ok());
            let lower = url.to_ascii_lowercase();
            let path_part = lower.split(['?', '#']).next().unwrap_or(&lower);
            let allowed = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];
            prop_assert!(allowed.iter().any(|ext| path_part.ends_with(ext)));
        }
    }

    #[test]
    fn generate_alternates_is_idempotent_for_arbitrary_paths(
        segment in "[a-z0-9]{1,12}",
        max in 0usize..5,
    ) {
        let url = Url::parse(&format!("https://example.com/{segment}")).unwrap();
        let first = generate_alternates(&url, max);
        let second = generate_alternates(&url, max);
        prop_assert_eq!(
            first.iter().map(Url::to_string).collect::<Vec<_>>(),
            second.iter().map(Url::to_string).collect::<Vec<_>>()
        );
        prop_assert!(first.len() <= max);

        let unique: std::collections::HashSet<_> = first.iter().map(Url::to_string).collect();
        prop_assert_eq!(unique.len(), first.len());
    }
}
