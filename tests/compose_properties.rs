//! Properties of the document composer that hold for any input

use rfpreview::compose::{HASH_SHIM_SCRIPT, ISOLATOR_SCRIPT, RESET_CSS};
use rfpreview::{compose, render, SourceBundle};

fn samples() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("", "", ""),
        ("<h1>Привет, мир</h1>", "h1::after { content: '→ ✓'; }", "console.log('日本語');"),
        (
            "<a href=\"#x\" onclick=\"alert('&amp;')\">x</a><div id=\"x\"></div>",
            "a[href^=\"#\"] { color: red }",
            "document.querySelector('a').click(); // done",
        ),
        ("<!-- unterminated comment", "/* unterminated", "/* unterminated"),
        (
            "<!DOCTYPE html><html><head><title>Nested</title></head><body><p>doc in doc</p></body></html>",
            "@media (max-width: 600px) { body { margin: 0 } }",
            "window.addEventListener('load', () => { history.pushState({}, '', '/elsewhere'); });",
        ),
    ]
}

#[test]
fn compose_is_deterministic_for_all_samples() {
    for (h, c, j) in samples() {
        assert_eq!(compose(h, c, j), compose(h, c, j));
    }
}

#[test]
fn inputs_are_contained_verbatim_in_their_regions() {
    for (h, c, j) in samples() {
        let doc = compose(h, c, j);

        let style_start = doc.find("<style>\n").unwrap() + "<style>\n".len();
        let style_region = &doc[style_start..];
        assert!(style_region.starts_with(&format!("{}{}", RESET_CSS, c)), "css not verbatim for {:?}", c);

        let head_close = format!("{}</script>\n</head>\n<body>\n", ISOLATOR_SCRIPT);
        let body_start = doc.find(&head_close).unwrap() + head_close.len();
        let body_region = &doc[body_start..];
        assert!(body_region.starts_with(h), "html not verbatim for {:?}", h);

        let tail = format!("\n<script>\n{}\n{}</script>\n</body>\n</html>\n", j, HASH_SHIM_SCRIPT);
        assert!(doc.ends_with(&tail), "js not verbatim for {:?}", j);
        assert_eq!(&doc[body_start + h.len()..], tail);
    }
}

#[test]
fn only_the_three_sources_vary() {
    let a = compose("A", "B", "C");
    let b = compose("AA", "BB", "CC");
    assert_eq!(a.len() + 3, b.len());
    assert_eq!(compose("", "", "").len() + 3, a.len());
}

#[test]
fn render_matches_compose() {
    let bundle = SourceBundle::starter();
    let doc = render(&bundle);
    assert_eq!(doc.as_str(), compose(&bundle.html, &bundle.css, &bundle.js));
    assert_eq!(doc, render(&bundle.clone()));
}

#[test]
fn no_escaping_is_applied() {
    let doc = compose("<b>&lt;&</b>", "p::before{content:\"<>\"}", "if (a < b && c > d) {}");
    assert!(doc.contains("<b>&lt;&</b>"));
    assert!(doc.contains("content:\"<>\""));
    assert!(doc.contains("if (a < b && c > d) {}"));
    assert!(!doc.contains("&amp;lt;"));
}
