//! Resolver Integration Tests
//!
//! Tier selection scenarios, tier priority, score bounds and position hints.

use textanchor::anchor::{walk_text_nodes, AnchorError, MatchResolver, PositionEstimator};
use textanchor::dom::parse_html;
use textanchor::domain::{MatchTier, NodeRange, PositionHint};

#[test]
fn test_equal_paragraph_matches_whole_paragraph() {
    let doc = parse_html(
        "<body>\
           <p>An unrelated opening paragraph about something else entirely.</p>\
           <p>The quick   brown fox\n jumps over the lazy dog near the river</p>\
         </body>",
    );

    let result = MatchResolver::default()
        .resolve_text(&doc, "The quick brown fox jumps over the lazy dog near the river")
        .unwrap();

    // the extra whitespace rules out a verbatim hit
    assert_eq!(result.tier, MatchTier::Normalized);
    assert_eq!(result.score, 1.0);
    assert!(result.anchor.is_whole_element());
    assert_eq!(doc.tag(result.anchor.node()), Some("p"));
    assert!(doc.text_content(result.anchor.node()).contains("lazy dog"));
}

#[test]
fn test_three_of_five_words_selects_fuzzy() {
    let doc = parse_html(
        "<body>\
           <p>Completely different material about gardening tomatoes.</p>\
           <p>ownership rules prevent memory leaks</p>\
         </body>",
    );

    let result = MatchResolver::default()
        .resolve_text(&doc, "ownership rules prevent dangling pointers")
        .unwrap();

    assert_eq!(result.tier, MatchTier::Fuzzy);
    assert!((result.score - 0.6).abs() < 1e-9);
    assert_eq!(
        doc.text_content(result.anchor.node()),
        "ownership rules prevent memory leaks"
    );
}

#[test]
fn test_no_overlap_selects_article() {
    let article = "Tomatoes need sunlight and water every morning. ".repeat(11);
    let html = format!(
        "<body><nav>Home</nav><article>{}</article><footer>Imprint</footer></body>",
        article
    );
    let doc = parse_html(&html);
    assert!(doc.text_content(doc.body()).chars().count() > 500);

    let result = MatchResolver::default()
        .resolve_text(&doc, "quantum entanglement experiments confirm nonlocality")
        .unwrap();

    assert_eq!(result.tier, MatchTier::Structural);
    assert_eq!(result.score, 0.0);
    assert_eq!(doc.tag(result.anchor.node()), Some("article"));
}

#[test]
fn test_exact_beats_earlier_fuzzy_candidate() {
    // the first paragraph would pass the fuzzy tier, the second contains the probe verbatim
    let doc = parse_html(
        "<body>\
           <p>ownership rules prevent dangling memory</p>\
           <p>Intro. ownership rules prevent dangling pointers. Outro.</p>\
         </body>",
    );

    let result = MatchResolver::default()
        .resolve_text(&doc, "ownership rules prevent dangling pointers")
        .unwrap();

    assert_eq!(result.tier, MatchTier::Exact);
    match result.anchor {
        NodeRange::Text {
            node,
            start_offset,
            end_offset,
        } => {
            let text = doc.text(node).unwrap();
            assert_eq!(
                &text[start_offset..end_offset],
                "ownership rules prevent dangling pointers"
            );
        }
        other => panic!("Expected a text range, got {:?}", other),
    }
}

#[test]
fn test_scores_stay_in_bounds() {
    let documents = [
        "<body><p>The borrow checker enforces aliasing rules at compile time.</p></body>",
        "<body><p>the BORROW checker enforces aliasing rules at compile time</p></body>",
        "<body><p>borrow checker aliasing rules enforced somewhere else</p></body>",
        "<body><p>Checker words appear here without much else.</p></body>",
        "<body><main>unrelated filler text that keeps going for a while</main></body>",
    ];
    let probe = "The borrow checker enforces aliasing rules at compile time.";
    let resolver = MatchResolver::default();

    for html in documents {
        let doc = parse_html(html);
        let result = resolver.resolve_text(&doc, probe).unwrap();
        assert!(
            (0.0..=1.0).contains(&result.score),
            "score {} out of bounds for {}",
            result.score,
            html
        );
        if result.score == 1.0 {
            assert!(matches!(result.tier, MatchTier::Exact | MatchTier::Normalized));
        }
        if result.tier == MatchTier::Structural {
            assert_eq!(result.score, 0.0);
        }
    }
}

#[test]
fn test_input_too_short_and_empty_document() {
    let doc = parse_html("<body><p>Some perfectly normal paragraph text.</p></body>");
    assert!(matches!(
        MatchResolver::default().resolve_text(&doc, "too short"),
        Err(AnchorError::InputTooShort { .. })
    ));

    let empty = parse_html("<body></body>");
    assert!(matches!(
        MatchResolver::default().resolve_text(&empty, "a long enough probe sentence here"),
        Err(AnchorError::NoCandidates)
    ));
}

#[test]
fn test_position_anchor_is_monotonic() {
    let doc = parse_html(
        "<body>\
           <h1>Chapter one</h1>\
           <p>It was a bright cold day in April.</p>\
           <p>The clocks were striking thirteen.</p>\
           <ul><li>first item</li><li>second item</li></ul>\
         </body>",
    );
    let leaves = walk_text_nodes(&doc, doc.root());
    let total: usize = leaves
        .iter()
        .map(|&leaf| doc.text(leaf).unwrap().split_whitespace().count())
        .sum();
    let estimator = PositionEstimator::new();

    let mut previous = (0, 0);
    for start in 0..total {
        let anchor = estimator
            .estimate_detailed(&doc, &PositionHint::new(start, None))
            .unwrap();
        let NodeRange::Text {
            node, start_offset, ..
        } = anchor.range
        else {
            panic!("Expected a text range");
        };
        let leaf_index = leaves.iter().position(|&leaf| leaf == node).unwrap();
        let current = (leaf_index, start_offset);
        assert!(current >= previous, "word {} moved backwards", start);
        previous = current;
    }

    assert!(matches!(
        estimator.estimate(&doc, &PositionHint::new(total, None)),
        Err(AnchorError::StaleHint { .. })
    ));
}
