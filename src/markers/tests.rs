use super::*;

// ===================================================================
// Lead marker
// ===================================================================

#[test]
fn test_extract_lead_inline() {
    let (visible, lead) = extract_lead("Hello [LEAD_CONFIRMED: 3-pack] world");
    assert_eq!(visible, "Hello world");
    assert_eq!(lead.unwrap().confirmed_product, "3-pack");
}

#[test]
fn test_extract_lead_no_marker_is_unchanged() {
    let (visible, lead) = extract_lead("no marker here");
    assert_eq!(visible, "no marker here");
    assert!(lead.is_none());

    // Untrimmed input comes back byte-for-byte.
    let (visible, _) = extract_lead("  spaced  ");
    assert_eq!(visible, "  spaced  ");
}

#[test]
fn test_extract_lead_on_own_line() {
    let raw = "Perfect, reserved for you!\n[LEAD_CONFIRMED: Blue 3-pack]\nOur team will call you today.";
    let (visible, lead) = extract_lead(raw);
    assert_eq!(
        visible,
        "Perfect, reserved for you!\nOur team will call you today."
    );
    assert_eq!(lead.unwrap().confirmed_product, "Blue 3-pack");
}

#[test]
fn test_extract_lead_at_end() {
    let (visible, lead) = extract_lead("تم الحجز ✅ [LEAD_CONFIRMED: عرض 3 قطع]");
    assert_eq!(visible, "تم الحجز ✅");
    assert_eq!(lead.unwrap().confirmed_product, "عرض 3 قطع");
}

#[test]
fn test_extract_lead_first_wins_all_stripped() {
    let raw = "Done [LEAD_CONFIRMED: A] and [LEAD_CONFIRMED: B] ok";
    let (visible, lead) = extract_lead(raw);
    assert_eq!(visible, "Done and ok");
    assert_eq!(lead.unwrap().confirmed_product, "A");
}

#[test]
fn test_extract_lead_empty_payload() {
    let (visible, lead) = extract_lead("Thanks! [LEAD_CONFIRMED]");
    assert_eq!(visible, "Thanks!");
    assert_eq!(lead.unwrap().confirmed_product, "");

    let (_, lead) = extract_lead("Thanks! [LEAD_CONFIRMED:   ]");
    assert_eq!(lead.unwrap().confirmed_product, "");
}

#[test]
fn test_extract_lead_unclosed_runs_to_end_of_line() {
    let (visible, lead) = extract_lead("Great [LEAD_CONFIRMED: 3-pack\nSee you soon.");
    assert_eq!(visible, "Great\nSee you soon.");
    assert_eq!(lead.unwrap().confirmed_product, "3-pack");
}

#[test]
fn test_extract_lead_is_case_sensitive() {
    let raw = "ok [lead_confirmed: x]";
    let (visible, lead) = extract_lead(raw);
    assert_eq!(visible, raw);
    assert!(lead.is_none());
}

#[test]
fn test_extract_lead_ignores_lookalike_tags() {
    let raw = "[LEAD_CONFIRMED_LATER: x] then [LEAD_CONFIRMED: y]";
    let (visible, lead) = extract_lead(raw);
    assert_eq!(lead.unwrap().confirmed_product, "y");
    assert_eq!(visible, "[LEAD_CONFIRMED_LATER: x] then");
}

#[test]
fn test_strip_lead_markers_leaves_no_tag() {
    let visible = strip_lead_markers("Great! [LEAD_CONFIRMED: 3-pack] We ship tomorrow.");
    assert!(!visible.contains(LEAD_MARKER_TAG));
    assert_eq!(visible, "Great! We ship tomorrow.");
}

// ===================================================================
// Completeness
// ===================================================================

#[test]
fn test_trailing_bare_digit_is_incomplete() {
    assert!(looks_incomplete("The 3-pack costs 1"));
    assert!(looks_incomplete("السعر ١٤"));
}

#[test]
fn test_list_value_digit_is_complete() {
    assert!(!looks_incomplete("Price: 99"));
    assert!(!looks_incomplete("Qty = 3"));
    assert!(!looks_incomplete("3"));
}

#[test]
fn test_short_reply_without_punctuation_is_complete() {
    assert!(!looks_incomplete("Hi there"));
    assert!(!looks_incomplete(""));
}

#[test]
fn test_long_reply_without_terminal_punctuation_is_incomplete() {
    let long = format!("{}. {}", "word ".repeat(20), "more words ".repeat(20));
    assert!(long.chars().count() > PUNCTUATION_CHECK_MIN_CHARS);
    assert!(looks_incomplete(&long));

    let finished = format!("{}.", long);
    assert!(!looks_incomplete(&finished));
}

#[test]
fn test_join_continuation() {
    assert_eq!(join_continuation("It costs 1", "49 SAR."), "It costs 149 SAR.");
    assert_eq!(join_continuation("We deliver to", "Jeddah."), "We deliver to Jeddah.");
    assert_eq!(join_continuation("Done", "."), "Done.");
    assert_eq!(join_continuation("Done ", "now."), "Done now.");
    assert_eq!(join_continuation("Done", ""), "Done");
}

#[test]
fn test_trim_to_last_sentence_keeps_enough() {
    let text = "We have the blue and red versions in stock today. Delivery takes two days. Which color do";
    assert_eq!(
        trim_to_last_sentence(text),
        "We have the blue and red versions in stock today. Delivery takes two days."
    );
}

#[test]
fn test_trim_to_last_sentence_refuses_large_cut() {
    let text = "Yes. The three-pack bundle includes the charger, the case, and the cable for";
    assert_eq!(trim_to_last_sentence(text), text);
}

#[test]
fn test_trim_to_last_sentence_ignores_decimals_and_list_numbers() {
    let text = "Options:\n1. Blue\n2. Red costs 9.5 and comes wi";
    // The only real boundary is the colon ending the first line, which would keep too little.
    assert_eq!(trim_to_last_sentence(text), text);

    let text = "Sure! Here are the two options we have for you today:\nBlue or red, both are ava";
    assert_eq!(
        trim_to_last_sentence(text),
        "Sure! Here are the two options we have for you today:"
    );
}

#[test]
fn test_trim_to_last_sentence_complete_text_unchanged() {
    assert_eq!(trim_to_last_sentence("All good.  "), "All good.");
    assert_eq!(trim_to_last_sentence("no boundary"), "no boundary");
}
