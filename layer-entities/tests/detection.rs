use std::cmp::Ordering;

use layer_entities::{
    EntityType, FixOptions, FormattedText, MessageEntity, are_entities_valid, compare_entities, find_entities,
    fix_entities, fix_formatted_text, validators::is_valid_bank_card,
};

fn e(kind: EntityType, offset: i32, length: i32) -> MessageEntity {
    MessageEntity::new(kind, offset, length)
}

#[test]
fn finds_mention_url_and_card() {
    let text = "Hello @alice, check https://example.com and call 4111-1111-1111-1111";
    assert_eq!(
        find_entities(text, false, false),
        [
            e(EntityType::Mention, 6, 6),
            e(EntityType::Url, 20, 19),
            e(EntityType::BankCardNumber, 49, 19),
        ]
    );
}

#[test]
fn phone_like_digits_are_not_cards() {
    assert_eq!(find_entities("Call 123-456-7890 now", false, false), []);
}

#[test]
fn email_wins_over_mention() {
    assert_eq!(
        find_entities("email@example.com", false, false),
        [e(EntityType::EmailAddress, 0, 17)]
    );
}

#[test]
fn luhn() {
    assert!(is_valid_bank_card("4111111111111111"));
    assert!(!is_valid_bank_card("4111111111111112"));
}

#[test]
fn offsets_count_utf16_units() {
    assert_eq!(find_entities("😀 #tag", false, false), [e(EntityType::Hashtag, 3, 4)]);
    assert_eq!(find_entities("€ $USD", false, false), [e(EntityType::Cashtag, 2, 4)]);
}

#[test]
fn skipped_kinds() {
    let text = "/start at 1:00";
    assert_eq!(
        find_entities(text, false, false),
        [e(EntityType::BotCommand, 0, 6), MessageEntity::media_timestamp(10, 4, 60)]
    );
    assert_eq!(find_entities(text, true, true), []);
}

// ── Repair ────────────────────────────────────────────────────────────────────

fn messy_entity_lists() -> Vec<Vec<MessageEntity>> {
    vec![
        vec![e(EntityType::Bold, 0, 5), e(EntityType::Bold, 2, 6), e(EntityType::Italic, 1, 3)],
        vec![e(EntityType::Url, 0, 5), e(EntityType::Mention, 2, 5), e(EntityType::Bold, 1, 8)],
        vec![e(EntityType::Code, 2, 4), e(EntityType::Italic, 0, 10), e(EntityType::Hashtag, 3, 2)],
        vec![
            e(EntityType::BlockQuote, 2, 5),
            e(EntityType::Pre, 0, 4),
            e(EntityType::Strikethrough, 1, 9),
            e(EntityType::ExpandableBlockQuote, 4, 4),
        ],
        vec![e(EntityType::Spoiler, 0, 3), e(EntityType::Spoiler, 3, 3), e(EntityType::Underline, 2, 2)],
    ]
}

#[test]
fn fix_entities_is_idempotent() {
    for entities in messy_entity_lists() {
        let mut once = entities.clone();
        fix_entities(&mut once);
        assert!(are_entities_valid(&once), "{entities:?} -> {once:?}");
        let mut twice = once.clone();
        fix_entities(&mut twice);
        assert_eq!(twice, once, "{entities:?}");
    }
}

#[test]
fn fixed_text_is_sorted_and_valid() {
    for entities in messy_entity_lists() {
        let mut text = FormattedText::new("abcdefghij @durov", entities);
        text.fix(&FixOptions::new()).unwrap();
        assert!(text.entities.windows(2).all(|w| compare_entities(&w[0], &w[1]) != Ordering::Greater));
        assert!(are_entities_valid(&text.entities), "{:?}", text.entities);
    }
}

#[test]
fn fix_rejects_bad_input() {
    let mut text = String::from("abc");
    let mut entities = vec![e(EntityType::Bold, 0, 4)];
    let err = fix_formatted_text(&mut text, &mut entities, &FixOptions::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Entity beginning at UTF-16 offset 0 ends after the end of the text at UTF-16 offset 4"
    );
    assert_eq!(entities, [e(EntityType::Bold, 0, 4)]);

    let mut blank = String::from("\n\n");
    assert_eq!(
        fix_formatted_text(&mut blank, &mut Vec::new(), &FixOptions::new()).unwrap_err().to_string(),
        "Text must be non-empty"
    );
}
