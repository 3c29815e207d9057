use assert_matches::assert_matches;
use cadenza::commands::music::utils::music_manager::MusicError;
use cadenza::commands::music::utils::play_args::{addposition_request, parse_legacy_args};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case(0)]
#[case(-3)]
fn test_addposition_rejects_positions_below_one(#[case] position: i64) {
    assert_matches!(
        addposition_request(position, "never gonna give you up"),
        Err(MusicError::Generic(_))
    );
}

#[test]
fn test_addposition_is_zero_based_internally() {
    let request = addposition_request(2, "lofi beats").unwrap();
    assert_eq!(request.position, Some(1));
    assert_eq!(request.query, "lofi beats");
}

#[test]
fn test_flags_are_stripped_from_the_query() {
    let request = parse_legacy_args("-force lofi beats").unwrap();
    assert!(request.force_play);
    assert_eq!(request.query, "lofi beats");
}

#[rstest]
#[case("song -pos 0")]
#[case("--position 2 song")]
fn test_addposition_refuses_a_second_position(#[case] rest: &str) {
    assert_matches!(addposition_request(3, rest), Err(MusicError::Generic(_)));
}
