use crate::common::fixtures::{self, CREATOR};
use assert_matches::assert_matches;
use cadenza::commands::music::utils::checks::{
    DjCandidate, is_dj, validate_dj_addition, validate_dj_removal,
};
use cadenza::commands::music::utils::music_manager::MusicError;
use serenity::all::UserId;
use test_case::test_case;

const AUTHOR: UserId = UserId::new(900);

fn candidate(id: u64, bot: bool, manage_channels: bool) -> DjCandidate {
    DjCandidate {
        id: UserId::new(id),
        bot,
        manage_channels,
    }
}

#[test_case(candidate(1, true, false) ; "bots")]
#[test_case(candidate(900, false, false) ; "the author")]
#[test_case(candidate(2, false, true) ; "members who manage channels")]
#[test_case(candidate(500, false, false) ; "the player creator")]
fn test_rejects(candidate: DjCandidate) {
    let player = fixtures::player();
    assert_matches!(
        validate_dj_addition(&player, AUTHOR, &candidate),
        Err(MusicError::Generic(_))
    );
}

#[test]
fn test_listed_member_cannot_be_added_twice_but_can_be_removed() {
    let mut player = fixtures::player();
    let member = candidate(3, false, false);

    validate_dj_addition(&player, AUTHOR, &member).unwrap();
    player.dj_ids.insert(member.id);

    assert!(validate_dj_addition(&player, AUTHOR, &member).is_err());
    assert!(validate_dj_removal(&player, member.id).is_ok());
    assert!(validate_dj_removal(&player, UserId::new(4)).is_err());
}

#[test]
fn test_sole_listener_is_dj_unless_restricted() {
    let mut player = fixtures::player();
    let listener = UserId::new(7);

    assert!(is_dj(&player, CREATOR, false, false));
    assert!(is_dj(&player, listener, false, true));

    player.restrict_mode = true;
    assert!(!is_dj(&player, listener, false, true));
}
