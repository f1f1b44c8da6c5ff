//! Field-level validation of entities before they are stored
//!
//! Each validator returns every problem it finds, so forms and CLIs can
//! report them together. An empty list means the value is valid.

use std::collections::HashSet;

use crate::error::{GolazoError, Result};
use crate::types::{Field, Friendly, Player, Team, Tournament, TournamentFormat};

const MAX_NAME_LENGTH: usize = 60;
const MIN_JERSEY_NUMBER: u8 = 1;
const MAX_JERSEY_NUMBER: u8 = 99;

/// Turn a list of problems into a `Validation` error
pub fn ensure_valid(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GolazoError::Validation(errors))
    }
}

fn check_name(errors: &mut Vec<String>, label: &str, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(format!("{} is required", label));
    } else if trimmed.chars().count() > MAX_NAME_LENGTH {
        errors.push(format!(
            "{} must be at most {} characters",
            label, MAX_NAME_LENGTH
        ));
    }
}

fn check_required(errors: &mut Vec<String>, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", label));
    }
}

/// Validate a player against the rest of the squad
pub fn validate_player(player: &Player, squad: &[Player]) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&mut errors, "Player name", &player.name);

    if !(MIN_JERSEY_NUMBER..=MAX_JERSEY_NUMBER).contains(&player.number) {
        errors.push(format!(
            "Jersey number must be between {} and {}",
            MIN_JERSEY_NUMBER, MAX_JERSEY_NUMBER
        ));
    }
    if squad
        .iter()
        .any(|other| other.id != player.id && other.number == player.number)
    {
        errors.push(format!("Jersey number {} is already taken", player.number));
    }

    errors
}

pub fn validate_team(team: &Team) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&mut errors, "Team name", &team.name);
    check_required(&mut errors, "City", &team.city);
    check_required(&mut errors, "Category", &team.category);
    check_required(&mut errors, "Primary color", &team.colors.primary);

    let mut numbers = HashSet::new();
    for player in &team.players {
        check_name(&mut errors, "Player name", &player.name);
        if !(MIN_JERSEY_NUMBER..=MAX_JERSEY_NUMBER).contains(&player.number) {
            errors.push(format!(
                "Jersey number {} of {} is out of range",
                player.number, player.name
            ));
        }
        if !numbers.insert(player.number) {
            errors.push(format!("Jersey number {} is used twice", player.number));
        }
    }

    errors
}

pub fn validate_club(club: &crate::types::Club) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&mut errors, "Club name", &club.name);
    check_required(&mut errors, "City", &club.location.city);

    if let Some(email) = club.email.as_deref() {
        let valid = email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !valid {
            errors.push(format!("'{}' is not a valid email address", email));
        }
    }
    if let Some(phone) = club.phone.as_deref() {
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !allowed || digits < 6 {
            errors.push(format!("'{}' is not a valid phone number", phone));
        }
    }

    errors
}

pub fn validate_field(field: &Field) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&mut errors, "Field name", &field.name);
    check_required(&mut errors, "City", &field.city);

    if let Some(coords) = field.coordinates {
        if !(-90.0..=90.0).contains(&coords.lat) {
            errors.push(format!("Latitude {} is out of range", coords.lat));
        }
        if !(-180.0..=180.0).contains(&coords.lng) {
            errors.push(format!("Longitude {} is out of range", coords.lng));
        }
    }

    errors
}

/// Validate a tournament's details and rules.
///
/// Team counts and duplicates are checked when the fixture is drawn.
pub fn validate_tournament(tournament: &Tournament) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&mut errors, "Tournament name", &tournament.name);
    check_required(&mut errors, "City", &tournament.city);
    check_required(&mut errors, "Category", &tournament.category);

    let s = &tournament.settings;
    if s.points_win == 0 {
        errors.push("A win must be worth at least one point".to_string());
    }
    if s.points_draw > s.points_win || s.points_loss > s.points_draw {
        errors.push("Points must satisfy win >= draw >= loss".to_string());
    }
    if s.match_minutes == 0 {
        errors.push("Match length must be at least one minute".to_string());
    }

    if tournament.format.has_group_stage() && s.teams_per_group < 2 {
        errors.push("Groups need at least 2 teams".to_string());
    }
    if tournament.format == TournamentFormat::GroupsKnockout {
        if s.classified_per_group == 0 {
            errors.push("At least one team per group must go through".to_string());
        } else if s.classified_per_group >= s.teams_per_group.max(2) {
            errors.push(format!(
                "Only {} of {} teams per group can go through",
                s.teams_per_group.saturating_sub(1),
                s.teams_per_group
            ));
        }
        let groups = tournament.team_ids.len().div_ceil(s.teams_per_group.max(1));
        if groups == 1 && s.classified_per_group < 2 {
            errors.push("A single group must send at least 2 teams to the knockout".to_string());
        }
    }

    errors
}

pub fn validate_friendly(friendly: &Friendly) -> Vec<String> {
    let mut errors = Vec::new();
    check_required(&mut errors, "Location", &friendly.location);

    if friendly.away_team_id.as_deref() == Some(friendly.home_team_id.as_str()) {
        errors.push("A team cannot play a friendly against itself".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Club, Coordinates, FootballType, Location, Position, Surface, TournamentSettings,
    };

    fn team() -> Team {
        Team::new(
            "Estrella Roja".to_string(),
            "Montevideo".to_string(),
            "senior".to_string(),
            FootballType::Eleven,
        )
    }

    #[test]
    fn test_valid_team_has_no_errors() {
        let mut t = team();
        t.players.push(Player::new(&t.id, "Luis".to_string(), 9, Position::Forward));
        assert!(validate_team(&t).is_empty());
    }

    #[test]
    fn test_team_reports_every_problem() {
        let mut t = team();
        t.name = "   ".to_string();
        t.city = String::new();
        t.players.push(Player::new(&t.id, "A".to_string(), 5, Position::Defender));
        t.players.push(Player::new(&t.id, "B".to_string(), 5, Position::Defender));
        t.players.push(Player::new(&t.id, "C".to_string(), 0, Position::Defender));

        let errors = validate_team(&t);
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.contains(&"Team name is required".to_string()));
        assert!(errors.contains(&"Jersey number 5 is used twice".to_string()));
    }

    #[test]
    fn test_long_name_counts_characters() {
        let mut t = team();
        t.name = "ñ".repeat(MAX_NAME_LENGTH);
        assert!(validate_team(&t).is_empty());
        t.name.push('ñ');
        assert_eq!(validate_team(&t).len(), 1);
    }

    #[test]
    fn test_player_against_squad() {
        let squad = vec![Player::new("t", "Uno".to_string(), 10, Position::Midfielder)];

        let clash = Player::new("t", "Dos".to_string(), 10, Position::Forward);
        assert_eq!(validate_player(&clash, &squad), vec!["Jersey number 10 is already taken"]);

        // The same player is not a clash with itself
        assert!(validate_player(&squad[0], &squad).is_empty());

        let too_high = Player::new("t", "Tres".to_string(), 100, Position::Forward);
        assert_eq!(validate_player(&too_high, &squad).len(), 1);
    }

    #[test]
    fn test_club_contact_details() {
        let mut club = Club::new(
            "Club Sol".to_string(),
            Location {
                address: String::new(),
                city: "Asunción".to_string(),
            },
        );
        assert!(validate_club(&club).is_empty());

        club.email = Some("sin-arroba".to_string());
        club.phone = Some("+595 21 123-456".to_string());
        assert_eq!(validate_club(&club).len(), 1);

        club.email = Some("info@clubsol.py".to_string());
        club.phone = Some("call me".to_string());
        assert_eq!(validate_club(&club).len(), 1);
    }

    #[test]
    fn test_field_coordinates_range() {
        let mut field = Field::new(
            "La Bombonerita".to_string(),
            String::new(),
            "Lima".to_string(),
            FootballType::Five,
            Surface::Indoor,
        );
        field.coordinates = Some(Coordinates { lat: 95.0, lng: -77.0 });
        assert_eq!(validate_field(&field), vec!["Latitude 95 is out of range"]);
    }

    fn tournament(format: TournamentFormat, teams: usize) -> Tournament {
        Tournament::new(
            "Copa".to_string(),
            "Cusco".to_string(),
            "senior".to_string(),
            FootballType::Seven,
            format,
            (0..teams).map(|i| i.to_string()).collect(),
            TournamentSettings::default(),
        )
    }

    #[test]
    fn test_tournament_points_order() {
        let mut t = tournament(TournamentFormat::Groups, 4);
        assert!(validate_tournament(&t).is_empty());

        t.settings.points_draw = 4;
        assert_eq!(validate_tournament(&t), vec!["Points must satisfy win >= draw >= loss"]);
    }

    #[test]
    fn test_tournament_classified_per_group() {
        let mut t = tournament(TournamentFormat::GroupsKnockout, 8);
        t.settings.classified_per_group = 4;
        assert_eq!(validate_tournament(&t).len(), 1);

        // One group of four sending a single team leaves no knockout
        let mut single = tournament(TournamentFormat::GroupsKnockout, 4);
        single.settings.classified_per_group = 1;
        assert_eq!(validate_tournament(&single).len(), 1);

        // The same setting is fine with two groups
        t.settings.classified_per_group = 1;
        assert!(validate_tournament(&t).is_empty());
    }

    #[test]
    fn test_friendly_against_itself() {
        let f = Friendly::proposal("a", "a", "Cancha 1".to_string());
        assert_eq!(validate_friendly(&f), vec!["A team cannot play a friendly against itself"]);
    }

    #[test]
    fn test_ensure_valid() {
        assert!(ensure_valid(Vec::new()).is_ok());
        let err = ensure_valid(vec!["x".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
