//! End-to-end tournament runs through the service layer, on a file database

use libgolazo::config::{DatabaseConfig, DefaultsConfig};
use libgolazo::service::events::Event;
use libgolazo::service::teams::NewTeam;
use libgolazo::service::tournaments::{Advance, MatchResult, NewTournament};
use libgolazo::{
    Config, FootballType, GolazoService, MatchStatus, Phase, TournamentFormat, TournamentSettings,
    TournamentStatus,
};
use tempfile::TempDir;

async fn setup_test_service() -> (GolazoService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("golazo.db");

    let config = Config {
        database: DatabaseConfig {
            path: db_path.to_str().unwrap().to_string(),
        },
        defaults: DefaultsConfig::default(),
        tournament: TournamentSettings::default(),
        profile: None,
    };

    let service = GolazoService::from_config(config).await.unwrap();
    (service, temp_dir)
}

async fn create_teams(service: &GolazoService, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        let team = service
            .teams()
            .create(NewTeam {
                name: name.to_string(),
                city: "Rosario".to_string(),
                category: "senior".to_string(),
                football_type: FootballType::Seven,
                colors: Default::default(),
                club_id: None,
                crest: None,
                players: Vec::new(),
            })
            .await
            .unwrap();
        ids.push(team.id);
    }
    ids
}

fn score(home_goals: u32, away_goals: u32) -> MatchResult {
    MatchResult {
        home_goals,
        away_goals,
        penalties: None,
    }
}

#[tokio::test]
async fn test_four_team_groups_knockout_to_champion() {
    let (service, _temp_dir) = setup_test_service().await;
    let teams = create_teams(&service, &["Atlético", "Boca", "Central", "Deportivo"]).await;
    let tournaments = service.tournaments();
    let mut events = service.subscribe();

    let t = tournaments
        .create(NewTournament {
            name: "Copa de Barrio".to_string(),
            city: "Rosario".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Seven,
            format: TournamentFormat::GroupsKnockout,
            team_ids: teams.clone(),
            settings: None,
            seed: Some(2024),
        })
        .await
        .unwrap();
    tournaments.start(&t.id).await.unwrap();

    // One group of four: six matches over three rounds
    let matches = tournaments.matches(&t.id).await.unwrap();
    assert_eq!(matches.len(), 6);
    assert_eq!(matches.iter().map(|m| m.round).max(), Some(3));

    // The team drawn first wins everything, the second beats the rest,
    // everything else is a draw
    let order = &t.team_ids;
    for m in &matches {
        let rank = |id: &str| order.iter().position(|t| t == id).unwrap();
        let (home, away) = (rank(&m.home_team_id), rank(&m.away_team_id));
        let result = match (home.min(away), home < away) {
            (0, true) | (1, true) => score(2, 0),
            (0, false) | (1, false) => score(0, 2),
            _ => score(1, 1),
        };
        tournaments.record_result(&m.id, result).await.unwrap();
    }

    let table = tournaments.standings(&t.id).await.unwrap();
    assert_eq!(table.len(), 1);
    let rows = &table[0].rows;
    assert_eq!(rows[0].team_id, order[0]);
    assert_eq!(rows[0].points, 9);
    assert_eq!(rows[1].team_id, order[1]);
    assert_eq!(rows[1].points, 6);

    // Top two meet in the final
    let final_match = match tournaments.advance(&t.id).await.unwrap() {
        Advance::NextRound {
            round,
            stage,
            matches,
        } => {
            assert_eq!(round, 4);
            assert_eq!(stage, "final");
            assert_eq!(matches.len(), 1);
            matches.into_iter().next().unwrap()
        }
        other => panic!("expected a knockout round, got {:?}", other),
    };
    assert!(final_match.involves(&order[0]) && final_match.involves(&order[1]));
    assert_eq!(tournaments.get(&t.id).await.unwrap().phase, Phase::Knockout);

    let result = if final_match.home_team_id == order[1] {
        score(3, 1)
    } else {
        score(1, 3)
    };
    tournaments.record_result(&final_match.id, result).await.unwrap();

    match tournaments.advance(&t.id).await.unwrap() {
        Advance::Finished { champion_id } => assert_eq!(champion_id.as_deref(), Some(order[1].as_str())),
        other => panic!("expected the tournament to finish, got {:?}", other),
    }

    let done = tournaments.get(&t.id).await.unwrap();
    assert_eq!(done.status, TournamentStatus::Finished);
    assert_eq!(done.phase, Phase::Finished);
    assert!(tournaments
        .matches(&t.id)
        .await
        .unwrap()
        .iter()
        .all(|m| m.status == MatchStatus::Finished));

    let entries = service.database().tournament_entries(&t.id).await.unwrap();
    let still_in: Vec<_> = entries.iter().filter(|e| !e.eliminated).collect();
    assert_eq!(still_in.len(), 1);
    assert_eq!(still_in[0].team_id, order[1]);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds.first(), Some(&"tournament_created"));
    assert!(kinds.contains(&"phase_advanced"));
    assert_eq!(kinds.last(), Some(&"tournament_finished"));

    // Teams of a finished tournament can be deleted again
    service.teams().delete(&order[3]).await.unwrap();
}

#[tokio::test]
async fn test_two_groups_cross_over_into_semifinals() {
    let (service, _temp_dir) = setup_test_service().await;
    let names = ["A1", "A2", "A3", "A4", "B1", "B2", "B3", "B4"];
    let teams = create_teams(&service, &names).await;
    let tournaments = service.tournaments();

    let t = tournaments
        .create(NewTournament {
            name: "Torneo Apertura".to_string(),
            city: "Rosario".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Seven,
            format: TournamentFormat::GroupsKnockout,
            team_ids: teams,
            settings: None,
            seed: Some(7),
        })
        .await
        .unwrap();
    tournaments.start(&t.id).await.unwrap();

    for m in tournaments.matches(&t.id).await.unwrap() {
        tournaments.record_result(&m.id, score(1, 0)).await.unwrap();
    }

    let tables = tournaments.standings(&t.id).await.unwrap();
    assert_eq!(tables.len(), 2);
    let (a, b) = (&tables[0].rows, &tables[1].rows);

    match tournaments.advance(&t.id).await.unwrap() {
        Advance::NextRound { stage, matches, .. } => {
            assert_eq!(stage, "semifinal");
            assert_eq!(matches.len(), 2);
            // Group winners meet the other group's runner-up
            assert!(matches[0].involves(&a[0].team_id) && matches[0].involves(&b[1].team_id));
            assert!(matches[1].involves(&b[0].team_id) && matches[1].involves(&a[1].team_id));
        }
        other => panic!("expected semifinals, got {:?}", other),
    }
}

#[tokio::test]
async fn test_standings_are_idempotent() {
    let (service, _temp_dir) = setup_test_service().await;
    let teams = create_teams(&service, &["Uno", "Dos", "Tres", "Cuatro", "Cinco"]).await;
    let tournaments = service.tournaments();

    let t = tournaments
        .create(NewTournament {
            name: "Liga".to_string(),
            city: "Rosario".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Seven,
            format: TournamentFormat::Groups,
            team_ids: teams,
            settings: Some(TournamentSettings {
                teams_per_group: 5,
                ..TournamentSettings::default()
            }),
            seed: Some(99),
        })
        .await
        .unwrap();
    tournaments.start(&t.id).await.unwrap();

    let matches = tournaments.matches(&t.id).await.unwrap();
    assert_eq!(matches.len(), 10);
    for (i, m) in matches.iter().enumerate().take(6) {
        tournaments
            .record_result(&m.id, score(i as u32 % 3, 1))
            .await
            .unwrap();
    }

    let first = tournaments.standings(&t.id).await.unwrap();
    let second = tournaments.standings(&t.id).await.unwrap();
    assert_eq!(first[0].rows, second[0].rows);

    let played: u32 = first[0].rows.iter().map(|r| r.played).sum();
    assert_eq!(played, 12);
}

#[tokio::test]
async fn test_events_resolve_to_followers() {
    let (service, _temp_dir) = setup_test_service().await;
    let teams = create_teams(&service, &["X", "Y", "Z"]).await;
    let fan = service
        .users()
        .create("Hincha", libgolazo::Role::Spectator)
        .await
        .unwrap();

    let t = service
        .tournaments()
        .create(NewTournament {
            name: "Copita".to_string(),
            city: "Rosario".to_string(),
            category: "senior".to_string(),
            football_type: FootballType::Seven,
            format: TournamentFormat::Groups,
            team_ids: teams,
            settings: None,
            seed: None,
        })
        .await
        .unwrap();
    service.database().follow(&fan.id, &t.id).await.unwrap();

    let event = Event::TournamentStarted {
        tournament_id: t.id.clone(),
    };
    let targets = service.notify_targets(&event).await.unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "Hincha");
}
