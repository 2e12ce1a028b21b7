//! Integration tests for tournament functionality
//!
//! These tests drive the complete lifecycle from registration through bracket
//! initialization, result submission and final standings, using the
//! in-memory repository.

#[cfg(test)]
mod tournament_tests {
    use async_trait::async_trait;
    use playoff::bracket::BracketPlan;
    use playoff::db::{BracketRepository, InMemoryRepository};
    use playoff::placement::validate_label;
    use playoff::tournament::{
        BracketEntry, Match, MatchId, MatchStatus, NewPlace, NewTeam, NewTournament, Place, Team,
        TeamId, Tournament, TournamentError, TournamentId, TournamentManager, TournamentResult,
        TournamentStatus,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Manager over a fresh repository with an open tournament of `count` teams.
    ///
    /// Team `i` has members `10i + 1` and `10i + 2`.
    async fn setup(count: usize) -> (TournamentManager, TournamentId, Vec<TeamId>) {
        let manager = TournamentManager::new(Arc::new(InMemoryRepository::new()));
        let (tournament_id, teams) = open_tournament(&manager, "Test Cup", count).await;
        (manager, tournament_id, teams)
    }

    async fn open_tournament(
        manager: &TournamentManager,
        name: &str,
        count: usize,
    ) -> (TournamentId, Vec<TeamId>) {
        let tournament = manager
            .create_tournament(NewTournament {
                name: name.to_string(),
                description: "integration".to_string(),
                limit: 16,
            })
            .await
            .unwrap();

        let mut teams = Vec::new();
        for i in 0..count as i64 {
            let team = manager
                .create_team(NewTeam {
                    name: format!("{name} team {i}"),
                    members: vec![i * 10 + 1, i * 10 + 2],
                })
                .await
                .unwrap();
            manager.register_team(tournament.id, team.id).await.unwrap();
            teams.push(team.id);
        }

        (tournament.id, teams)
    }

    /// Play every decided match with participant 1 winning until none is left
    async fn play_out(manager: &TournamentManager, tournament_id: TournamentId) {
        loop {
            let entries = manager.bracket(tournament_id).await.unwrap();
            let Some(next) = entries.iter().find(|entry| {
                entry.fixture.status == MatchStatus::Scheduled
                    && entry.fixture.participant_count() == 2
            }) else {
                break;
            };

            manager
                .submit_match_result(next.fixture.id, 2, 1)
                .await
                .unwrap();
        }

        let tournament = manager.tournament(tournament_id).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Finished);
    }

    /// Label of every team; both members of a team always share it
    async fn labels_by_team(
        manager: &TournamentManager,
        tournament_id: TournamentId,
    ) -> BTreeMap<TeamId, String> {
        let mut labels = BTreeMap::new();
        for place in manager.places(tournament_id).await.unwrap() {
            assert!(validate_label(&place.label), "bad label {}", place.label);
            let previous = labels.insert(place.team_id, place.label.clone());
            if let Some(previous) = previous {
                assert_eq!(previous, place.label);
            }
        }
        labels
    }

    fn expected(teams: &[TeamId], labels: &[&str]) -> BTreeMap<TeamId, String> {
        teams
            .iter()
            .copied()
            .zip(labels.iter().map(|label| label.to_string()))
            .collect()
    }

    fn match_ids(entries: &[BracketEntry]) -> Vec<MatchId> {
        entries.iter().map(|entry| entry.fixture.id).collect()
    }

    #[tokio::test]
    async fn test_four_team_round_trip() {
        let (manager, tournament_id, teams) = setup(4).await;

        let entries = manager.activate_tournament(tournament_id).await.unwrap();
        let ids = match_ids(&entries);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().map(|e| e.round.number).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
        assert_eq!(entries[0].round.next_match, Some(ids[2]));
        assert_eq!(entries[1].round.next_match, Some(ids[2]));
        assert!(entries[2].round.is_final());

        let tournament = manager.tournament(tournament_id).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Active);
        assert!(tournament.started_at.is_some());

        let updated = manager.submit_match_result(ids[0], 3, 1).await.unwrap();
        assert_eq!(updated.matches.len(), 1);
        assert_eq!(updated.matches[0].id, ids[0]);
        assert_eq!(updated.places.len(), 2);
        assert!(updated.places.iter().all(|p| p.team_id == teams[1]));
        assert!(updated.places.iter().all(|p| p.label == "3-4"));

        let updated = manager.submit_match_result(ids[1], 0, 5).await.unwrap();
        assert_eq!(updated.matches.len(), 2);
        let final_match = &updated.matches[1];
        assert_eq!(final_match.id, ids[2]);
        assert_eq!(final_match.participant1, Some(teams[0]));
        assert_eq!(final_match.participant2, Some(teams[3]));

        let updated = manager.submit_match_result(ids[2], 1, 0).await.unwrap();
        let finished = updated.tournament.expect("tournament finished");
        assert_eq!(finished.status, TournamentStatus::Finished);
        assert!(finished.finished_at.is_some());

        assert_eq!(
            labels_by_team(&manager, tournament_id).await,
            expected(&teams, &["1", "3-4", "3-4", "2"])
        );
        assert_eq!(manager.places(tournament_id).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_five_team_bracket_with_byes() {
        let (manager, tournament_id, teams) = setup(5).await;
        manager.activate_tournament(tournament_id).await.unwrap();

        let entries = manager.bracket(tournament_id).await.unwrap();
        assert_eq!(entries.len(), 6);

        let walk_overs: Vec<_> = entries
            .iter()
            .filter(|e| e.fixture.status == MatchStatus::WalkOver)
            .collect();
        assert_eq!(walk_overs.len(), 2);

        // The seeded bye already holds its team and counts as concluded
        let seeded_bye = walk_overs
            .iter()
            .find(|e| e.round.number == 1)
            .expect("first round bye");
        assert_eq!(seeded_bye.fixture.participant1, Some(teams[2]));
        assert!(seeded_bye.fixture.finished_at.is_some());

        play_out(&manager, tournament_id).await;

        assert_eq!(
            labels_by_team(&manager, tournament_id).await,
            expected(&teams, &["1", "5-5", "3-4", "2", "3-4"])
        );
    }

    #[tokio::test]
    async fn test_nine_teams_nested_byes() {
        let (manager, tournament_id, teams) = setup(9).await;
        manager.activate_tournament(tournament_id).await.unwrap();
        play_out(&manager, tournament_id).await;

        // Two equalizing walk-overs on one side: losers feeding them move up a
        // band, so 9-9 is shared by three teams.
        assert_eq!(
            labels_by_team(&manager, tournament_id).await,
            expected(
                &teams,
                &["1", "9-9", "5-8", "3-4", "5-8", "2", "9-9", "3-4", "9-9"]
            )
        );
    }

    #[tokio::test]
    async fn test_eleven_teams_standings() {
        let (manager, tournament_id, teams) = setup(11).await;
        manager.activate_tournament(tournament_id).await.unwrap();
        play_out(&manager, tournament_id).await;

        assert_eq!(
            labels_by_team(&manager, tournament_id).await,
            expected(
                &teams,
                &[
                    "1", "9-11", "5-8", "3-4", "9-11", "5-8", "2", "9-11", "5-8", "3-4", "5-8"
                ]
            )
        );
    }

    #[tokio::test]
    async fn test_labels_partition_standings() {
        for count in (4..=8).chain(10..=16) {
            let (manager, tournament_id, _) = setup(count).await;
            manager.activate_tournament(tournament_id).await.unwrap();
            play_out(&manager, tournament_id).await;

            let labels = labels_by_team(&manager, tournament_id).await;
            assert_eq!(labels.len(), count, "{count} teams");

            let mut bands: BTreeMap<(usize, usize), usize> = BTreeMap::new();
            for label in labels.values() {
                let (lo, hi) = match label.split_once('-') {
                    Some((lo, hi)) => (lo.parse().unwrap(), hi.parse().unwrap()),
                    None => {
                        let rank = label.parse().unwrap();
                        (rank, rank)
                    }
                };
                *bands.entry((lo, hi)).or_default() += 1;
            }

            let mut next = 1;
            for ((lo, hi), teams) in bands {
                assert_eq!(lo, next, "{count} teams: gap before {lo}-{hi}");
                assert_eq!(teams, hi - lo + 1, "{count} teams: band {lo}-{hi}");
                next = hi + 1;
            }
            assert_eq!(next, count + 1, "{count} teams");
        }
    }

    #[tokio::test]
    async fn test_propagation_is_idempotent() {
        let (manager, tournament_id, _) = setup(4).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        manager.submit_match_result(ids[0], 2, 0).await.unwrap();
        manager.submit_match_result(ids[1], 2, 0).await.unwrap();

        let entries = manager.bracket(tournament_id).await.unwrap();
        let places = manager.places(tournament_id).await.unwrap();

        for id in &ids[..2] {
            let again = manager.propagator().propagate(*id).await.unwrap();
            assert!(again.is_empty(), "match {id} wrote again");
        }

        assert_eq!(manager.bracket(tournament_id).await.unwrap(), entries);
        assert_eq!(manager.places(tournament_id).await.unwrap(), places);
    }

    #[tokio::test]
    async fn test_bracket_built_once() {
        let (manager, tournament_id, teams) = setup(6).await;
        manager.activate_tournament(tournament_id).await.unwrap();

        let err = manager
            .initialize_bracket(tournament_id, &teams)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyExists(_)));
        assert_eq!(manager.bracket(tournament_id).await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_initialize_with_explicit_seeding() {
        let (manager, tournament_id, teams) = setup(4).await;
        let seeding = vec![teams[3], teams[0], teams[2], teams[1]];

        let entries = manager
            .initialize_bracket(tournament_id, &seeding)
            .await
            .unwrap();
        assert_eq!(entries[0].fixture.participant1, Some(teams[3]));
        assert_eq!(entries[0].fixture.participant2, Some(teams[0]));
        assert_eq!(entries[1].fixture.participant1, Some(teams[2]));

        let tournament = manager.tournament(tournament_id).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Active);
    }

    #[tokio::test]
    async fn test_out_of_range_team_count_stores_nothing() {
        let (manager, tournament_id, teams) = setup(3).await;

        let err = manager
            .initialize_bracket(tournament_id, &teams)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));

        let too_many: Vec<TeamId> = (1..=17).collect();
        let err = manager
            .initialize_bracket(tournament_id, &too_many)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));

        let err = manager.activate_tournament(tournament_id).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        assert!(manager.bracket(tournament_id).await.unwrap().is_empty());
        let tournament = manager.tournament(tournament_id).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Opened);
    }

    #[tokio::test]
    async fn test_initialize_rejects_wrong_team_lists() {
        let (manager, tournament_id, teams) = setup(5).await;

        let duplicated = vec![teams[0], teams[1], teams[2], teams[3], teams[3]];
        let err = manager
            .initialize_bracket(tournament_id, &duplicated)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));

        let partial = &teams[..4];
        let err = manager
            .initialize_bracket(tournament_id, partial)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));

        let err = manager.initialize_bracket(999, &teams).await.unwrap_err();
        assert!(matches!(err, TournamentError::NotFound(_)));

        assert!(manager.bracket(tournament_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_initialization_builds_one_bracket() {
        let repo = Arc::new(InMemoryRepository::new());
        let first = TournamentManager::new(repo.clone());
        // A second manager has its own locks; only storage arbitrates.
        let second = TournamentManager::new(repo);
        let (tournament_id, teams) = open_tournament(&first, "Race Cup", 8).await;

        let (a, b, c) = tokio::join!(
            first.initialize_bracket(tournament_id, &teams),
            first.initialize_bracket(tournament_id, &teams),
            second.initialize_bracket(tournament_id, &teams),
        );

        let results = [a, b, c];
        let built = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(built, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, TournamentError::AlreadyExists(_)))
        );
        assert_eq!(first.bracket(tournament_id).await.unwrap().len(), 7);
    }

    /// In-memory storage that yields before every match read and write, so
    /// concurrent callers interleave the way they do over a database connection
    struct YieldingRepository {
        inner: InMemoryRepository,
    }

    #[async_trait]
    impl BracketRepository for YieldingRepository {
        async fn create_team(&self, team: &NewTeam) -> TournamentResult<Team> {
            self.inner.create_team(team).await
        }

        async fn get_team(&self, team_id: TeamId) -> TournamentResult<Option<Team>> {
            self.inner.get_team(team_id).await
        }

        async fn create_tournament(
            &self,
            tournament: &NewTournament,
        ) -> TournamentResult<Tournament> {
            self.inner.create_tournament(tournament).await
        }

        async fn get_tournament(
            &self,
            tournament_id: TournamentId,
        ) -> TournamentResult<Option<Tournament>> {
            tokio::task::yield_now().await;
            self.inner.get_tournament(tournament_id).await
        }

        async fn add_team_to_tournament(
            &self,
            tournament_id: TournamentId,
            team_id: TeamId,
        ) -> TournamentResult<()> {
            self.inner.add_team_to_tournament(tournament_id, team_id).await
        }

        async fn update_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
            self.inner.update_tournament(tournament).await
        }

        async fn create_bracket(&self, plan: &BracketPlan) -> TournamentResult<Vec<BracketEntry>> {
            self.inner.create_bracket(plan).await
        }

        async fn bracket_exists(&self, tournament_id: TournamentId) -> TournamentResult<bool> {
            self.inner.bracket_exists(tournament_id).await
        }

        async fn get_entry(&self, match_id: MatchId) -> TournamentResult<Option<BracketEntry>> {
            tokio::task::yield_now().await;
            self.inner.get_entry(match_id).await
        }

        async fn list_entries(
            &self,
            tournament_id: TournamentId,
        ) -> TournamentResult<Vec<BracketEntry>> {
            self.inner.list_entries(tournament_id).await
        }

        async fn children_of(&self, match_id: MatchId) -> TournamentResult<Vec<Match>> {
            self.inner.children_of(match_id).await
        }

        async fn update_match(&self, expected: &Match, fixture: &Match) -> TournamentResult<bool> {
            tokio::task::yield_now().await;
            self.inner.update_match(expected, fixture).await
        }

        async fn insert_place(&self, place: &NewPlace) -> TournamentResult<Option<Place>> {
            self.inner.insert_place(place).await
        }

        async fn list_places(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Place>> {
            self.inner.list_places(tournament_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_results_across_managers() {
        let repo = Arc::new(YieldingRepository {
            inner: InMemoryRepository::new(),
        });
        let first = TournamentManager::new(repo.clone());
        // Separate managers share no locks; only storage arbitrates.
        let second = TournamentManager::new(repo);
        let (tournament_id, _) = open_tournament(&first, "Split Cup", 4).await;
        let ids = match_ids(&first.activate_tournament(tournament_id).await.unwrap());

        let (a, b) = tokio::join!(
            first.submit_match_result(ids[0], 2, 1),
            second.submit_match_result(ids[0], 1, 2),
        );

        let (accepted, rejected) = match (a, b) {
            (Ok(updated), Err(err)) | (Err(err), Ok(updated)) => (updated, err),
            (a, b) => panic!("expected exactly one accepted result, got {a:?} and {b:?}"),
        };
        assert!(matches!(rejected, TournamentError::BusinessRuleViolation(_)));

        let stored = first
            .bracket(tournament_id)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.fixture.id == ids[0])
            .unwrap()
            .fixture;
        assert_eq!(stored, accepted.matches[0]);

        // Only the accepted result eliminated a team.
        let places = first.places(tournament_id).await.unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places, accepted.places);
    }

    #[tokio::test]
    async fn test_sibling_results_across_managers_fill_parent_once() {
        let repo = Arc::new(YieldingRepository {
            inner: InMemoryRepository::new(),
        });
        let first = TournamentManager::new(repo.clone());
        let second = TournamentManager::new(repo);
        let (tournament_id, teams) = open_tournament(&first, "Twin Cup", 4).await;
        let ids = match_ids(&first.activate_tournament(tournament_id).await.unwrap());

        let (a, b) = tokio::join!(
            first.submit_match_result(ids[0], 4, 2),
            second.submit_match_result(ids[1], 1, 3),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let reported = a
            .matches
            .iter()
            .chain(&b.matches)
            .filter(|m| m.id == ids[2])
            .count();
        assert_eq!(reported, 1);

        let parent = first
            .bracket(tournament_id)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.fixture.id == ids[2])
            .unwrap()
            .fixture;
        assert_eq!(parent.participant1, Some(teams[0]));
        assert_eq!(parent.participant2, Some(teams[3]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sibling_results() {
        let (manager, tournament_id, teams) = setup(8).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        // Matches 0 and 1 both feed match 2.
        let left = {
            let manager = manager.clone();
            let id = ids[0];
            tokio::spawn(async move { manager.submit_match_result(id, 4, 2).await })
        };
        let right = {
            let manager = manager.clone();
            let id = ids[1];
            tokio::spawn(async move { manager.submit_match_result(id, 1, 3).await })
        };
        left.await.unwrap().unwrap();
        right.await.unwrap().unwrap();

        let parent = manager
            .bracket(tournament_id)
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.fixture.id == ids[2])
            .unwrap()
            .fixture;
        assert_eq!(parent.participant1, Some(teams[0]));
        assert_eq!(parent.participant2, Some(teams[3]));
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let (manager, tournament_id, _) = setup(4).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        let (a, b) = tokio::join!(
            manager.submit_match_result(ids[0], 2, 1),
            manager.submit_match_result(ids[0], 1, 2),
        );
        assert!(a.is_ok() != b.is_ok());

        let places = manager.places(tournament_id).await.unwrap();
        assert_eq!(places.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_result_errors() {
        let (manager, tournament_id, _) = setup(5).await;
        let entries = manager.activate_tournament(tournament_id).await.unwrap();
        let ids = match_ids(&entries);

        let err = manager.submit_match_result(ids[0], -1, 2).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));

        let err = manager.submit_match_result(ids[0], 2, 2).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let err = manager.submit_match_result(4040, 2, 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::NotFound(_)));

        // Seeded bye (node 1) and undecided final (node 5)
        let err = manager.submit_match_result(ids[1], 2, 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));
        let err = manager.submit_match_result(ids[5], 2, 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        manager.submit_match_result(ids[0], 2, 1).await.unwrap();
        let err = manager.submit_match_result(ids[0], 3, 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));
        assert!(!err.is_internal());
    }

    #[tokio::test]
    async fn test_results_need_active_tournament() {
        let (manager, tournament_id, _) = setup(4).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        let cancelled = manager.cancel_tournament(tournament_id).await.unwrap();
        assert_eq!(cancelled.status, TournamentStatus::Cancelled);

        let err = manager.submit_match_result(ids[0], 2, 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));
    }

    #[tokio::test]
    async fn test_walk_over_submission() {
        let (manager, tournament_id, teams) = setup(5).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        // Re-driving a seeded bye writes nothing while its sibling is pending
        let updated = manager.submit_walk_over(ids[1]).await.unwrap();
        assert!(updated.is_empty());

        let err = manager.submit_walk_over(ids[0]).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let err = manager.submit_walk_over(ids[5]).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        manager.submit_match_result(ids[0], 0, 1).await.unwrap();
        let err = manager.submit_walk_over(ids[0]).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        // The bye's team reached the round 2 match
        let parent = manager.bracket(tournament_id).await.unwrap();
        let parent = parent.iter().find(|e| e.fixture.id == ids[2]).unwrap();
        assert_eq!(parent.fixture.participant1, Some(teams[1]));
        assert_eq!(parent.fixture.participant2, Some(teams[2]));
    }

    #[tokio::test]
    async fn test_start_match() {
        let (manager, tournament_id, teams) = setup(4).await;
        let ids = match_ids(&manager.activate_tournament(tournament_id).await.unwrap());

        let started = manager.start_match(ids[0]).await.unwrap();
        assert_eq!(started.status, MatchStatus::Ongoing);

        let err = manager.start_match(ids[0]).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let err = manager.start_match(ids[2]).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let updated = manager.submit_match_result(ids[0], 1, 4).await.unwrap();
        assert_eq!(updated.matches[0].status, MatchStatus::Finished);
        assert!(updated.places.iter().all(|p| p.team_id == teams[0]));
    }

    #[tokio::test]
    async fn test_registration_rules() {
        let manager = TournamentManager::new(Arc::new(InMemoryRepository::new()));
        let tournament = manager
            .create_tournament(NewTournament {
                name: "Small Cup".to_string(),
                description: String::new(),
                limit: 4,
            })
            .await
            .unwrap();

        let mut teams = Vec::new();
        for i in 0..5 {
            let team = manager
                .create_team(NewTeam {
                    name: format!("Team {i}"),
                    members: vec![i * 10 + 1],
                })
                .await
                .unwrap();
            teams.push(team.id);
        }
        let overlapping = manager
            .create_team(NewTeam {
                name: "Overlap".to_string(),
                members: vec![99, 1],
            })
            .await
            .unwrap();

        manager.register_team(tournament.id, teams[0]).await.unwrap();

        let err = manager
            .register_team(tournament.id, teams[0])
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let err = manager
            .register_team(tournament.id, overlapping.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        let err = manager.register_team(tournament.id, 777).await.unwrap_err();
        assert!(matches!(err, TournamentError::NotFound(_)));

        for team in &teams[1..4] {
            manager.register_team(tournament.id, *team).await.unwrap();
        }
        let err = manager
            .register_team(tournament.id, teams[4])
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));

        manager.activate_tournament(tournament.id).await.unwrap();
        let err = manager.activate_tournament(tournament.id).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let manager = TournamentManager::new(Arc::new(InMemoryRepository::new()));

        for limit in [3, 17] {
            let err = manager
                .create_tournament(NewTournament {
                    name: "Odd Cup".to_string(),
                    description: String::new(),
                    limit,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, TournamentError::InvalidInput(_)));
        }

        let err = manager
            .create_team(NewTeam {
                name: "Solo".to_string(),
                members: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_finished_tournament_can_not_be_cancelled() {
        let (manager, tournament_id, _) = setup(4).await;
        manager.activate_tournament(tournament_id).await.unwrap();
        play_out(&manager, tournament_id).await;

        let err = manager.cancel_tournament(tournament_id).await.unwrap_err();
        assert!(matches!(err, TournamentError::BusinessRuleViolation(_)));
    }
}
