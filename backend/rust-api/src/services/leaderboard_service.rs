use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::GameResult;
use crate::models::{
    leaderboard::{
        DayEntry, DayLeaderboard, GlobalEntry, GlobalLeaderboard, GlobalMetric, PlayerTotals,
    },
    player::Player,
    progress::Progress,
    Language,
};
use crate::store::GameStore;

pub const LEADERBOARD_SIZE: usize = 50;

/// Solved first, then higher score, then whoever finished earlier.
fn compare_rows(a: &Progress, b: &Progress) -> Ordering {
    b.solved
        .cmp(&a.solved)
        .then_with(|| b.score.cmp(&a.score))
        .then_with(|| match (a.last_attempt_at, b.last_attempt_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Ranks one day's rows, keeping only the best row per canonical identity.
pub fn rank_day(mut rows: Vec<(Progress, Player)>) -> Vec<DayEntry> {
    rows.retain(|(p, _)| p.attempts_count > 0);
    rows.sort_by(|(a, _), (b, _)| compare_rows(a, b));

    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|(_, player)| seen.insert(player.canonical_key()))
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, (progress, player))| DayEntry {
            rank: i as u32 + 1,
            player_name: player.public_name(),
            is_anonymous: player.is_anonymous(),
            solved: progress.solved,
            score: progress.score,
            attempts: progress.attempts_count,
            best_similarity: progress.best_similarity,
            last_attempt_at: progress.last_attempt_at,
        })
        .collect()
}

/// Merges per-player totals by canonical identity and assigns dense ranks.
/// Under `GlobalMetric::Solved` identities that never solved a challenge are not ranked.
pub fn rank_global(rows: Vec<(PlayerTotals, Player)>, metric: GlobalMetric) -> Vec<GlobalEntry> {
    let mut merged: HashMap<String, GlobalEntry> = HashMap::new();
    for (totals, player) in rows {
        let entry = merged.entry(player.canonical_key()).or_insert_with(|| GlobalEntry {
            rank: 0,
            player_name: player.public_name(),
            is_anonymous: player.is_anonymous(),
            solved_count: 0,
            total_score: 0,
            challenges_played: 0,
        });
        entry.solved_count += totals.solved_count;
        entry.total_score += totals.total_score;
        entry.challenges_played += totals.challenges_played;
    }

    let mut entries: Vec<GlobalEntry> = merged
        .into_values()
        .filter(|e| e.challenges_played > 0)
        .filter(|e| metric != GlobalMetric::Solved || e.solved_count > 0)
        .collect();
    let primary = |e: &GlobalEntry| metric.primary(e.solved_count, e.total_score);
    let secondary = |e: &GlobalEntry| metric.secondary(e.solved_count, e.total_score);
    entries.sort_by(|a, b| {
        primary(b)
            .cmp(&primary(a))
            .then_with(|| secondary(b).cmp(&secondary(a)))
            .then_with(|| a.player_name.cmp(&b.player_name))
    });

    let mut rank = 0;
    let mut previous = None;
    for entry in entries.iter_mut() {
        let value = primary(entry);
        if previous != Some(value) {
            rank += 1;
            previous = Some(value);
        }
        entry.rank = rank;
    }
    entries.truncate(LEADERBOARD_SIZE);
    entries
}

/// Read-only views over the progress ledger.
pub struct LeaderboardService {
    store: Arc<dyn GameStore>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    /// The target word is only included for days that are already over.
    pub async fn day(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        language: Language,
    ) -> GameResult<DayLeaderboard> {
        let rows = self.store.progress_for_date(date).await?;
        let entries = rank_day(self.with_players(rows).await?);

        let word = if date < today {
            match self.store.challenge_for_date(date).await? {
                Some(challenge) => self
                    .store
                    .get_word(&challenge.word_id)
                    .await?
                    .map(|w| w.text(language).to_string()),
                None => None,
            }
        } else {
            None
        };

        Ok(DayLeaderboard { date, word, entries })
    }

    /// Only the top players are loaded; the grouping itself runs in the store.
    pub async fn global(&self, metric: GlobalMetric) -> GameResult<GlobalLeaderboard> {
        let totals = self.store.player_totals(metric, LEADERBOARD_SIZE).await?;
        let ids: Vec<String> = totals.iter().map(|t| t.player_id.clone()).collect();
        let players = self.players_by_id(&ids).await?;

        let rows = totals
            .into_iter()
            .filter_map(|t| {
                let player = players.get(&t.player_id)?.clone();
                Some((t, player))
            })
            .collect();
        Ok(GlobalLeaderboard {
            metric,
            entries: rank_global(rows, metric),
        })
    }

    async fn with_players(&self, rows: Vec<Progress>) -> GameResult<Vec<(Progress, Player)>> {
        let ids: Vec<String> = rows
            .iter()
            .map(|p| p.player_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let players = self.players_by_id(&ids).await?;

        Ok(rows
            .into_iter()
            .filter_map(|progress| {
                let player = players.get(&progress.player_id)?.clone();
                Some((progress, player))
            })
            .collect())
    }

    async fn players_by_id(&self, ids: &[String]) -> GameResult<HashMap<String, Player>> {
        Ok(self
            .store
            .players_by_ids(ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 4).unwrap()
    }

    fn row(player: &Player, challenge: &str, solved: bool, score: u32, minutes: i64) -> (Progress, Player) {
        let mut p = Progress::new(&player.id, challenge, date(), false);
        p.attempts_count = 3;
        p.solved = solved;
        p.score = score;
        p.last_attempt_at = Some(Utc::now() + Duration::minutes(minutes));
        (p, player.clone())
    }

    #[test]
    fn duplicate_identity_keeps_best_row() {
        let anon = Player::anonymous("device-0001", "Lobo", "lobo".into());
        // Same device seen under a second player row.
        let mut alias = Player::anonymous("device-0001", "Lobo2", "lobo2".into());
        alias.id = "anon_other".into();

        let entries = rank_day(vec![row(&anon, "c1", true, 500, 1), row(&alias, "c1", true, 800, 2)]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, 800);
    }

    #[test]
    fn day_ordering_breaks_ties_by_completion_time() {
        let a = Player::registered("a", Some("A".into()));
        let b = Player::registered("b", Some("B".into()));
        let c = Player::registered("c", Some("C".into()));
        let entries = rank_day(vec![
            row(&a, "c1", false, 900, 0),
            row(&b, "c1", true, 700, 5),
            row(&c, "c1", true, 700, 1),
        ]);
        let names: Vec<_> = entries.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);
        assert_eq!(entries.iter().map(|e| e.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn rows_without_attempts_are_ignored() {
        let a = Player::registered("a", None);
        let mut r = row(&a, "c1", false, 0, 0);
        r.0.attempts_count = 0;
        assert!(rank_day(vec![r]).is_empty());
    }

    fn totals(player: &Player, solved: u32, score: u64, played: u32) -> (PlayerTotals, Player) {
        (
            PlayerTotals {
                player_id: player.id.clone(),
                solved_count: solved,
                total_score: score,
                challenges_played: played,
            },
            player.clone(),
        )
    }

    #[test]
    fn global_ranks_are_dense() {
        let a = Player::registered("a", Some("A".into()));
        let b = Player::registered("b", Some("B".into()));
        let c = Player::registered("c", Some("C".into()));
        let rows = vec![totals(&a, 2, 1700, 2), totals(&b, 2, 200, 2), totals(&c, 1, 950, 1)];

        let solved = rank_global(rows.clone(), GlobalMetric::Solved);
        let ranks: Vec<_> = solved.iter().map(|e| (e.player_name.as_str(), e.rank)).collect();
        assert_eq!(ranks, [("A", 1), ("B", 1), ("C", 2)]);

        let score = rank_global(rows, GlobalMetric::Score);
        assert_eq!(score[0].player_name, "A");
        assert_eq!(score[0].total_score, 1700);
        assert_eq!(score[2].rank, 3);
    }

    #[test]
    fn solved_board_skips_players_without_a_solve() {
        let a = Player::registered("a", Some("A".into()));
        let b = Player::registered("b", Some("B".into()));
        let rows = vec![totals(&a, 1, 500, 1), totals(&b, 0, 12, 1)];

        let solved = rank_global(rows.clone(), GlobalMetric::Solved);
        let ranks: Vec<_> = solved
            .iter()
            .map(|e| (e.player_name.as_str(), e.solved_count, e.rank))
            .collect();
        assert_eq!(ranks, [("A", 1, 1)]);

        // Score board still lists everyone who played.
        assert_eq!(rank_global(rows, GlobalMetric::Score).len(), 2);
    }

    #[test]
    fn global_merges_rows_of_one_identity() {
        let anon = Player::anonymous("device-0001", "Lobo", "lobo".into());
        let mut alias = anon.clone();
        alias.id = "anon_other".into();
        let entries = rank_global(
            vec![totals(&anon, 1, 500, 1), totals(&alias, 1, 800, 1)],
            GlobalMetric::Score,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_score, 1300);
        assert_eq!(entries[0].challenges_played, 2);
    }

    #[tokio::test]
    async fn global_board_is_built_from_store_totals() {
        let store = Arc::new(crate::store::MemoryStore::new());
        let a = Player::registered("a", Some("A".into()));
        let b = Player::registered("b", Some("B".into()));
        store.insert_player(&a).await.unwrap();
        store.insert_player(&b).await.unwrap();
        for (progress, _) in [
            row(&a, "c1", true, 900, 0),
            row(&a, "c2", false, 300, 0),
            row(&b, "c1", false, 400, 0),
        ] {
            store.insert_progress(&progress).await.unwrap();
        }

        let service = LeaderboardService::new(store);
        let solved = service.global(GlobalMetric::Solved).await.unwrap();
        assert_eq!(solved.entries.len(), 1);
        assert_eq!(solved.entries[0].player_name, "A");
        assert_eq!(solved.entries[0].challenges_played, 2);

        let score = service.global(GlobalMetric::Score).await.unwrap();
        let names: Vec<_> = score.entries.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(score.entries[0].total_score, 1200);
    }

    #[test]
    fn boards_are_truncated() {
        let rows: Vec<_> = (0..60)
            .map(|i| row(&Player::registered(&i.to_string(), None), "c1", true, i, 0))
            .collect();
        assert_eq!(rank_day(rows).len(), LEADERBOARD_SIZE);

        let board: Vec<_> = (0..60)
            .map(|i| totals(&Player::registered(&i.to_string(), None), 1, i, 1))
            .collect();
        assert_eq!(rank_global(board, GlobalMetric::Score).len(), LEADERBOARD_SIZE);
    }
}
