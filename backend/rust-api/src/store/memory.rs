use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{GameStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    attempt::Attempt,
    ban::BanRecord,
    challenge::Challenge,
    leaderboard::{GlobalMetric, PlayerTotals},
    player::Player,
    progress::Progress,
    word::Word,
    Language,
};
use crate::utils::vector::cosine_similarity;

#[derive(Default)]
struct Inner {
    words: Vec<Word>,
    challenges: Vec<Challenge>,
    players: HashMap<String, Player>,
    progress: HashMap<String, Progress>,
    attempts: Vec<Attempt>,
    bans: HashMap<String, BanRecord>,
}

/// In-process store with the same constraint semantics as [`super::MongoStore`].
/// Used for `storage_backend = "memory"` and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(words: Vec<Word>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                words,
                ..Inner::default()
            }),
        }
    }
}

fn same_ledger_state(a: &Progress, b: &Progress) -> bool {
    a.attempts_count == b.attempts_count
        && a.solved == b.solved
        && a.bonus_granted == b.bonus_granted
        && a.bonus_declined == b.bonus_declined
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_word(&self, word: &Word) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.words.iter().any(|w| w.id == word.id) {
            return Err(StoreError::DuplicateKey(format!("word {}", word.id)));
        }
        inner.words.push(word.clone());
        Ok(())
    }

    async fn get_word(&self, word_id: &str) -> StoreResult<Option<Word>> {
        let inner = self.inner.lock().await;
        Ok(inner.words.iter().find(|w| w.id == word_id).cloned())
    }

    async fn find_word_by_text(&self, text_en: &str, text_es: &str) -> StoreResult<Option<Word>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .words
            .iter()
            .find(|w| w.text_en == text_en && w.text_es == text_es)
            .cloned())
    }

    async fn eligible_word_ids(&self, excluding: &[String]) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .words
            .iter()
            .filter(|w| w.is_eligible() && !excluding.contains(&w.id))
            .map(|w| w.id.clone())
            .collect())
    }

    async fn all_word_texts(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .words
            .iter()
            .flat_map(|w| [w.text_en.clone(), w.text_es.clone()])
            .collect())
    }

    async fn target_similarity(
        &self,
        word_id: &str,
        language: Language,
        embedding: &[f32],
    ) -> StoreResult<Option<f64>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .words
            .iter()
            .find(|w| w.id == word_id)
            .and_then(|w| w.embedding(language))
            .and_then(|target| cosine_similarity(embedding, target)))
    }

    async fn challenge_for_date(&self, date: NaiveDate) -> StoreResult<Option<Challenge>> {
        let inner = self.inner.lock().await;
        Ok(inner.challenges.iter().find(|c| c.date == date).cloned())
    }

    async fn get_challenge(&self, challenge_id: &str) -> StoreResult<Option<Challenge>> {
        let inner = self.inner.lock().await;
        Ok(inner.challenges.iter().find(|c| c.id == challenge_id).cloned())
    }

    async fn recent_challenge_word_ids(&self, limit: usize) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut challenges: Vec<&Challenge> = inner.challenges.iter().collect();
        challenges.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(challenges
            .into_iter()
            .take(limit)
            .map(|c| c.word_id.clone())
            .collect())
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.challenges.iter().any(|c| c.date == challenge.date) {
            return Err(StoreError::DuplicateKey(format!("challenge date {}", challenge.date)));
        }
        inner.challenges.push(challenge.clone());
        Ok(())
    }

    async fn set_challenge_hint_if_absent(
        &self,
        challenge_id: &str,
        language: Language,
        hint: &str,
    ) -> StoreResult<Option<String>> {
        let mut inner = self.inner.lock().await;
        let Some(challenge) = inner.challenges.iter_mut().find(|c| c.id == challenge_id) else {
            return Ok(None);
        };
        let slot = match language {
            Language::En => &mut challenge.hint_en,
            Language::Es => &mut challenge.hint_es,
        };
        if slot.is_none() {
            *slot = Some(hint.to_string());
        }
        Ok(slot.clone())
    }

    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        let inner = self.inner.lock().await;
        Ok(inner.players.get(player_id).cloned())
    }

    async fn find_player_by_device(&self, device_token: &str) -> StoreResult<Option<Player>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .players
            .values()
            .find(|p| p.device_token.as_deref() == Some(device_token))
            .cloned())
    }

    async fn find_anonymous_by_nickname_key(&self, key: &str) -> StoreResult<Option<Player>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .players
            .values()
            .find(|p| p.is_anonymous() && p.nickname_key.as_deref() == Some(key))
            .cloned())
    }

    async fn insert_player(&self, player: &Player) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.players.contains_key(&player.id) {
            return Err(StoreError::DuplicateKey(format!("player {}", player.id)));
        }
        let conflict = inner.players.values().any(|p| {
            (player.device_token.is_some() && p.device_token == player.device_token)
                || (player.is_anonymous()
                    && p.is_anonymous()
                    && player.nickname_key.is_some()
                    && p.nickname_key == player.nickname_key)
        });
        if conflict {
            return Err(StoreError::DuplicateKey(format!("player {}", player.id)));
        }
        inner.players.insert(player.id.clone(), player.clone());
        Ok(())
    }

    async fn players_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Player>> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.players.get(id).cloned())
            .collect())
    }

    async fn get_progress(&self, player_id: &str, challenge_id: &str) -> StoreResult<Option<Progress>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .progress
            .get(&Progress::key(player_id, challenge_id))
            .cloned())
    }

    async fn insert_progress(&self, progress: &Progress) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.progress.contains_key(&progress.id) {
            return Err(StoreError::DuplicateKey(format!("progress {}", progress.id)));
        }
        inner.progress.insert(progress.id.clone(), progress.clone());
        Ok(())
    }

    async fn compare_and_swap_progress(&self, expected: &Progress, next: &Progress) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.progress.get_mut(&expected.id) {
            Some(current) if same_ledger_state(current, expected) => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn progress_for_date(&self, date: NaiveDate) -> StoreResult<Vec<Progress>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .progress
            .values()
            .filter(|p| p.challenge_date == date && p.attempts_count > 0)
            .cloned()
            .collect())
    }

    async fn player_totals(&self, metric: GlobalMetric, limit: usize) -> StoreResult<Vec<PlayerTotals>> {
        let inner = self.inner.lock().await;
        let mut by_player: HashMap<&str, PlayerTotals> = HashMap::new();
        for p in inner.progress.values().filter(|p| p.attempts_count > 0) {
            let totals = by_player.entry(p.player_id.as_str()).or_insert_with(|| PlayerTotals {
                player_id: p.player_id.clone(),
                solved_count: 0,
                total_score: 0,
                challenges_played: 0,
            });
            totals.challenges_played += 1;
            totals.total_score += u64::from(p.score);
            if p.solved {
                totals.solved_count += 1;
            }
        }

        let mut totals: Vec<PlayerTotals> = by_player
            .into_values()
            .filter(|t| metric != GlobalMetric::Solved || t.solved_count > 0)
            .collect();
        totals.sort_by(|a, b| {
            metric
                .primary(b.solved_count, b.total_score)
                .cmp(&metric.primary(a.solved_count, a.total_score))
                .then_with(|| {
                    metric
                        .secondary(b.solved_count, b.total_score)
                        .cmp(&metric.secondary(a.solved_count, a.total_score))
                })
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        totals.truncate(limit);
        Ok(totals)
    }

    async fn count_completed_challenges(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .progress
            .values()
            .filter(|p| {
                p.player_id == player_id && p.challenge_id != excluding_challenge && p.is_completed()
            })
            .count() as u64)
    }

    async fn count_bonus_uses(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .progress
            .values()
            .filter(|p| {
                p.player_id == player_id && p.challenge_id != excluding_challenge && p.bonus_used()
            })
            .count() as u64)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for(&self, player_id: &str, challenge_id: &str) -> StoreResult<Vec<Attempt>> {
        let inner = self.inner.lock().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.player_id == player_id && a.challenge_id == challenge_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
        Ok(attempts)
    }

    async fn count_attempts_from_address_since(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.source_address == address && a.attempted_at >= since)
            .count() as u64)
    }

    async fn recent_attempts(&self, limit: usize) -> StoreResult<Vec<Attempt>> {
        let inner = self.inner.lock().await;
        // Newest insertion first so equal timestamps keep log order.
        let mut attempts: Vec<Attempt> = inner.attempts.iter().rev().cloned().collect();
        attempts.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
        attempts.truncate(limit);
        Ok(attempts)
    }

    async fn get_ban(&self, address: &str) -> StoreResult<Option<BanRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.bans.get(address).cloned())
    }

    async fn upsert_ban(&self, ban: &BanRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.bans.insert(ban.address.clone(), ban.clone());
        Ok(())
    }

    async fn delete_expired_bans(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let expired: HashSet<String> = inner
            .bans
            .values()
            .filter(|b| !b.is_active(now))
            .map(|b| b.address.clone())
            .collect();
        inner.bans.retain(|address, _| !expired.contains(address));
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> Progress {
        Progress::new("p1", "c1", NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), false)
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_rows() {
        let store = MemoryStore::new();
        let original = progress();
        store.insert_progress(&original).await.unwrap();

        let mut first = original.clone();
        first.attempts_count = 1;
        assert!(store.compare_and_swap_progress(&original, &first).await.unwrap());

        let mut stale = original.clone();
        stale.attempts_count = 1;
        assert!(!store.compare_and_swap_progress(&original, &stale).await.unwrap());

        let stored = store.get_progress("p1", "c1").await.unwrap().unwrap();
        assert_eq!(stored.attempts_count, 1);
    }

    #[tokio::test]
    async fn duplicate_progress_is_rejected() {
        let store = MemoryStore::new();
        store.insert_progress(&progress()).await.unwrap();
        let err = store.insert_progress(&progress()).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn anonymous_nicknames_are_unique() {
        let store = MemoryStore::new();
        store
            .insert_player(&Player::anonymous("device-0001", "Lobo", "lobo".into()))
            .await
            .unwrap();
        let err = store
            .insert_player(&Player::anonymous("device-0002", "LOBO", "lobo".into()))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());

        // Registered accounts are not nickname constrained.
        store
            .insert_player(&Player::registered("7", Some("Lobo".into())))
            .await
            .unwrap();
    }
}
