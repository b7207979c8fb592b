use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::Deserialize;

use super::{GameStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    attempt::Attempt,
    ban::BanRecord,
    challenge::{hint_field, Challenge},
    leaderboard::{GlobalMetric, PlayerTotals},
    player::Player,
    progress::{Progress, MAX_ATTEMPTS},
    word::{embedding_field, Word},
    Language,
};
use crate::utils::{time::chrono_to_bson, vector::cosine_similarity};

const WORDS: &str = "words";
const CHALLENGES: &str = "challenges";
const PLAYERS: &str = "players";
const PROGRESS: &str = "progress";
const ATTEMPTS: &str = "attempts";
const BAN_RECORDS: &str = "ban_records";

const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE => {
                StoreError::DuplicateKey(we.message.clone())
            }
            ErrorKind::Command(ce) if ce.code == DUPLICATE_KEY_CODE => {
                StoreError::DuplicateKey(ce.message.clone())
            }
            ErrorKind::BsonSerialization(e) => StoreError::Serialization(e.to_string()),
            ErrorKind::BsonDeserialization(e) => StoreError::Serialization(e.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct WordTexts {
    text_en: String,
    text_es: String,
}

#[derive(Debug, Deserialize)]
struct WordIdOfChallenge {
    word_id: String,
}

/// MongoDB-backed store.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn words(&self) -> Collection<Word> {
        self.db.collection(WORDS)
    }

    fn challenges(&self) -> Collection<Challenge> {
        self.db.collection(CHALLENGES)
    }

    fn players(&self) -> Collection<Player> {
        self.db.collection(PLAYERS)
    }

    fn progress(&self) -> Collection<Progress> {
        self.db.collection(PROGRESS)
    }

    fn attempts(&self) -> Collection<Attempt> {
        self.db.collection(ATTEMPTS)
    }

    fn bans(&self) -> Collection<BanRecord> {
        self.db.collection(BAN_RECORDS)
    }

    /// Creates the unique and lookup indexes the game relies on. Safe to run on every start.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        let plain = |keys: Document| IndexModel::builder().keys(keys).build();

        self.challenges()
            .create_index(unique(doc! { "date": 1 }))
            .await?;
        self.words()
            .create_index(plain(doc! { "text_en": 1, "text_es": 1 }))
            .await?;

        self.players()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "device_token": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "device_token": { "$exists": true } })
                            .build(),
                    )
                    .build(),
            )
            .await?;
        self.players()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "nickname_key": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! {
                                "kind": "anonymous",
                                "nickname_key": { "$exists": true },
                            })
                            .build(),
                    )
                    .build(),
            )
            .await?;

        self.progress()
            .create_index(unique(doc! { "player_id": 1, "challenge_id": 1 }))
            .await?;
        self.progress()
            .create_index(plain(doc! { "challenge_date": 1 }))
            .await?;

        self.attempts()
            .create_index(plain(doc! { "source_address": 1, "attempted_at": -1 }))
            .await?;
        self.attempts()
            .create_index(plain(doc! { "player_id": 1, "challenge_id": 1 }))
            .await?;
        self.attempts()
            .create_index(plain(doc! { "attempted_at": -1 }))
            .await?;

        self.bans()
            .create_index(plain(doc! { "expires_at": 1 }))
            .await?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl GameStore for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_word(&self, word: &Word) -> StoreResult<()> {
        self.words().insert_one(word).await?;
        Ok(())
    }

    async fn get_word(&self, word_id: &str) -> StoreResult<Option<Word>> {
        Ok(self.words().find_one(doc! { "_id": word_id }).await?)
    }

    async fn find_word_by_text(&self, text_en: &str, text_es: &str) -> StoreResult<Option<Word>> {
        Ok(self
            .words()
            .find_one(doc! { "text_en": text_en, "text_es": text_es })
            .await?)
    }

    async fn eligible_word_ids(&self, excluding: &[String]) -> StoreResult<Vec<String>> {
        let ids: Vec<IdOnly> = self
            .db
            .collection::<IdOnly>(WORDS)
            .find(doc! {
                "_id": { "$nin": excluding },
                "embedding_en": { "$ne": null },
                "embedding_es": { "$ne": null },
            })
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(ids.into_iter().map(|d| d.id).collect())
    }

    async fn all_word_texts(&self) -> StoreResult<Vec<String>> {
        let texts: Vec<WordTexts> = self
            .db
            .collection::<WordTexts>(WORDS)
            .find(doc! {})
            .projection(doc! { "text_en": 1, "text_es": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(texts
            .into_iter()
            .flat_map(|t| [t.text_en, t.text_es])
            .collect())
    }

    async fn target_similarity(
        &self,
        word_id: &str,
        language: Language,
        embedding: &[f32],
    ) -> StoreResult<Option<f64>> {
        let field = embedding_field(language);
        let projected = self
            .db
            .collection::<Document>(WORDS)
            .find_one(doc! { "_id": word_id })
            .projection(doc! { field: 1 })
            .await?;

        let Some(document) = projected else {
            return Ok(None);
        };
        let target: Vec<f32> = match document.get_array(field) {
            Ok(values) => values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect(),
            Err(_) => return Ok(None),
        };
        Ok(cosine_similarity(embedding, &target))
    }

    async fn challenge_for_date(&self, date: NaiveDate) -> StoreResult<Option<Challenge>> {
        Ok(self
            .challenges()
            .find_one(doc! { "date": date.to_string() })
            .await?)
    }

    async fn get_challenge(&self, challenge_id: &str) -> StoreResult<Option<Challenge>> {
        Ok(self.challenges().find_one(doc! { "_id": challenge_id }).await?)
    }

    async fn recent_challenge_word_ids(&self, limit: usize) -> StoreResult<Vec<String>> {
        let recent: Vec<WordIdOfChallenge> = self
            .db
            .collection::<WordIdOfChallenge>(CHALLENGES)
            .find(doc! {})
            .sort(doc! { "date": -1 })
            .limit(limit as i64)
            .projection(doc! { "word_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(recent.into_iter().map(|c| c.word_id).collect())
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> StoreResult<()> {
        self.challenges().insert_one(challenge).await?;
        Ok(())
    }

    async fn set_challenge_hint_if_absent(
        &self,
        challenge_id: &str,
        language: Language,
        hint: &str,
    ) -> StoreResult<Option<String>> {
        let field = hint_field(language);
        self.challenges()
            .update_one(
                doc! { "_id": challenge_id, field: null },
                doc! { "$set": { field: hint } },
            )
            .await?;

        let current = self.get_challenge(challenge_id).await?;
        Ok(current.and_then(|c| c.hint(language).map(str::to_string)))
    }

    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        Ok(self.players().find_one(doc! { "_id": player_id }).await?)
    }

    async fn find_player_by_device(&self, device_token: &str) -> StoreResult<Option<Player>> {
        Ok(self
            .players()
            .find_one(doc! { "device_token": device_token })
            .await?)
    }

    async fn find_anonymous_by_nickname_key(&self, key: &str) -> StoreResult<Option<Player>> {
        Ok(self
            .players()
            .find_one(doc! { "kind": "anonymous", "nickname_key": key })
            .await?)
    }

    async fn insert_player(&self, player: &Player) -> StoreResult<()> {
        self.players().insert_one(player).await?;
        Ok(())
    }

    async fn players_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Player>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .players()
            .find(doc! { "_id": { "$in": ids } })
            .await?
            .try_collect()
            .await?)
    }

    async fn get_progress(&self, player_id: &str, challenge_id: &str) -> StoreResult<Option<Progress>> {
        Ok(self
            .progress()
            .find_one(doc! { "_id": Progress::key(player_id, challenge_id) })
            .await?)
    }

    async fn insert_progress(&self, progress: &Progress) -> StoreResult<()> {
        self.progress().insert_one(progress).await?;
        Ok(())
    }

    async fn compare_and_swap_progress(&self, expected: &Progress, next: &Progress) -> StoreResult<bool> {
        let result = self
            .progress()
            .replace_one(
                doc! {
                    "_id": expected.id.as_str(),
                    "attempts_count": expected.attempts_count as i64,
                    "solved": expected.solved,
                    "bonus_granted": expected.bonus_granted,
                    "bonus_declined": expected.bonus_declined,
                },
                next,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn progress_for_date(&self, date: NaiveDate) -> StoreResult<Vec<Progress>> {
        Ok(self
            .progress()
            .find(doc! { "challenge_date": date.to_string(), "attempts_count": { "$gt": 0 } })
            .await?
            .try_collect()
            .await?)
    }

    async fn player_totals(&self, metric: GlobalMetric, limit: usize) -> StoreResult<Vec<PlayerTotals>> {
        let (primary, secondary) = metric.sort_fields();
        let mut pipeline = vec![
            doc! { "$match": { "attempts_count": { "$gt": 0 } } },
            doc! {
                "$group": {
                    "_id": "$player_id",
                    "solved_count": { "$sum": { "$cond": ["$solved", 1, 0] } },
                    "total_score": { "$sum": "$score" },
                    "challenges_played": { "$sum": 1 },
                }
            },
        ];
        if metric == GlobalMetric::Solved {
            pipeline.push(doc! { "$match": { "solved_count": { "$gt": 0 } } });
        }
        let mut sort = Document::new();
        sort.insert(primary, -1);
        sort.insert(secondary, -1);
        sort.insert("_id", 1);
        pipeline.extend([doc! { "$sort": sort }, doc! { "$limit": limit as i64 }]);

        let mut cursor = self.progress().aggregate(pipeline).await?;
        let mut totals = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            totals.push(
                mongodb::bson::from_document::<PlayerTotals>(document)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            );
        }
        Ok(totals)
    }

    async fn count_completed_challenges(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64> {
        Ok(self
            .progress()
            .count_documents(doc! {
                "player_id": player_id,
                "challenge_id": { "$ne": excluding_challenge },
                "$or": [
                    { "solved": true },
                    { "attempts_count": { "$gte": MAX_ATTEMPTS as i64 } },
                ],
            })
            .await?)
    }

    async fn count_bonus_uses(&self, player_id: &str, excluding_challenge: &str) -> StoreResult<u64> {
        Ok(self
            .progress()
            .count_documents(doc! {
                "player_id": player_id,
                "challenge_id": { "$ne": excluding_challenge },
                "$or": [ { "bonus_granted": true }, { "bonus_declined": true } ],
            })
            .await?)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        self.attempts().insert_one(attempt).await?;
        Ok(())
    }

    async fn attempts_for(&self, player_id: &str, challenge_id: &str) -> StoreResult<Vec<Attempt>> {
        Ok(self
            .attempts()
            .find(doc! { "player_id": player_id, "challenge_id": challenge_id })
            .sort(doc! { "attempted_at": -1 })
            .await?
            .try_collect()
            .await?)
    }

    async fn count_attempts_from_address_since(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(self
            .attempts()
            .count_documents(doc! {
                "source_address": address,
                "attempted_at": { "$gte": chrono_to_bson(since) },
            })
            .await?)
    }

    async fn recent_attempts(&self, limit: usize) -> StoreResult<Vec<Attempt>> {
        Ok(self
            .attempts()
            .find(doc! {})
            .sort(doc! { "attempted_at": -1 })
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?)
    }

    async fn get_ban(&self, address: &str) -> StoreResult<Option<BanRecord>> {
        Ok(self.bans().find_one(doc! { "_id": address }).await?)
    }

    async fn upsert_ban(&self, ban: &BanRecord) -> StoreResult<()> {
        self.bans()
            .replace_one(doc! { "_id": ban.address.as_str() }, ban)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete_expired_bans(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = self
            .bans()
            .delete_many(doc! { "expires_at": { "$lte": chrono_to_bson(now) } })
            .await?;
        Ok(result.deleted_count)
    }
}
