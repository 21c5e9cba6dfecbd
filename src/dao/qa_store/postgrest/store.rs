use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, header::HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{NewQuestion, QuestionChange, QuestionEntity, SessionEntity},
    qa_store::{ChangeFeed, QaStore, Subscription},
    storage::StorageResult,
};

use super::{
    config::PostgrestConfig,
    error::{PostgrestDaoError, PostgrestResult},
    models::{
        ApiErrorBody, NewQuestionRow, NewSessionRow, QUESTIONS_PATH, QuestionRow, SESSIONS_PATH,
        SessionRow, UPDATE_VOTE_PATH, UpdateVoteArgs, VotesPatch,
    },
};

const REST_PREFIX: &str = "rest/v1";
const RETURN_REPRESENTATION: &str = "return=representation";
const QUESTION_ORDER: &str = "votes.desc,created_at.asc";

/// Store speaking the PostgREST dialect exposed by Supabase.
///
/// The change feed only carries writes made through this instance; changes
/// made by other processes reach viewers through polling.
#[derive(Clone)]
pub struct PostgrestQaStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    feed: Arc<ChangeFeed>,
}

impl PostgrestQaStore {
    /// Build the HTTP client and check the endpoint answers.
    pub async fn connect(config: PostgrestConfig) -> PostgrestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| PostgrestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::<str>::from(config.api_key),
            feed: Arc::new(ChangeFeed::new(config.feed_capacity)),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, REST_PREFIX, path);
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> PostgrestResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| PostgrestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // PostgREST error documents are JSON; anything else is kept as the message.
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or(ApiErrorBody {
            message: Some(text),
            ..ApiErrorBody::default()
        });
        Err(PostgrestDaoError::RequestStatus {
            path: path.to_string(),
            status,
            body,
        })
    }

    async fn decode<T>(path: &str, response: Response) -> PostgrestResult<T>
    where
        T: DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| PostgrestDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn ping(&self) -> PostgrestResult<()> {
        let builder = self
            .request(Method::GET, SESSIONS_PATH)
            .query(&[("select", "id"), ("limit", "1")]);
        self.send(SESSIONS_PATH, builder).await.map(|_| ())
    }

    /// Insert rows and return the single representation PostgREST echoes back.
    async fn insert_one<B, R>(&self, path: &str, row: &B) -> PostgrestResult<R>
    where
        B: serde::Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let builder = self
            .request(Method::POST, path)
            .header("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION))
            .json(row);
        let response = self.send(path, builder).await?;
        single_row(path, Self::decode::<Vec<R>>(path, response).await?)
    }

    async fn sessions_by_join_code(&self, join_code: &str) -> PostgrestResult<Vec<SessionEntity>> {
        let filter = format!("eq.{join_code}");
        let builder = self
            .request(Method::GET, SESSIONS_PATH)
            .query(&[("select", "*"), ("join_code", filter.as_str())]);
        let response = self.send(SESSIONS_PATH, builder).await?;
        Self::decode::<Vec<SessionRow>>(SESSIONS_PATH, response)
            .await?
            .into_iter()
            .map(|row| row.try_into_entity(SESSIONS_PATH))
            .collect()
    }

    async fn questions(&self, filter: (&str, String)) -> PostgrestResult<Vec<QuestionEntity>> {
        let builder = self.request(Method::GET, QUESTIONS_PATH).query(&[
            ("select", "*".to_string()),
            (filter.0, filter.1),
            ("order", QUESTION_ORDER.to_string()),
        ]);
        let response = self.send(QUESTIONS_PATH, builder).await?;
        Self::decode::<Vec<QuestionRow>>(QUESTIONS_PATH, response)
            .await?
            .into_iter()
            .map(|row| row.try_into_entity(QUESTIONS_PATH))
            .collect()
    }

    async fn increment(&self, question_id: Uuid, worth: u32) -> PostgrestResult<u32> {
        let builder = self
            .request(Method::POST, UPDATE_VOTE_PATH)
            .json(&UpdateVoteArgs { question_id, worth });
        let response = self.send(UPDATE_VOTE_PATH, builder).await?;
        Self::decode::<u32>(UPDATE_VOTE_PATH, response).await
    }

    async fn overwrite_votes(&self, question_id: Uuid, votes: u32) -> PostgrestResult<QuestionEntity> {
        let filter = format!("eq.{question_id}");
        let builder = self
            .request(Method::PATCH, QUESTIONS_PATH)
            .query(&[("id", filter.as_str())])
            .header("Prefer", HeaderValue::from_static(RETURN_REPRESENTATION))
            .json(&VotesPatch { votes });
        let response = self.send(QUESTIONS_PATH, builder).await?;
        let rows = Self::decode::<Vec<QuestionRow>>(QUESTIONS_PATH, response).await?;
        single_row(QUESTIONS_PATH, rows)?.try_into_entity(QUESTIONS_PATH)
    }

    /// Publish a vote change once the new count is known; the owning session
    /// is looked up when the RPC only returned a number.
    async fn publish_votes(&self, question_id: Uuid, votes: u32) {
        let mut rows = match self.questions(("id", format!("eq.{question_id}"))).await {
            Ok(rows) => rows,
            Err(err) => {
                debug!(%question_id, error = %err, "vote change not published; question lookup failed");
                return;
            }
        };
        if let Some(question) = rows.pop() {
            self.feed.publish(QuestionChange::VotesChanged {
                question_id,
                session_id: question.session_id,
                votes,
            });
        }
    }
}

fn single_row<R>(path: &str, mut rows: Vec<R>) -> PostgrestResult<R> {
    if rows.len() != 1 {
        return Err(PostgrestDaoError::UnexpectedRowCount {
            path: path.to_string(),
            count: rows.len(),
        });
    }
    rows.pop().ok_or(PostgrestDaoError::UnexpectedRowCount {
        path: path.to_string(),
        count: 0,
    })
}

impl QaStore for PostgrestQaStore {
    fn insert_session(&self, join_code: String) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let row: SessionRow = store
                .insert_one(SESSIONS_PATH, &[NewSessionRow { join_code: &join_code }])
                .await?;
            Ok(row.try_into_entity(SESSIONS_PATH)?)
        })
    }

    fn query_sessions_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.sessions_by_join_code(&join_code).await?) })
    }

    fn insert_question(
        &self,
        question: NewQuestion,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let row: QuestionRow = store
                .insert_one(
                    QUESTIONS_PATH,
                    &[NewQuestionRow {
                        session_id: question.session_id,
                        text: &question.text,
                        votes: 0,
                    }],
                )
                .await?;
            let entity = row.try_into_entity(QUESTIONS_PATH)?;
            store.feed.publish(QuestionChange::Inserted(entity.clone()));
            Ok(entity)
        })
    }

    fn query_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .questions(("session_id", format!("eq.{session_id}")))
                .await?)
        })
    }

    fn find_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut rows = store.questions(("id", format!("eq.{question_id}"))).await?;
            Ok(rows.pop())
        })
    }

    fn atomic_increment_vote(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        let store = self.clone();
        Box::pin(async move {
            let votes = store.increment(question_id, delta).await?;
            store.publish_votes(question_id, votes).await;
            Ok(votes)
        })
    }

    fn update_question_votes(
        &self,
        question_id: Uuid,
        votes: u32,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let question = store.overwrite_votes(question_id, votes).await?;
            store.feed.publish(QuestionChange::VotesChanged {
                question_id,
                session_id: question.session_id,
                votes: question.votes,
            });
            Ok(question)
        })
    }

    fn subscribe(&self, session_id: Uuid) -> Subscription {
        self.feed.subscribe(session_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn unreachable_store() -> PostgrestQaStore {
        PostgrestQaStore {
            client: Client::new(),
            base_url: Arc::from("http://127.0.0.1:9"),
            api_key: Arc::from("anon"),
            feed: Arc::new(ChangeFeed::new(4)),
        }
    }

    #[tokio::test]
    async fn failed_vote_lookup_publishes_nothing() {
        let store = unreachable_store();
        let mut subscription = store.feed.subscribe(Uuid::new_v4());

        store.publish_votes(Uuid::new_v4(), 3).await;

        let next = tokio::time::timeout(Duration::from_millis(50), subscription.next()).await;
        assert!(next.is_err());
    }

    #[test]
    fn single_row_requires_exactly_one() {
        assert_eq!(single_row("sessions", vec![7]).unwrap(), 7);
        assert!(matches!(
            single_row::<u8>("sessions", vec![]),
            Err(PostgrestDaoError::UnexpectedRowCount { count: 0, .. })
        ));
        assert!(matches!(
            single_row("sessions", vec![1, 2]),
            Err(PostgrestDaoError::UnexpectedRowCount { count: 2, .. })
        ));
    }
}
