use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    error::{MongoDaoError, MongoResult},
    models::{ParticipantDocument, RoomDocument, status_str},
};
use crate::dao::{
    match_store::{MatchStore, StorageResult},
    models::{ParticipantEntity, RoomEntity, RoomStatus},
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const DUPLICATE_KEY_CODE: i32 = 11000;

const CONNECT_MAX_ATTEMPTS: u32 = 10;
const CONNECT_INITIAL_DELAY: std::time::Duration = std::time::Duration::from_millis(250);
const CONNECT_MAX_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Build a client from `options` and ping until the deployment answers,
/// backing off exponentially between attempts.
async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = CONNECT_INITIAL_DELAY;

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(err) => {
                attempts += 1;
                if attempts >= CONNECT_MAX_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts,
                        source: err,
                    });
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(CONNECT_MAX_DELAY);
            }
        }
    }
}

/// Connection parameters for the MongoDB match store.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed client options.
    pub options: ClientOptions,
    /// Database that holds the room and participant collections.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection URI, using `db_name` or a default database.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or("quiz_duel").to_owned();
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name,
        })
    }
}

/// MongoDB-backed implementation of [`MatchStore`]. Conditional writes are
/// expressed as `update_one` filters so the server applies them atomically.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_err))
            if write_err.code == DUPLICATE_KEY_CODE
    )
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // Room codes are the `_id`, already unique; participants need a
        // unique email index to back the signup conflict check.
        let collection = self.participant_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"email": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_email_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "email",
                source,
            })?;

        Ok(())
    }

    async fn room_collection(&self) -> Collection<RoomDocument> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<RoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn participant_collection(&self) -> Collection<ParticipantDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<ParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn insert_room(&self, room: RoomEntity) -> MongoResult<bool> {
        let code = room.code.clone();
        let document: RoomDocument = room.into();
        let collection = self.room_collection().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::InsertRoom { code, source }),
        }
    }

    async fn find_room(&self, code: String) -> MongoResult<Option<RoomEntity>> {
        let collection = self.room_collection().await;
        let document = collection
            .find_one(doc! {"_id": code.as_str()})
            .await
            .map_err(|source| MongoDaoError::LoadRoom {
                code: code.clone(),
                source,
            })?;

        document.map(RoomEntity::try_from).transpose()
    }

    async fn fill_slot_b(&self, code: String, participant: Uuid) -> MongoResult<bool> {
        let collection = self.room_collection().await;
        let result = collection
            .update_one(
                doc! {"_id": code.as_str(), "slot_b": null},
                doc! {"$set": {"slot_b": participant.to_string()}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateRoom {
                code: code.clone(),
                source,
            })?;
        Ok(result.modified_count > 0)
    }

    async fn update_status(
        &self,
        code: String,
        from: RoomStatus,
        to: RoomStatus,
    ) -> MongoResult<bool> {
        if from.advance(to).is_err() {
            return Ok(false);
        }
        let collection = self.room_collection().await;
        let result = collection
            .update_one(
                doc! {"_id": code.as_str(), "status": status_str(from)},
                doc! {"$set": {"status": status_str(to)}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateRoom {
                code: code.clone(),
                source,
            })?;
        Ok(result.modified_count > 0)
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> MongoResult<bool> {
        let id = participant.id;
        let document: ParticipantDocument = participant.into();
        let collection = self.participant_collection().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::InsertParticipant { id, source }),
        }
    }

    async fn find_participant(&self, id: Uuid) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self.participant_collection().await;
        let document = collection
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadParticipant { source })?;

        document.map(ParticipantEntity::try_from).transpose()
    }

    async fn find_participant_by_email(
        &self,
        email: String,
    ) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self.participant_collection().await;
        let document = collection
            .find_one(doc! {"email": email.as_str()})
            .await
            .map_err(|source| MongoDaoError::LoadParticipant { source })?;

        document.map(ParticipantEntity::try_from).transpose()
    }

    async fn raise_high_score(&self, id: Uuid, score: u32) -> MongoResult<bool> {
        let collection = self.participant_collection().await;
        let result = collection
            .update_one(
                doc! {"_id": id.to_string(), "highest_score": {"$lt": score}},
                doc! {"$set": {"highest_score": score}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateParticipant { id, source })?;
        Ok(result.modified_count > 0)
    }
}

impl MatchStore for MongoMatchStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_room(room).await.map_err(Into::into) })
    }

    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { store.find_room(code).await.map_err(Into::into) })
    }

    fn fill_slot_b(
        &self,
        code: &str,
        participant: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { store.fill_slot_b(code, participant).await.map_err(Into::into) })
    }

    fn update_status(
        &self,
        code: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move {
            store
                .update_status(code, from, to)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_participant(participant)
                .await
                .map_err(Into::into)
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_participant(id).await.map_err(Into::into) })
    }

    fn find_participant_by_email(
        &self,
        email: &str,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        let email = email.to_owned();
        Box::pin(async move {
            store
                .find_participant_by_email(email)
                .await
                .map_err(Into::into)
        })
    }

    fn raise_high_score(&self, id: Uuid, score: u32) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.raise_high_score(id, score).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
