use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::Document, error::Error as DbError, options::IndexOptions, Collection, Database,
    IndexModel,
};

use super::document::{BallotDoc, TokenDoc};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for TokenDoc {
    const NAME: &'static str = "tokens";
}

impl MongoCollection for BallotDoc {
    const NAME: &'static str = "ballots";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One live token per secret ID, and per email.
    for key in ["secretId", "email"] {
        let mut keys = Document::new();
        keys.insert(key, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(unique.clone())
            .build();
        Coll::<TokenDoc>::from_db(db).create_index(index, None).await?;
    }

    Ok(())
}
