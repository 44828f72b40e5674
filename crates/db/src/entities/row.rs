//! Table row entity.
//!
//! One physical table holds every logical partition: poll rows live in the
//! fixed `"poll"` partition, option rows in a partition named after their
//! owning poll id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "polls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub partition_key: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub row_key: String,

    /// Row fields as a JSON property bag.
    #[sea_orm(column_type = "JsonBinary")]
    pub data: JsonValue,

    /// Concurrency token, incremented on every replace.
    pub etag: i64,

    /// Last-write timestamp.
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
