use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One immutable status change of a marketing client. Rows are only ever
/// inserted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "followup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub client_id: i32,
    pub contact_person_id: Option<i32>,
    pub employee_id: i32,
    pub status: Status,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub shared: SharedChannel,
    /// Set when the lead came back from the management pipeline.
    pub following: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::contact_person::Entity",
        from = "Column::ContactPersonId",
        to = "super::contact_person::Column::Id",
        on_delete = "SetNull"
    )]
    ContactPerson,
    #[sea_orm(has_many = "super::meeting::Entity")]
    Meeting,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::meeting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meeting.def()
    }
}

#[derive(
    Copy, Clone, Debug, Hash, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "first_followup")]
    FirstFollowup,
    #[sea_orm(string_value = "second_followup")]
    SecondFollowup,
    #[sea_orm(string_value = "not_available")]
    NotAvailable,
    #[sea_orm(string_value = "not_interested")]
    NotInterested,
    #[sea_orm(string_value = "not_reachable")]
    NotReachable,
    #[sea_orm(string_value = "converted")]
    Converted,
    #[sea_orm(string_value = "droped")]
    Droped,
}

/// Channels the followup was shared over.
#[derive(
    Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum SharedChannel {
    #[default]
    #[sea_orm(string_value = "none")]
    #[serde(rename = "none")]
    NotShared,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "whatsapp")]
    Whatsapp,
    #[sea_orm(string_value = "both")]
    Both,
}

impl ActiveModelBehavior for ActiveModel {}
