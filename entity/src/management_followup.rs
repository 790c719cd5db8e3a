use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status change in the management pipeline. When `is_marketing` is set the
/// row belongs to a marketing client (`marketing_client_id`) instead of a
/// management-owned one (`client_id`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "management_followup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub client_id: Option<i32>,
    #[sea_orm(indexed)]
    pub marketing_client_id: Option<i32>,
    pub is_marketing: bool,
    pub contact_id: Option<i32>,
    pub employee_id: i32,
    pub status: Status,
    pub remarks: Option<String>,
    pub next_followup_date: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::management_client::Entity",
        from = "Column::ClientId",
        to = "super::management_client::Column::Id",
        on_delete = "Cascade"
    )]
    ManagementClient,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::MarketingClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    MarketingClient,
    #[sea_orm(
        belongs_to = "super::management_contact::Entity",
        from = "Column::ContactId",
        to = "super::management_contact::Column::Id",
        on_delete = "SetNull"
    )]
    Contact,
}

impl Related<super::management_client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManagementClient.def()
    }
}

#[derive(
    Copy, Clone, Debug, Hash, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "inprogress")]
    Inprogress,
    #[sea_orm(string_value = "meeting")]
    Meeting,
    #[sea_orm(string_value = "proposed")]
    Proposed,
    #[sea_orm(string_value = "billing")]
    Billing,
    #[sea_orm(string_value = "lead")]
    Lead,
    #[sea_orm(string_value = "droped")]
    Droped,
}

impl ActiveModelBehavior for ActiveModel {}
