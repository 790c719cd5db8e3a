use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "meeting")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub followup_id: i32,
    #[sea_orm(indexed)]
    pub client_id: i32,
    pub employee_id: i32,
    pub title: String,
    pub meeting_date: String,
    pub start_time: String,
    pub end_time: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::followup::Entity",
        from = "Column::FollowupId",
        to = "super::followup::Column::Id",
        on_delete = "Cascade"
    )]
    Followup,
}

impl Related<super::followup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Followup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
