use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "management_contact")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub management_client_id: i32,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub designation: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::management_client::Entity",
        from = "Column::ManagementClientId",
        to = "super::management_client::Column::Id",
        on_delete = "Cascade"
    )]
    ManagementClient,
}

impl Related<super::management_client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManagementClient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
