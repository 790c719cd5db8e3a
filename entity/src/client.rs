use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "client")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub employee_id: i32,
    pub company_name: String,
    pub customer_name: String,
    pub industry_type: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub reference: Option<String>,
    pub requirements: Option<String>,
    /// Soft-delete flag; inactive clients keep their followup history.
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::contact_person::Entity")]
    ContactPerson,
    #[sea_orm(has_many = "super::followup::Entity")]
    Followup,
}

impl Related<super::contact_person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactPerson.def()
    }
}

impl Related<super::followup::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Followup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
