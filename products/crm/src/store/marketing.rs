use std::collections::HashMap;

use chrono::NaiveDate;
use entity::{client, contact_person, followup, meeting};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use tracing::{info, instrument};

use super::{
    CrmStore, ID_CHUNK, event_stamp, group_by, insert_contact_person, latest_management_row,
    latest_marketing_row, sql, sql::LeadFilter,
};
use crate::{
    aggregate::Counts,
    classifier::{self, MarketingBucket},
    error::{LeadError, LeadResult},
    event::{ClientId, EmployeeId, LeadRef, MarketingEvent},
    input::{AppendFollowup, ClientFields, NewClient, ValidFollowup},
    pipeline::MarketingPipeline,
    resolver::sort_newest_first,
    view::{ClientDetails, ContactView, MarketingLead, MeetingView},
};

impl CrmStore {
    #[instrument(name = "crm.marketing.create_client", skip_all, fields(employee_id = ?input.employee_id))]
    pub async fn create_client(&self, input: NewClient) -> LeadResult<ClientDetails> {
        let fields = input.validate()?;
        let txn = self.db.begin().await?;
        let details = insert_client(&txn, fields, self.now()).await?;
        txn.commit().await?;
        info!(client_id = details.id, "client created");
        Ok(details)
    }

    /// All-or-nothing: one invalid or failing row rolls the batch back.
    #[instrument(name = "crm.marketing.import_clients", skip_all, fields(rows = inputs.len()))]
    pub async fn import_clients(&self, inputs: Vec<NewClient>) -> LeadResult<Vec<ClientId>> {
        if inputs.is_empty() {
            return Err(LeadError::validation("clients must not be empty"));
        }
        let rows = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                input
                    .validate()
                    .map_err(|err| LeadError::validation(format!("clients[{index}]: {err}")))
            })
            .collect::<LeadResult<Vec<_>>>()?;
        let now = self.now();
        let txn = self.db.begin().await?;
        let mut ids = Vec::with_capacity(rows.len());
        for fields in rows {
            ids.push(insert_client(&txn, fields, now).await?.id);
        }
        txn.commit().await?;
        info!(imported = ids.len(), "clients imported");
        Ok(ids)
    }

    /// Inactive clients are returned too.
    #[instrument(name = "crm.marketing.get_client", skip(self))]
    pub async fn get_client(&self, client_id: ClientId) -> LeadResult<ClientDetails> {
        let db = &self.db;
        let model = self
            .read(|| client::Entity::find_by_id(client_id).one(db))
            .await?
            .ok_or_else(|| LeadError::not_found("client", client_id))?;
        let mut contacts = self.contacts_for(&[client_id]).await?;
        Ok(ClientDetails::from(model).with_contacts(contacts.remove(&client_id).unwrap_or_default()))
    }

    /// Soft delete or restore. Followup history is left untouched.
    #[instrument(name = "crm.marketing.set_active", skip(self))]
    pub async fn set_client_active(&self, client_id: ClientId, active: bool) -> LeadResult<ClientDetails> {
        let existing = client::Entity::find_by_id(client_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LeadError::not_found("client", client_id))?;
        if existing.active != active {
            let mut model: client::ActiveModel = existing.into();
            model.active = Set(active);
            model.updated_at = Set(self.now());
            model.update(&self.db).await?;
            info!(client_id, active, "client visibility changed");
        }
        self.get_client(client_id).await
    }

    #[instrument(name = "crm.marketing.list_clients", skip(self))]
    pub async fn list_clients(&self, employee_id: Option<EmployeeId>, include_inactive: bool) -> LeadResult<Vec<ClientDetails>> {
        let models = self.marketing_clients(employee_id, include_inactive).await?;
        let ids: Vec<_> = models.iter().map(|model| model.id).collect();
        let mut contacts = self.contacts_for(&ids).await?;
        Ok(models
            .into_iter()
            .map(|model| {
                let id = model.id;
                ClientDetails::from(model).with_contacts(contacts.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    /// Append one followup. Creating an inline contact, the event and its
    /// meeting commit together or not at all.
    #[instrument(
        name = "crm.marketing.append",
        skip_all,
        fields(client_id = ?request.client_id, employee_id = ?request.employee_id, status = ?request.status)
    )]
    pub async fn append_followup(&self, request: AppendFollowup) -> LeadResult<MarketingEvent> {
        let valid = request.validate()?;
        let txn = self.db.begin().await?;
        let event = self.insert_marketing_event(&txn, valid).await?;
        txn.commit().await?;
        info!(followup_id = event.id, following = event.following, "followup appended");
        self.publish_marketing(&event);
        Ok(event)
    }

    /// Full history of one client, newest first. Works for inactive clients.
    #[instrument(name = "crm.marketing.client_followups", skip(self))]
    pub async fn client_followups(&self, client_id: ClientId) -> LeadResult<Vec<MarketingEvent>> {
        let db = &self.db;
        let exists = self
            .read(|| client::Entity::find_by_id(client_id).one(db))
            .await?
            .is_some();
        if !exists {
            return Err(LeadError::not_found("client", client_id));
        }
        let mut histories = self.marketing_histories(&[client_id]).await?;
        Ok(histories.remove(&client_id).unwrap_or_default())
    }

    /// Latest event per requested client, regardless of the active flag.
    #[instrument(name = "crm.marketing.resolve_latest", skip_all, fields(clients = client_ids.len()))]
    pub async fn resolve_latest(&self, client_ids: &[ClientId]) -> LeadResult<HashMap<ClientId, Option<MarketingEvent>>> {
        let latest = self.latest_marketing(LeadFilter::Ids(client_ids)).await?;
        Ok(MarketingPipeline::resolve_latest(client_ids.iter().copied(), latest.into_values()))
    }

    /// Active clients in scope whose bucket matches, with history and
    /// meetings attached. Most recently worked leads come first.
    #[instrument(name = "crm.marketing.list", skip(self))]
    pub async fn list_followups(
        &self,
        bucket: MarketingBucket,
        employee_id: Option<EmployeeId>,
        as_of: NaiveDate,
    ) -> LeadResult<Vec<MarketingLead>> {
        let clients = self.marketing_clients(employee_id, false).await?;
        let mut latest = self.latest_marketing(LeadFilter::Active { employee_id }).await?;
        let selected: Vec<_> = clients
            .into_iter()
            .filter_map(|model| {
                let event = latest.remove(&model.id);
                let found = MarketingPipeline::classify(event.as_ref());
                MarketingPipeline::matches(found, bucket).then_some((model, event))
            })
            .collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<_> = selected.iter().map(|(model, _)| model.id).collect();
        let mut histories = self.marketing_histories(&ids).await?;
        let mut meetings = self.meetings_for(&ids).await?;
        let mut contacts = self.contacts_for(&ids).await?;
        let handed_over = self
            .latest_management(sql::MANAGEMENT_LINKED_EVENTS, LeadFilter::Ids(&ids))
            .await?;

        let mut leads: Vec<MarketingLead> = selected
            .into_iter()
            .map(|(model, event)| {
                let id = model.id;
                let classification = classifier::classify(event.as_ref(), handed_over.get(&LeadRef::Marketing(id)));
                MarketingLead {
                    client_id: id,
                    missed: MarketingPipeline::is_missed(event.as_ref(), as_of),
                    bucket: classification.bucket,
                    management_status: classification.management_status,
                    client_details: ClientDetails::from(model)
                        .with_contacts(contacts.remove(&id).unwrap_or_default()),
                    latest_status: event,
                    history: histories.remove(&id).unwrap_or_default(),
                    meetings: meetings.remove(&id).unwrap_or_default(),
                }
            })
            .collect();
        leads.sort_by(|a, b| {
            let a_key = a.latest_status.as_ref().map(MarketingEvent::order_key);
            let b_key = b.latest_status.as_ref().map(MarketingEvent::order_key);
            b_key.cmp(&a_key).then(b.client_id.cmp(&a.client_id))
        });
        info!(rows = leads.len(), "bucket listed");
        Ok(leads)
    }

    /// Dashboard tiles for the active clients in scope as of `as_of`.
    #[instrument(name = "crm.marketing.counts", skip(self))]
    pub async fn marketing_counts(&self, employee_id: Option<EmployeeId>, as_of: NaiveDate) -> LeadResult<Counts> {
        let ids = self.marketing_client_ids(employee_id).await?;
        let latest = self.latest_marketing(LeadFilter::Active { employee_id }).await?;
        Ok(MarketingPipeline::aggregate_counts(
            ids.iter().map(|id| latest.get(id)),
            as_of,
        ))
    }

    pub(super) async fn insert_marketing_event(
        &self,
        txn: &DatabaseTransaction,
        valid: ValidFollowup,
    ) -> LeadResult<MarketingEvent> {
        let client = client::Entity::find_by_id(valid.client_id)
            .one(txn)
            .await?
            .filter(|client| client.active)
            .ok_or_else(|| LeadError::not_found("client", valid.client_id))?;
        let previous = latest_marketing_row(txn, client.id).await?;
        let handed = latest_management_row(txn, client.id).await?;
        let following = valid
            .following
            .unwrap_or_else(|| previous.as_ref().is_some_and(|event| event.following));
        let now = event_stamp(
            self.now(),
            previous.map(|row| row.created_at),
            handed.map(|row| row.created_at),
        );

        let contact_person_id = match valid.new_contact {
            Some(contact) => Some(insert_contact_person(txn, client.id, contact, now).await?.id),
            None => {
                if let Some(contact_id) = valid.contact_person_id {
                    ensure_contact_of(txn, client.id, contact_id).await?;
                }
                valid.contact_person_id
            }
        };

        let row = followup::ActiveModel {
            id: NotSet,
            client_id: Set(client.id),
            contact_person_id: Set(contact_person_id),
            employee_id: Set(valid.employee_id),
            status: Set(valid.status),
            remarks: Set(valid.remarks),
            next_followup_date: Set(valid.next_followup_date),
            shared: Set(valid.shared),
            following: Set(following),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        if let Some(details) = valid.meeting {
            meeting::ActiveModel {
                id: NotSet,
                followup_id: Set(row.id),
                client_id: Set(client.id),
                employee_id: Set(valid.employee_id),
                title: Set(details.title),
                meeting_date: Set(details.date),
                start_time: Set(details.start_time),
                end_time: Set(details.end_time),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
        }
        Ok(row.into())
    }

    async fn marketing_clients(&self, employee_id: Option<EmployeeId>, include_inactive: bool) -> LeadResult<Vec<client::Model>> {
        let mut query = client::Entity::find();
        if !include_inactive {
            query = query.filter(client::Column::Active.eq(true));
        }
        if let Some(employee_id) = employee_id {
            query = query.filter(client::Column::EmployeeId.eq(employee_id));
        }
        let query = query.order_by_desc(client::Column::Id);
        let db = &self.db;
        self.read(|| query.clone().all(db)).await
    }

    async fn marketing_client_ids(&self, employee_id: Option<EmployeeId>) -> LeadResult<Vec<ClientId>> {
        let mut query = client::Entity::find()
            .select_only()
            .column(client::Column::Id)
            .filter(client::Column::Active.eq(true));
        if let Some(employee_id) = employee_id {
            query = query.filter(client::Column::EmployeeId.eq(employee_id));
        }
        let db = &self.db;
        self.read(|| query.clone().into_tuple::<ClientId>().all(db)).await
    }

    async fn marketing_histories(&self, ids: &[ClientId]) -> LeadResult<HashMap<ClientId, Vec<MarketingEvent>>> {
        let db = &self.db;
        let mut events = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let query = followup::Entity::find().filter(followup::Column::ClientId.is_in(chunk.iter().copied()));
            let rows = self.read(|| query.clone().all(db)).await?;
            events.extend(rows.into_iter().map(MarketingEvent::from));
        }
        let mut grouped = group_by(events, |event| event.client);
        grouped
            .values_mut()
            .for_each(|history| sort_newest_first(history.as_mut_slice()));
        Ok(grouped)
    }

    async fn meetings_for(&self, ids: &[ClientId]) -> LeadResult<HashMap<ClientId, Vec<MeetingView>>> {
        let db = &self.db;
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let query = meeting::Entity::find()
                .filter(meeting::Column::ClientId.is_in(chunk.iter().copied()))
                .order_by_desc(meeting::Column::CreatedAt)
                .order_by_desc(meeting::Column::Id);
            rows.extend(self.read(|| query.clone().all(db)).await?);
        }
        let grouped = group_by(rows, |row| row.client_id);
        Ok(grouped
            .into_iter()
            .map(|(id, rows)| (id, rows.into_iter().map(MeetingView::from).collect()))
            .collect())
    }

    async fn contacts_for(&self, ids: &[ClientId]) -> LeadResult<HashMap<ClientId, Vec<ContactView>>> {
        let db = &self.db;
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let query = contact_person::Entity::find()
                .filter(contact_person::Column::ClientId.is_in(chunk.iter().copied()))
                .order_by_asc(contact_person::Column::Id);
            rows.extend(self.read(|| query.clone().all(db)).await?);
        }
        let grouped = group_by(rows, |row| row.client_id);
        Ok(grouped
            .into_iter()
            .map(|(id, rows)| (id, rows.into_iter().map(ContactView::from).collect()))
            .collect())
    }
}

async fn insert_client<C: ConnectionTrait>(
    conn: &C,
    fields: ClientFields,
    now: DateTimeWithTimeZone,
) -> LeadResult<ClientDetails> {
    let model = client::ActiveModel {
        id: NotSet,
        employee_id: Set(fields.employee_id),
        company_name: Set(fields.company_name),
        customer_name: Set(fields.customer_name),
        industry_type: Set(fields.industry_type),
        website: Set(fields.website),
        address: Set(fields.address),
        city: Set(fields.city),
        state: Set(fields.state),
        reference: Set(fields.reference),
        requirements: Set(fields.requirements),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    let mut contacts = Vec::with_capacity(fields.contacts.len());
    for contact in fields.contacts {
        contacts.push(ContactView::from(
            insert_contact_person(conn, model.id, contact, now).await?,
        ));
    }
    Ok(ClientDetails::from(model).with_contacts(contacts))
}

async fn ensure_contact_of<C: ConnectionTrait>(conn: &C, client_id: ClientId, contact_id: i32) -> LeadResult<()> {
    let owner = contact_person::Entity::find_by_id(contact_id)
        .one(conn)
        .await?
        .map(|contact| contact.client_id);
    if owner == Some(client_id) {
        Ok(())
    } else {
        Err(LeadError::validation(format!(
            "contactPersonID {contact_id} does not belong to client {client_id}"
        )))
    }
}
