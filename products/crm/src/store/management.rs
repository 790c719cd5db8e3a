use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use entity::{client, management_client, management_contact, management_followup};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    CrmStore, ID_CHUNK, event_stamp, group_by, latest_management_row, latest_marketing_row, sql,
    sql::LeadFilter,
};
use crate::{
    aggregate::Counts,
    classifier::ManagementBucket,
    error::{LeadError, LeadResult},
    event::{ClientId, EmployeeId, LeadRef, ManagementEvent, MarketingEvent},
    input::{
        AppendManagementFollowup, LeadTransfer, NewClient, ValidFollowup, ValidManagementFollowup,
    },
    legacy::{ExportedContact, ParsedContact, parse_legacy_contacts},
    pipeline::ManagementPipeline,
    resolver::sort_newest_first,
    status::{ManagementStatus, MarketingStatus, SharedChannel},
    view::{ClientDetails, ContactView, ManagementLead},
};

impl CrmStore {
    #[instrument(name = "crm.management.create_client", skip_all, fields(employee_id = ?input.employee_id))]
    pub async fn create_management_client(&self, input: NewClient) -> LeadResult<ClientDetails> {
        let fields = input.validate()?;
        let now = self.now();
        let txn = self.db.begin().await?;
        let model = management_client::ActiveModel {
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
        .insert(&txn)
        .await?;
        let mut contacts = Vec::with_capacity(fields.contacts.len());
        for contact in fields.contacts {
            contacts.push(ContactView::from(
                insert_management_contact(&txn, model.id, contact, now).await?,
            ));
        }
        txn.commit().await?;
        info!(client_id = model.id, "management client created");
        Ok(ClientDetails::from(model).with_contacts(contacts))
    }

    #[instrument(name = "crm.management.get_client", skip(self))]
    pub async fn get_management_client(&self, client_id: ClientId) -> LeadResult<ClientDetails> {
        let db = &self.db;
        let model = self
            .read(|| management_client::Entity::find_by_id(client_id).one(db))
            .await?
            .ok_or_else(|| LeadError::not_found("management client", client_id))?;
        let mut contacts = self.management_contacts_for(&[client_id]).await?;
        Ok(ClientDetails::from(model).with_contacts(contacts.remove(&client_id).unwrap_or_default()))
    }

    #[instrument(name = "crm.management.set_active", skip(self))]
    pub async fn set_management_client_active(&self, client_id: ClientId, active: bool) -> LeadResult<ClientDetails> {
        let existing = management_client::Entity::find_by_id(client_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LeadError::not_found("management client", client_id))?;
        if existing.active != active {
            let mut model: management_client::ActiveModel = existing.into();
            model.active = Set(active);
            model.updated_at = Set(self.now());
            model.update(&self.db).await?;
            info!(client_id, active, "management client visibility changed");
        }
        self.get_management_client(client_id).await
    }

    /// Adds the contacts of a legacy JSON array as normalized rows and
    /// returns the client's full contact list.
    #[instrument(name = "crm.management.import_contacts", skip(self, payload))]
    pub async fn import_legacy_contacts(&self, client_id: ClientId, payload: Value) -> LeadResult<Vec<ExportedContact>> {
        let contacts = parse_legacy_contacts(payload)?;
        let now = self.now();
        let txn = self.db.begin().await?;
        management_client::Entity::find_by_id(client_id)
            .one(&txn)
            .await?
            .ok_or_else(|| LeadError::not_found("management client", client_id))?;
        let imported = contacts.len();
        for contact in contacts {
            insert_management_contact(&txn, client_id, contact, now).await?;
        }
        txn.commit().await?;
        info!(imported, "legacy contacts imported");
        self.export_legacy_contacts(client_id).await
    }

    #[instrument(name = "crm.management.export_contacts", skip(self))]
    pub async fn export_legacy_contacts(&self, client_id: ClientId) -> LeadResult<Vec<ExportedContact>> {
        let db = &self.db;
        self.read(|| management_client::Entity::find_by_id(client_id).one(db))
            .await?
            .ok_or_else(|| LeadError::not_found("management client", client_id))?;
        let rows = self
            .read(|| {
                management_contact::Entity::find()
                    .filter(management_contact::Column::ManagementClientId.eq(client_id))
                    .order_by_asc(management_contact::Column::Id)
                    .all(db)
            })
            .await?;
        Ok(rows.into_iter().map(ExportedContact::from).collect())
    }

    #[instrument(
        name = "crm.management.append",
        skip_all,
        fields(employee_id = ?request.employee_id, status = ?request.status)
    )]
    pub async fn append_management_followup(&self, request: AppendManagementFollowup) -> LeadResult<ManagementEvent> {
        let valid = request.validate()?;
        let txn = self.db.begin().await?;
        ensure_active_target(&txn, valid.target).await?;
        if let LeadRef::Marketing(client_id) = valid.target {
            ensure_with_management(&txn, client_id).await?;
        }
        if let Some(contact_id) = valid.contact_id {
            ensure_management_contact_of(&txn, valid.target, contact_id).await?;
        }
        let event = self.insert_management_event(&txn, valid).await?;
        txn.commit().await?;
        info!(followup_id = event.id, lead = ?event.client, "management followup appended");
        self.publish_management(&event);
        Ok(event)
    }

    /// Moves a converted marketing lead into management by recording its
    /// first management event (`lead`).
    #[instrument(name = "crm.management.handover", skip_all, fields(client_id = ?request.client_id))]
    pub async fn hand_over_to_management(&self, request: LeadTransfer) -> LeadResult<ManagementEvent> {
        let transfer = request.validate()?;
        let target = LeadRef::Marketing(transfer.client_id);
        let txn = self.db.begin().await?;
        ensure_active_target(&txn, target).await?;
        let marketing = latest_marketing_row(&txn, transfer.client_id).await?;
        let Some(marketing) = marketing.filter(|row| row.status == MarketingStatus::Converted) else {
            return Err(LeadError::validation(format!(
                "client {} must be converted before hand-over",
                transfer.client_id
            )));
        };
        let handed = latest_management_row(&txn, transfer.client_id).await?;
        if with_management(handed.map(|row| utc(row.created_at)), Some(utc(marketing.created_at))) {
            return Err(LeadError::Conflict(format!(
                "client {} is already with management",
                transfer.client_id
            )));
        }
        let event = self
            .insert_management_event(
                &txn,
                ValidManagementFollowup {
                    target,
                    employee_id: transfer.employee_id,
                    status: ManagementStatus::Lead,
                    remarks: transfer.remarks,
                    next_followup_date: None,
                    contact_id: None,
                },
            )
            .await?;
        txn.commit().await?;
        info!(followup_id = event.id, "lead handed over to management");
        self.publish_management(&event);
        Ok(event)
    }

    /// Sends a handed-over lead back to marketing: a `first_followup` event
    /// with `Following` set.
    #[instrument(name = "crm.management.return", skip_all, fields(client_id = ?request.client_id))]
    pub async fn return_to_marketing(&self, request: LeadTransfer) -> LeadResult<MarketingEvent> {
        let transfer = request.validate()?;
        let txn = self.db.begin().await?;
        ensure_with_management(&txn, transfer.client_id).await?;
        let event = self
            .insert_marketing_event(
                &txn,
                ValidFollowup {
                    client_id: transfer.client_id,
                    employee_id: transfer.employee_id,
                    status: MarketingStatus::FirstFollowup,
                    remarks: transfer.remarks,
                    next_followup_date: None,
                    contact_person_id: None,
                    shared: SharedChannel::NotShared,
                    following: Some(true),
                    new_contact: None,
                    meeting: None,
                },
            )
            .await?;
        txn.commit().await?;
        info!(followup_id = event.id, "lead returned to marketing");
        self.publish_marketing(&event);
        Ok(event)
    }

    /// Newest-first management history of one lead.
    #[instrument(name = "crm.management.history", skip(self))]
    pub async fn management_history(&self, target: LeadRef) -> LeadResult<Vec<ManagementEvent>> {
        let db = &self.db;
        let exists = match target {
            LeadRef::Management(id) => self
                .read(|| management_client::Entity::find_by_id(id).one(db))
                .await?
                .is_some(),
            LeadRef::Marketing(id) => self
                .read(|| client::Entity::find_by_id(id).one(db))
                .await?
                .is_some(),
        };
        if !exists {
            return Err(not_found(target));
        }
        let mut histories = self.management_histories(&[target]).await?;
        Ok(histories.remove(&target).unwrap_or_default())
    }

    #[instrument(name = "crm.management.list", skip(self))]
    pub async fn list_management_followups(
        &self,
        bucket: ManagementBucket,
        employee_id: Option<EmployeeId>,
        as_of: NaiveDate,
    ) -> LeadResult<Vec<ManagementLead>> {
        let selected: Vec<_> = self
            .management_scope(employee_id)
            .await?
            .into_iter()
            .filter(|(_, event)| ManagementPipeline::classify(event.as_ref()) == bucket)
            .collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let targets: Vec<_> = selected.iter().map(|(lead, _)| *lead).collect();
        let mut details = self.lead_details(&targets).await?;
        let mut histories = self.management_histories(&targets).await?;
        let mut leads = Vec::with_capacity(selected.len());
        for (lead, event) in selected {
            let Some(client_details) = details.remove(&lead) else {
                continue;
            };
            leads.push(ManagementLead {
                client: lead,
                client_details,
                bucket: ManagementPipeline::classify(event.as_ref()),
                missed: ManagementPipeline::is_missed(event.as_ref(), as_of),
                latest_status: event,
                history: histories.remove(&lead).unwrap_or_default(),
            });
        }
        leads.sort_by(|a, b| {
            let a_key = a.latest_status.as_ref().map(ManagementEvent::order_key);
            let b_key = b.latest_status.as_ref().map(ManagementEvent::order_key);
            b_key.cmp(&a_key).then(b.client.cmp(&a.client))
        });
        info!(rows = leads.len(), "bucket listed");
        Ok(leads)
    }

    #[instrument(name = "crm.management.counts", skip(self))]
    pub async fn management_counts(&self, employee_id: Option<EmployeeId>, as_of: NaiveDate) -> LeadResult<Counts> {
        let scope = self.management_scope(employee_id).await?;
        Ok(ManagementPipeline::aggregate_counts(
            scope.iter().map(|(_, event)| event.as_ref()),
            as_of,
        ))
    }

    /// Leads visible to management: active management clients (scoped by
    /// owner) plus active marketing clients currently handed over (scoped by
    /// the employee of their latest management event). A returned lead drops
    /// out until it is handed over again.
    async fn management_scope(&self, employee_id: Option<EmployeeId>) -> LeadResult<Vec<(LeadRef, Option<ManagementEvent>)>> {
        let mut query = management_client::Entity::find()
            .select_only()
            .column(management_client::Column::Id)
            .filter(management_client::Column::Active.eq(true));
        if let Some(employee_id) = employee_id {
            query = query.filter(management_client::Column::EmployeeId.eq(employee_id));
        }
        let db = &self.db;
        let owned: Vec<ClientId> = self
            .read(|| query.clone().into_tuple::<ClientId>().all(db))
            .await?;
        let mut owned_latest = self
            .latest_management(sql::MANAGEMENT_OWNED_EVENTS, LeadFilter::Active { employee_id })
            .await?;
        let linked_latest = self
            .latest_management(sql::MANAGEMENT_LINKED_EVENTS, LeadFilter::Active { employee_id: None })
            .await?;

        let mut scope: Vec<_> = owned
            .into_iter()
            .map(|id| {
                let lead = LeadRef::Management(id);
                (lead, owned_latest.remove(&lead))
            })
            .collect();
        let linked_ids: Vec<_> = linked_latest.keys().map(|lead| lead.id()).collect();
        let marketing_latest = if linked_ids.is_empty() {
            HashMap::new()
        } else {
            self.latest_marketing(LeadFilter::Ids(&linked_ids)).await?
        };

        let mut linked: Vec<_> = linked_latest
            .into_iter()
            .filter(|(lead, event)| {
                let local_at = marketing_latest.get(&lead.id()).map(|local| local.created_at);
                with_management(Some(event.created_at), local_at)
            })
            .filter(|(_, event)| employee_id.is_none_or(|employee| event.employee_id == employee))
            .map(|(lead, event)| (lead, Some(event)))
            .collect();
        linked.sort_by_key(|(lead, _)| *lead);
        scope.extend(linked);
        Ok(scope)
    }

    async fn lead_details(&self, targets: &[LeadRef]) -> LeadResult<HashMap<LeadRef, ClientDetails>> {
        let (owned, linked) = split_targets(targets);
        let db = &self.db;
        let mut details = HashMap::with_capacity(targets.len());

        let mut contacts = self.management_contacts_for(&owned).await?;
        for chunk in owned.chunks(ID_CHUNK) {
            let query = management_client::Entity::find()
                .filter(management_client::Column::Id.is_in(chunk.iter().copied()));
            for model in self.read(|| query.clone().all(db)).await? {
                let id = model.id;
                details.insert(
                    LeadRef::Management(id),
                    ClientDetails::from(model).with_contacts(contacts.remove(&id).unwrap_or_default()),
                );
            }
        }
        for chunk in linked.chunks(ID_CHUNK) {
            let query = client::Entity::find().filter(client::Column::Id.is_in(chunk.iter().copied()));
            for model in self.read(|| query.clone().all(db)).await? {
                details.insert(LeadRef::Marketing(model.id), ClientDetails::from(model));
            }
        }
        Ok(details)
    }

    async fn management_histories(&self, targets: &[LeadRef]) -> LeadResult<HashMap<LeadRef, Vec<ManagementEvent>>> {
        let (owned, linked) = split_targets(targets);
        let db = &self.db;
        let mut rows = Vec::new();
        for chunk in owned.chunks(ID_CHUNK) {
            let query = management_followup::Entity::find()
                .filter(management_followup::Column::IsMarketing.eq(false))
                .filter(management_followup::Column::ClientId.is_in(chunk.iter().copied()));
            rows.extend(self.read(|| query.clone().all(db)).await?);
        }
        for chunk in linked.chunks(ID_CHUNK) {
            let query = management_followup::Entity::find()
                .filter(management_followup::Column::IsMarketing.eq(true))
                .filter(management_followup::Column::MarketingClientId.is_in(chunk.iter().copied()));
            rows.extend(self.read(|| query.clone().all(db)).await?);
        }
        let events = rows
            .into_iter()
            .map(ManagementEvent::try_from)
            .collect::<LeadResult<Vec<_>>>()?;
        let mut grouped = group_by(events, |event| event.client);
        grouped
            .values_mut()
            .for_each(|history| sort_newest_first(history.as_mut_slice()));
        Ok(grouped)
    }

    async fn management_contacts_for(&self, ids: &[ClientId]) -> LeadResult<HashMap<ClientId, Vec<ContactView>>> {
        let db = &self.db;
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let query = management_contact::Entity::find()
                .filter(management_contact::Column::ManagementClientId.is_in(chunk.iter().copied()))
                .order_by_asc(management_contact::Column::Id);
            rows.extend(self.read(|| query.clone().all(db)).await?);
        }
        let grouped = group_by(rows, |row| row.management_client_id);
        Ok(grouped
            .into_iter()
            .map(|(id, rows)| (id, rows.into_iter().map(ContactView::from).collect()))
            .collect())
    }

    async fn insert_management_event(
        &self,
        txn: &DatabaseTransaction,
        valid: ValidManagementFollowup,
    ) -> LeadResult<ManagementEvent> {
        let (client_id, marketing_client_id, created_at) = match valid.target {
            LeadRef::Management(id) => (Some(id), None, self.now()),
            LeadRef::Marketing(id) => {
                let own = latest_management_row(txn, id).await?;
                let local = latest_marketing_row(txn, id).await?;
                let at = event_stamp(
                    self.now(),
                    own.map(|row| row.created_at),
                    local.map(|row| row.created_at),
                );
                (None, Some(id), at)
            }
        };
        let row = management_followup::ActiveModel {
            id: NotSet,
            client_id: Set(client_id),
            marketing_client_id: Set(marketing_client_id),
            is_marketing: Set(valid.target.is_marketing()),
            contact_id: Set(valid.contact_id),
            employee_id: Set(valid.employee_id),
            status: Set(valid.status),
            remarks: Set(valid.remarks),
            next_followup_date: Set(valid.next_followup_date),
            created_at: Set(created_at),
        }
        .insert(txn)
        .await?;
        ManagementEvent::try_from(row)
    }
}

/// A handed-over lead sits with management while its latest management event
/// is strictly newer than its latest marketing event. An equal instant leaves
/// the lead with marketing; writes never produce one (see `event_stamp`).
fn with_management(handed: Option<DateTime<Utc>>, local: Option<DateTime<Utc>>) -> bool {
    match (handed, local) {
        (Some(handed), Some(local)) => handed > local,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

async fn ensure_with_management<C: ConnectionTrait>(conn: &C, client_id: ClientId) -> LeadResult<()> {
    let handed = latest_management_row(conn, client_id).await?;
    let local = latest_marketing_row(conn, client_id).await?;
    if with_management(handed.map(|row| utc(row.created_at)), local.map(|row| utc(row.created_at))) {
        Ok(())
    } else {
        Err(LeadError::validation(format!("client {client_id} is not with management")))
    }
}

fn split_targets(targets: &[LeadRef]) -> (Vec<ClientId>, Vec<ClientId>) {
    let mut owned = Vec::new();
    let mut linked = Vec::new();
    for target in targets {
        match target {
            LeadRef::Management(id) => owned.push(*id),
            LeadRef::Marketing(id) => linked.push(*id),
        }
    }
    (owned, linked)
}

fn not_found(target: LeadRef) -> LeadError {
    match target {
        LeadRef::Management(id) => LeadError::not_found("management client", id),
        LeadRef::Marketing(id) => LeadError::not_found("client", id),
    }
}

async fn ensure_active_target<C: ConnectionTrait>(conn: &C, target: LeadRef) -> LeadResult<()> {
    let active = match target {
        LeadRef::Management(id) => management_client::Entity::find_by_id(id)
            .one(conn)
            .await?
            .is_some_and(|model| model.active),
        LeadRef::Marketing(id) => client::Entity::find_by_id(id)
            .one(conn)
            .await?
            .is_some_and(|model| model.active),
    };
    if active {
        Ok(())
    } else {
        Err(not_found(target))
    }
}

async fn ensure_management_contact_of<C: ConnectionTrait>(conn: &C, target: LeadRef, contact_id: i32) -> LeadResult<()> {
    let LeadRef::Management(client_id) = target else {
        return Err(LeadError::validation(
            "contactID only applies to management clients",
        ));
    };
    let owner = management_contact::Entity::find_by_id(contact_id)
        .one(conn)
        .await?
        .map(|contact| contact.management_client_id);
    if owner == Some(client_id) {
        Ok(())
    } else {
        Err(LeadError::validation(format!(
            "contactID {contact_id} does not belong to management client {client_id}"
        )))
    }
}

async fn insert_management_contact<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    contact: ParsedContact,
    now: DateTimeWithTimeZone,
) -> LeadResult<management_contact::Model> {
    let model = management_contact::ActiveModel {
        id: NotSet,
        management_client_id: Set(client_id),
        name: Set(contact.name),
        phone: Set(contact.phone),
        email: Set(contact.email),
        designation: Set(contact.designation),
        created_at: Set(now),
    };
    Ok(model.insert(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn equal_instants_leave_the_lead_with_marketing() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        assert!(!with_management(Some(at), Some(at)));
        assert!(with_management(Some(at + Duration::milliseconds(1)), Some(at)));
        assert!(with_management(Some(at), None));
        assert!(!with_management(None, Some(at)));
    }
}
