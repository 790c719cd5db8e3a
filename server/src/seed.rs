use anyhow::{Context, Result};
use products_crm::{
    CrmStore,
    input::{AppendFollowup, LeadTransfer, NewClient, NewContact},
};
use tracing::info;

/// Demo data: a handful of marketing leads spread over the buckets and one
/// lead handed over to management.
pub async fn run(store: &CrmStore) -> Result<()> {
    let companies = [
        ("Northwind Traders", "Anita Rao", None),
        ("Contoso Pharma", "Vikram Shah", Some("first_followup")),
        ("Fabrikam Tools", "Leela Nair", Some("second_followup")),
        ("Tailspin Air", "Arun Das", Some("converted")),
    ];
    let mut converted = None;
    for (company, customer, status) in companies {
        let client = store
            .create_client(NewClient {
                employee_id: Some(1),
                company_name: Some(company.to_string()),
                customer_name: Some(customer.to_string()),
                contacts: vec![NewContact {
                    name: Some(customer.to_string()),
                    ..NewContact::default()
                }],
                ..NewClient::default()
            })
            .await
            .with_context(|| format!("seeding client {company}"))?;
        if let Some(status) = status {
            store
                .append_followup(AppendFollowup {
                    client_id: Some(client.id),
                    employee_id: Some(1),
                    status: Some(status.to_string()),
                    remarks: Some("seeded".to_string()),
                    ..AppendFollowup::default()
                })
                .await
                .with_context(|| format!("seeding followup for {company}"))?;
        }
        if status == Some("converted") {
            converted = Some(client.id);
        }
    }
    if let Some(client_id) = converted {
        store
            .hand_over_to_management(LeadTransfer {
                client_id: Some(client_id),
                employee_id: Some(2),
                remarks: Some("seeded hand-over".to_string()),
            })
            .await
            .context("seeding hand-over")?;
    }
    info!("seed data inserted");
    Ok(())
}
