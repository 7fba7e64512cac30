use super::{write_leads_csv, Store};
use outreach_core::{
    config::StoreConfig,
    error::OutreachError,
    lead::{LeadFilter, LeadStatus, NewLead},
    Contact,
};

fn new_lead(contact: &str, product: &str) -> NewLead {
    NewLead {
        contact: Contact::from_canonical(contact),
        display_name: "Ahmed".to_string(),
        location_hint: "Riyadh".to_string(),
        confirmed_product: product.to_string(),
        conversation_summary: "Customer: I want it".to_string(),
    }
}

#[tokio::test]
async fn test_append_lead_is_pending() {
    let store = Store::in_memory().await.unwrap();
    let lead = store
        .append_lead(&new_lead("+966501234567", "Blue 3-pack"))
        .await
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Pending);
    assert_eq!(lead.confirmed_product, "Blue 3-pack");
    assert_eq!(lead.contact.as_str(), "+966501234567");
    assert_eq!(lead.location_hint, "Riyadh");
}

#[tokio::test]
async fn test_leads_are_appended_never_merged() {
    let store = Store::in_memory().await.unwrap();
    store
        .append_lead(&new_lead("+966501234567", "Blue 3-pack"))
        .await
        .unwrap();
    store
        .append_lead(&new_lead("+966501234567", "Red single"))
        .await
        .unwrap();

    let all = store.list_leads(&LeadFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].id < all[1].id);
    assert_eq!(all[0].confirmed_product, "Blue 3-pack");
    assert_eq!(all[1].confirmed_product, "Red single");
}

#[tokio::test]
async fn test_list_leads_filters() {
    let store = Store::in_memory().await.unwrap();
    store
        .append_lead(&new_lead("+966501234567", "A"))
        .await
        .unwrap();
    store
        .append_lead(&new_lead("+966509876543", "B"))
        .await
        .unwrap();
    store
        .update_lead_status(&Contact::from_canonical("+966509876543"), LeadStatus::Contacted)
        .await
        .unwrap();

    let pending = store
        .list_leads(&LeadFilter {
            status: Some(LeadStatus::Pending),
            contact: None,
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].confirmed_product, "A");

    let by_contact = store
        .list_leads(&LeadFilter {
            status: None,
            contact: Some(Contact::from_canonical("+966509876543")),
        })
        .await
        .unwrap();
    assert_eq!(by_contact.len(), 1);
    assert_eq!(by_contact[0].status, LeadStatus::Contacted);

    let none = store
        .list_leads(&LeadFilter {
            status: Some(LeadStatus::Converted),
            contact: Some(Contact::from_canonical("+966501234567")),
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_update_status_targets_most_recent_lead() {
    let store = Store::in_memory().await.unwrap();
    let contact = Contact::from_canonical("+966501234567");
    let first = store.append_lead(&new_lead(contact.as_str(), "A")).await.unwrap();
    let second = store.append_lead(&new_lead(contact.as_str(), "B")).await.unwrap();

    let updated = store
        .update_lead_status(&contact, LeadStatus::Converted)
        .await
        .unwrap();
    assert_eq!(updated.id, second.id);
    assert_eq!(updated.status, LeadStatus::Converted);

    let untouched = store.get_lead(first.id).await.unwrap();
    assert_eq!(untouched.status, LeadStatus::Pending);
}

#[tokio::test]
async fn test_update_status_unknown_contact_is_not_found() {
    let store = Store::in_memory().await.unwrap();
    let err = store
        .update_lead_status(&Contact::from_canonical("+10000000000"), LeadStatus::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::NotFound(_)));
}

#[tokio::test]
async fn test_count_by_status_includes_zero() {
    let store = Store::in_memory().await.unwrap();
    store
        .append_lead(&new_lead("+966501234567", "A"))
        .await
        .unwrap();
    let counts = store.count_leads_by_status().await.unwrap();
    assert_eq!(counts.len(), 4);
    assert_eq!(counts[0], (LeadStatus::Pending, 1));
    assert!(counts[1..].iter().all(|(_, n)| *n == 0));
}

#[tokio::test]
async fn test_write_csv_quotes_fields() {
    let store = Store::in_memory().await.unwrap();
    let mut lead = new_lead("+966501234567", "Blue, large");
    lead.conversation_summary = "Customer: \"yes\"".to_string();
    store.append_lead(&lead).await.unwrap();

    let leads = store.list_leads(&LeadFilter::default()).await.unwrap();
    let mut buf = Vec::new();
    write_leads_csv(&mut buf, &leads).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestamp,contact,display_name,location_hint,confirmed_product,conversation_summary,status"
    );
    let row = lines.next().unwrap();
    assert!(row.contains("\"Blue, large\""));
    assert!(row.contains("\"Customer: \"\"yes\"\"\""));
    assert!(row.ends_with(",pending"));
}

#[tokio::test]
async fn test_export_csv_to_file() {
    let store = Store::in_memory().await.unwrap();
    store
        .append_lead(&new_lead("+966501234567", "A"))
        .await
        .unwrap();
    let path = std::env::temp_dir().join("__outreach_test_leads_export__.csv");
    let n = store
        .export_leads_csv(&path, &LeadFilter::default())
        .await
        .unwrap();
    assert_eq!(n, 1);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_store_on_disk_reopens() {
    let dir = std::env::temp_dir().join(format!("__outreach_store_{}__", std::process::id()));
    let config = StoreConfig {
        db_path: dir.join("leads.db").to_string_lossy().to_string(),
    };
    {
        let store = Store::new(&config).await.unwrap();
        store
            .append_lead(&new_lead("+966501234567", "A"))
            .await
            .unwrap();
        store.pool().close().await;
    }
    let store = Store::new(&config).await.unwrap();
    let leads = store.list_leads(&LeadFilter::default()).await.unwrap();
    assert_eq!(leads.len(), 1);
    store.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}
