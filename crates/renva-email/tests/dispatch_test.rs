//! Dispatch and resend tests against a real database

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use renva_database::test_utils::TestDatabase;
use renva_email::{MailProvider, MockMailProvider, OutboundMailService};
use renva_entities::{email_addresses, email_delivery_logs, email_messages, email_threads, users};

async fn seed_queued_message(
    db: &sea_orm::DatabaseConnection,
    alias: &str,
) -> (Uuid, email_messages::Model) {
    let user_id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(user_id),
        email: Set(format!("agent-{}@example.com", user_id)),
        first_name: Set(None),
        last_name: Set(None),
        phone: Set(None),
        company_name: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();

    email_addresses::ActiveModel {
        id: Set(Uuid::new_v4()),
        email_address: Set(alias.to_string()),
        team_id: Set(None),
        user_id: Set(Some(user_id)),
        is_primary: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();

    let thread = email_threads::ActiveModel {
        id: Set(Uuid::new_v4()),
        subject: Set("Inquiry".to_string()),
        last_message_at: Set(Utc::now()),
        status: Set("received".to_string()),
        priority: Set("normal".to_string()),
        needs_follow_up: Set(false),
        lead_email: Set(None),
        lead_name: Set(None),
        lead_phone: Set(None),
        team_id: Set(None),
        user_id: Set(Some(user_id)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let message = email_messages::ActiveModel {
        id: Set(Uuid::new_v4()),
        thread_id: Set(thread.id),
        provider_message_id: Set(None),
        from_address: Set(alias.to_string()),
        from_name: Set(None),
        to_address: Set("jane@x.com".to_string()),
        subject: Set("Re: Inquiry".to_string()),
        body: Set("Thanks for reaching out.\n".to_string()),
        body_html: Set(None),
        status: Set("queued".to_string()),
        is_read: Set(false),
        has_attachments: Set(false),
        is_contact_form: Set(false),
        received_at: Set(None),
        sent_at: Set(None),
        lead_email: Set(None),
        lead_name: Set(None),
        lead_phone: Set(None),
        ai_generated: Set(true),
        ai_confidence: Set(None),
        ai_validation: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();

    (user_id, message)
}

fn unique_alias() -> String {
    format!("desk-{}@agency.n.example.com", Uuid::new_v4())
}

#[tokio::test]
async fn test_dispatch_marks_sent_and_logs_success() {
    let test_db = TestDatabase::with_migrations().await.unwrap();
    let db = test_db.db.clone();

    let alias = unique_alias();
    let (_, message) = seed_queued_message(db.as_ref(), &alias).await;

    let provider = MockMailProvider::new();
    let service = OutboundMailService::new(
        db.clone(),
        Arc::new(provider.clone()),
        "noreply@renva.test".to_string(),
    );

    let outcome = service.dispatch(message.id).await.unwrap();
    assert!(outcome.provider_message_id.starts_with("mock-message-"));

    let updated = email_messages::Entity::find_by_id(message.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "sent");
    assert!(updated.sent_at.is_some());
    assert_eq!(
        updated.provider_message_id,
        Some(outcome.provider_message_id)
    );

    // The From is the owner's primary alias
    let sent = provider.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, alias);

    let logs = email_delivery_logs::Entity::find()
        .filter(email_delivery_logs::Column::MessageId.eq(message.id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "success");
    assert_eq!(logs[0].event_type, "send");
    assert_eq!(logs[0].recipient, "jane@x.com");
}

#[tokio::test]
async fn test_dispatch_failure_keeps_message_queued() {
    let test_db = TestDatabase::with_migrations().await.unwrap();
    let db = test_db.db.clone();

    let alias = unique_alias();
    let (_, message) = seed_queued_message(db.as_ref(), &alias).await;

    let provider = MockMailProvider::new().with_send_failure();
    let service = OutboundMailService::new(
        db.clone(),
        Arc::new(provider),
        "noreply@renva.test".to_string(),
    );

    let result = service.dispatch(message.id).await;
    assert!(result.is_err());

    // Resendable: the row is untouched
    let updated = email_messages::Entity::find_by_id(message.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "queued");
    assert!(updated.sent_at.is_none());

    let logs = email_delivery_logs::Entity::find()
        .filter(email_delivery_logs::Column::MessageId.eq(message.id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "failed");
}

#[tokio::test]
async fn test_resend_exhaustion_marks_failed_terminal() {
    let test_db = TestDatabase::with_migrations().await.unwrap();
    let db = test_db.db.clone();

    let alias = unique_alias();
    let (_, message) = seed_queued_message(db.as_ref(), &alias).await;

    let provider = MockMailProvider::new().with_send_failure();
    let service = OutboundMailService::new(
        db.clone(),
        Arc::new(provider.clone()),
        "noreply@renva.test".to_string(),
    );

    let result = service.resend(message.id).await;
    assert!(result.is_err());
    assert_eq!(provider.send_call_count(), 3);

    let updated = email_messages::Entity::find_by_id(message.id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "failed");

    // Two retrying rows, then the terminal failed row
    let logs = email_delivery_logs::Entity::find()
        .filter(email_delivery_logs::Column::MessageId.eq(message.id))
        .all(db.as_ref())
        .await
        .unwrap();
    let retrying = logs.iter().filter(|l| l.status == "retrying").count();
    let failed = logs.iter().filter(|l| l.status == "failed").count();
    assert_eq!(retrying, 2);
    assert_eq!(failed, 1);
}
