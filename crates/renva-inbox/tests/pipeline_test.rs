//! End-to-end pipeline tests against a real database
//!
//! Each test seeds its own users/aliases so tests can share the database
//! container without interfering.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use renva_ai::{AiClient, MockAiClient};
use renva_database::test_utils::TestDatabase;
use renva_email::{MailProvider, MockMailProvider, OutboundMailService};
use renva_entities::{
    email_addresses, email_messages, email_raw_messages, email_threads, email_workflows,
    processed_emails, subscriptions, users,
};
use renva_inbox::{
    AiResponder, FetchedMessage, InboxError, InboxPipeline, MockMailboxConnector,
    PostmarkInboundEmail, ReplyOutcome, ThreadResolver, UsageService, WorkflowProcessor,
};

struct TestEnv {
    test_db: TestDatabase,
    provider: MockMailProvider,
    pipeline: Arc<InboxPipeline>,
}

impl TestEnv {
    fn db(&self) -> &DatabaseConnection {
        self.test_db.db.as_ref()
    }
}

async fn setup(ai: MockAiClient, provider: MockMailProvider) -> TestEnv {
    let test_db = TestDatabase::with_migrations().await.unwrap();
    let db = test_db.db.clone();

    let provider_arc: Arc<dyn MailProvider> = Arc::new(provider.clone());
    let mail = Arc::new(OutboundMailService::new(
        db.clone(),
        provider_arc,
        "noreply@renva.test".to_string(),
    ));
    let usage = Arc::new(UsageService::new(db.clone(), mail.clone()));
    let resolver = Arc::new(ThreadResolver::new(db.clone(), usage));
    let ai_arc: Arc<dyn AiClient> = Arc::new(ai);
    let responder = Arc::new(AiResponder::new(db.clone(), ai_arc, mail));
    let pipeline = Arc::new(InboxPipeline::new(resolver, responder));

    TestEnv {
        test_db,
        provider,
        pipeline,
    }
}

async fn seed_user(db: &DatabaseConnection, alias: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(user_id),
        email: Set(format!("agent-{}@example.com", user_id)),
        first_name: Set(Some("Sam".to_string())),
        last_name: Set(Some("Agent".to_string())),
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

    user_id
}

async fn seed_subscription(db: &DatabaseConnection, user_id: Uuid, limit: i32, usage: i32) {
    subscriptions::ActiveModel {
        user_id: Set(Some(user_id)),
        team_id: Set(None),
        plan_name: Set("starter".to_string()),
        status: Set("active".to_string()),
        conversation_limit: Set(limit),
        current_usage: Set(usage),
        end_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

fn unique_alias(prefix: &str) -> String {
    format!("{}-{}@agency.n.example.com", prefix, Uuid::new_v4())
}

fn inquiry_payload(to: &str, message_id: &str) -> PostmarkInboundEmail {
    PostmarkInboundEmail {
        from: "sender@example.com".to_string(),
        from_name: Some("Jane Doe".to_string()),
        to: to.to_string(),
        subject: "Inquiry".to_string(),
        text_body: Some(
            "Hi, I'm interested. Email: jane@x.com Phone: 082 555 1234".to_string(),
        ),
        html_body: None,
        message_id: message_id.to_string(),
        date: "2025-06-01T10:00:00Z".to_string(),
        attachments: vec![],
        headers: vec![],
    }
}

async fn threads_for_user(db: &DatabaseConnection, user_id: Uuid) -> Vec<email_threads::Model> {
    email_threads::Entity::find()
        .filter(email_threads::Column::UserId.eq(user_id))
        .all(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_contact_form_inquiry() {
    let alias = unique_alias("desk");
    let env = setup(
        MockAiClient::new()
            .with_reply(Some("Re: Inquiry"), "Thanks for reaching out!")
            .with_confidence(0.9),
        MockMailProvider::new(),
    )
    .await;
    let user_id = seed_user(env.db(), &alias).await;

    // Recipient carries a display name; the lookup must use the bare address
    let payload = inquiry_payload(&format!("Desk <{}>", alias), "pm-e2e-1");
    let processed = env.pipeline.process(payload).await.unwrap();

    // Thread fields per the contact-form scenario
    let thread = &processed.thread;
    assert_eq!(thread.user_id, Some(user_id));
    assert_eq!(thread.team_id, None);
    assert_eq!(thread.subject, "Inquiry");
    assert_eq!(thread.lead_email.as_deref(), Some("jane@x.com"));
    assert_eq!(thread.lead_phone.as_deref(), Some("082 555 1234"));

    // One inbound message, flagged as a contact form
    let messages = email_messages::Entity::find()
        .filter(email_messages::Column::ThreadId.eq(thread.id))
        .all(env.db())
        .await
        .unwrap();
    let inbound = messages.iter().find(|m| !m.ai_generated).unwrap();
    assert_eq!(inbound.status, "received");
    assert!(inbound.is_contact_form);
    assert_eq!(inbound.from_address, "sender@example.com");

    // The AI draft was persisted and dispatched
    let outbound = messages.iter().find(|m| m.ai_generated).unwrap();
    assert_eq!(outbound.status, "sent");
    assert_eq!(outbound.to_address, "jane@x.com");
    assert_eq!(outbound.ai_confidence, Some(0.9));
    assert!(outbound.sent_at.is_some());
    assert!(matches!(processed.reply, ReplyOutcome::Sent { .. }));

    // The reply went out from the owner's primary alias
    let sent = env.provider.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@x.com");
    assert_eq!(sent[0].from, alias);

    // Raw payload kept for audit
    let raw_count = email_raw_messages::Entity::find()
        .filter(email_raw_messages::Column::ProviderMessageId.eq("pm-e2e-1"))
        .count(env.db())
        .await
        .unwrap();
    assert_eq!(raw_count, 1);
}

#[tokio::test]
async fn test_unmapped_recipient_creates_no_rows() {
    let env = setup(MockAiClient::new(), MockMailProvider::new()).await;
    let alias = unique_alias("ghost");

    let payload = inquiry_payload(&alias, "pm-unmapped-1");
    let err = env.pipeline.process(payload).await.unwrap_err();
    assert!(matches!(err, InboxError::AddressNotMapped(_)));

    // Nothing was persisted
    let message_count = email_messages::Entity::find()
        .filter(email_messages::Column::ProviderMessageId.eq("pm-unmapped-1"))
        .count(env.db())
        .await
        .unwrap();
    assert_eq!(message_count, 0);

    let raw_count = email_raw_messages::Entity::find()
        .filter(email_raw_messages::Column::ProviderMessageId.eq("pm-unmapped-1"))
        .count(env.db())
        .await
        .unwrap();
    assert_eq!(raw_count, 0);
}

#[tokio::test]
async fn test_quota_exhausted_notifies_owner_once_and_aborts() {
    let env = setup(MockAiClient::new(), MockMailProvider::new()).await;
    let alias = unique_alias("full");
    let user_id = seed_user(env.db(), &alias).await;
    seed_subscription(env.db(), user_id, 1, 1).await;

    let payload = inquiry_payload(&alias, "pm-quota-1");
    let err = env.pipeline.process(payload).await.unwrap_err();
    assert!(matches!(err, InboxError::QuotaExceeded(_)));

    // No thread was created
    assert!(threads_for_user(env.db(), user_id).await.is_empty());

    // Exactly one notification, addressed to the owner's registered email
    let sent = env.provider.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, format!("agent-{}@example.com", user_id));
    assert!(sent[0].subject.contains("limit reached"));
}

#[tokio::test]
async fn test_duplicate_delivery_creates_two_threads() {
    let env = setup(MockAiClient::new(), MockMailProvider::new()).await;
    let alias = unique_alias("dup");
    let user_id = seed_user(env.db(), &alias).await;
    seed_subscription(env.db(), user_id, 10, 0).await;

    let payload = inquiry_payload(&alias, "pm-dup-1");
    env.pipeline.process(payload.clone()).await.unwrap();
    env.pipeline.process(payload).await.unwrap();

    // No dedup on the provider message id in the webhook path
    let threads = threads_for_user(env.db(), user_id).await;
    assert_eq!(threads.len(), 2);

    let raw_count = email_raw_messages::Entity::find()
        .filter(email_raw_messages::Column::ProviderMessageId.eq("pm-dup-1"))
        .count(env.db())
        .await
        .unwrap();
    assert_eq!(raw_count, 2);

    // Both conversations counted against the subscription
    let subscription = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .one(env.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.current_usage, 2);
}

#[tokio::test]
async fn test_ai_failure_still_acknowledges_ingestion() {
    let env = setup(MockAiClient::new().with_failure(), MockMailProvider::new()).await;
    let alias = unique_alias("aifail");
    let user_id = seed_user(env.db(), &alias).await;

    let payload = inquiry_payload(&alias, "pm-aifail-1");
    let processed = env.pipeline.process(payload).await.unwrap();

    assert!(matches!(
        processed.reply,
        ReplyOutcome::Failed {
            message_id: None,
            ..
        }
    ));

    // The inbound message is persisted, no draft exists
    let threads = threads_for_user(env.db(), user_id).await;
    assert_eq!(threads.len(), 1);
    let drafts = email_messages::Entity::find()
        .filter(email_messages::Column::ThreadId.eq(threads[0].id))
        .filter(email_messages::Column::AiGenerated.eq(true))
        .count(env.db())
        .await
        .unwrap();
    assert_eq!(drafts, 0);
}

#[tokio::test]
async fn test_dispatch_failure_leaves_draft_queued() {
    let env = setup(
        MockAiClient::new().with_reply(None, "Draft body"),
        MockMailProvider::new().with_send_failure(),
    )
    .await;
    let alias = unique_alias("sendfail");
    let user_id = seed_user(env.db(), &alias).await;

    let payload = inquiry_payload(&alias, "pm-sendfail-1");
    let processed = env.pipeline.process(payload).await.unwrap();

    let ReplyOutcome::Failed {
        message_id: Some(draft_id),
        ..
    } = processed.reply
    else {
        panic!("expected a failed reply with a persisted draft");
    };

    // Draft stays queued for manual resend, and the attempt was logged
    let draft = email_messages::Entity::find_by_id(draft_id)
        .one(env.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.status, "queued");
    assert!(draft.sent_at.is_none());
    // Subject falls back to Re: + thread subject when the AI omits one
    assert_eq!(draft.subject, "Re: Inquiry");

    let threads = threads_for_user(env.db(), user_id).await;
    assert_eq!(threads.len(), 1);

    let logs = renva_entities::email_delivery_logs::Entity::find()
        .filter(renva_entities::email_delivery_logs::Column::MessageId.eq(draft_id))
        .all(env.db())
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "failed");
}

#[tokio::test]
async fn test_workflow_batch_dedups_on_provider_message_id() {
    let test_db = TestDatabase::with_migrations().await.unwrap();
    let db = test_db.db.clone();

    let alias = unique_alias("batch");
    let agent_id = seed_user(db.as_ref(), &alias).await;

    email_workflows::ActiveModel {
        id: Set(Uuid::new_v4()),
        agent_id: Set(agent_id),
        name: Set("inquiries".to_string()),
        active: Set(true),
        subject_filters: Set(serde_json::json!(["inquiry"])),
        body_filters: Set(serde_json::json!([])),
        send_application_link: Set(false),
        custom_message: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    let provider = MockMailProvider::new();
    let connector = MockMailboxConnector::new();
    let provider_message_id = format!("gm-{}", Uuid::new_v4());
    connector.push_message(FetchedMessage {
        id: provider_message_id.clone(),
        subject: "Property Inquiry for Apartment".to_string(),
        body: "Is it still available?".to_string(),
        from: "john.tenant@example.com".to_string(),
        from_name: Some("John Tenant".to_string()),
        timestamp: Utc::now(),
    });

    let processor = WorkflowProcessor::new(
        db.clone(),
        Arc::new(MockAiClient::new().with_reply(None, "We have availability.")),
        Arc::new(provider.clone()),
        Arc::new(connector),
    );

    // First run replies; the second skips the already-processed message
    let first = processor.process_agent_inbox(agent_id).await.unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.errors, 0);

    let second = processor.process_agent_inbox(agent_id).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.errors, 0);

    assert_eq!(provider.send_call_count(), 1);
    assert_eq!(provider.sent_emails()[0].to, "john.tenant@example.com");

    let registered = processed_emails::Entity::find()
        .filter(processed_emails::Column::ProviderMessageId.eq(provider_message_id))
        .count(db.as_ref())
        .await
        .unwrap();
    assert_eq!(registered, 1);
}
