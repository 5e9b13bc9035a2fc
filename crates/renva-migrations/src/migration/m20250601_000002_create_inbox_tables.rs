use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========================================
        // EMAIL_ADDRESSES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailAddresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailAddresses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailAddresses::EmailAddress)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(EmailAddresses::TeamId).uuid().null())
                    .col(ColumnDef::new(EmailAddresses::UserId).uuid().null())
                    .col(
                        ColumnDef::new(EmailAddresses::IsPrimary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailAddresses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Exactly one owner: team XOR user
                    .check(
                        Expr::col(EmailAddresses::UserId)
                            .is_not_null()
                            .and(Expr::col(EmailAddresses::TeamId).is_null())
                            .or(Expr::col(EmailAddresses::UserId)
                                .is_null()
                                .and(Expr::col(EmailAddresses::TeamId).is_not_null())),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_THREADS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailThreads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailThreads::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::Subject)
                            .string_len(998)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::LastMessageAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::Status)
                            .string_len(50)
                            .not_null()
                            .default("received"),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::Priority)
                            .string_len(50)
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::NeedsFollowUp)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(EmailThreads::LeadEmail).string_len(255).null())
                    .col(ColumnDef::new(EmailThreads::LeadName).string_len(255).null())
                    .col(ColumnDef::new(EmailThreads::LeadPhone).string_len(100).null())
                    .col(ColumnDef::new(EmailThreads::TeamId).uuid().null())
                    .col(ColumnDef::new(EmailThreads::UserId).uuid().null())
                    .col(
                        ColumnDef::new(EmailThreads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EmailThreads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(EmailThreads::UserId)
                            .is_not_null()
                            .and(Expr::col(EmailThreads::TeamId).is_null())
                            .or(Expr::col(EmailThreads::UserId)
                                .is_null()
                                .and(Expr::col(EmailThreads::TeamId).is_not_null())),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_threads_user_id")
                    .table(EmailThreads::Table)
                    .col(EmailThreads::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_threads_team_id")
                    .table(EmailThreads::Table)
                    .col(EmailThreads::TeamId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_threads_last_message_at")
                    .table(EmailThreads::Table)
                    .col(EmailThreads::LastMessageAt)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_MESSAGES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailMessages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmailMessages::ThreadId).uuid().not_null())
                    .col(
                        ColumnDef::new(EmailMessages::ProviderMessageId)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::FromAddress)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::FromName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::ToAddress)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::Subject)
                            .string_len(998)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EmailMessages::Body).text().not_null())
                    .col(ColumnDef::new(EmailMessages::BodyHtml).text().null())
                    .col(
                        ColumnDef::new(EmailMessages::Status)
                            .string_len(50)
                            .not_null()
                            .default("received"),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::HasAttachments)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::IsContactForm)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::ReceivedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::SentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::LeadEmail)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::LeadName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::LeadPhone)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::AiGenerated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(EmailMessages::AiConfidence).double().null())
                    .col(
                        ColumnDef::new(EmailMessages::AiValidation)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_messages_thread")
                            .from(EmailMessages::Table, EmailMessages::ThreadId)
                            .to(EmailThreads::Table, EmailThreads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_messages_thread_id")
                    .table(EmailMessages::Table)
                    .col(EmailMessages::ThreadId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_messages_status")
                    .table(EmailMessages::Table)
                    .col(EmailMessages::Status)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_ATTACHMENTS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailAttachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailAttachments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmailAttachments::MessageId).uuid().not_null())
                    .col(
                        ColumnDef::new(EmailAttachments::FileName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailAttachments::FileType)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailAttachments::FileSize)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailAttachments::StoragePath)
                            .string_len(1000)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailAttachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_attachments_message")
                            .from(EmailAttachments::Table, EmailAttachments::MessageId)
                            .to(EmailMessages::Table, EmailMessages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_RAW_MESSAGES TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailRawMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailRawMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailRawMessages::ProviderMessageId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailRawMessages::RawContent)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailRawMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_raw_messages_provider_id")
                    .table(EmailRawMessages::Table)
                    .col(EmailRawMessages::ProviderMessageId)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_DELIVERY_LOGS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailDeliveryLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::MessageId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::EventType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::Recipient)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::Status)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::RawRequest)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::RawResponse)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailDeliveryLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_delivery_logs_message")
                            .from(EmailDeliveryLogs::Table, EmailDeliveryLogs::MessageId)
                            .to(EmailMessages::Table, EmailMessages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // EMAIL_WORKFLOWS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(EmailWorkflows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailWorkflows::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmailWorkflows::AgentId).uuid().not_null())
                    .col(
                        ColumnDef::new(EmailWorkflows::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::SubjectFilters)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::BodyFilters)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::SendApplicationLink)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::CustomMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EmailWorkflows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_email_workflows_agent_id")
                    .table(EmailWorkflows::Table)
                    .col(EmailWorkflows::AgentId)
                    .to_owned(),
            )
            .await?;

        // ========================================
        // WORKFLOW_LOGS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(WorkflowLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkflowLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkflowLogs::WorkflowId).uuid().not_null())
                    .col(
                        ColumnDef::new(WorkflowLogs::Status)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowLogs::EmailSubject)
                            .string_len(998)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowLogs::EmailFrom)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowLogs::ActionTaken)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(WorkflowLogs::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(WorkflowLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workflow_logs_workflow")
                            .from(WorkflowLogs::Table, WorkflowLogs::WorkflowId)
                            .to(EmailWorkflows::Table, EmailWorkflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ========================================
        // PROCESSED_EMAILS TABLE
        // ========================================
        manager
            .create_table(
                Table::create()
                    .table(ProcessedEmails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProcessedEmails::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProcessedEmails::ProviderMessageId)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ProcessedEmails::AgentId).uuid().null())
                    .col(
                        ColumnDef::new(ProcessedEmails::ProcessedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProcessedEmails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailWorkflows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailDeliveryLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailRawMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailAttachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailThreads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EmailAddresses::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum EmailAddresses {
    Table,
    Id,
    EmailAddress,
    TeamId,
    UserId,
    IsPrimary,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailThreads {
    Table,
    Id,
    Subject,
    LastMessageAt,
    Status,
    Priority,
    NeedsFollowUp,
    LeadEmail,
    LeadName,
    LeadPhone,
    TeamId,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmailMessages {
    Table,
    Id,
    ThreadId,
    ProviderMessageId,
    FromAddress,
    FromName,
    ToAddress,
    Subject,
    Body,
    BodyHtml,
    Status,
    IsRead,
    HasAttachments,
    IsContactForm,
    ReceivedAt,
    SentAt,
    LeadEmail,
    LeadName,
    LeadPhone,
    AiGenerated,
    AiConfidence,
    AiValidation,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailAttachments {
    Table,
    Id,
    MessageId,
    FileName,
    FileType,
    FileSize,
    StoragePath,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailRawMessages {
    Table,
    Id,
    ProviderMessageId,
    RawContent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailDeliveryLogs {
    Table,
    Id,
    MessageId,
    EventType,
    Recipient,
    Status,
    RawRequest,
    RawResponse,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailWorkflows {
    Table,
    Id,
    AgentId,
    Name,
    Active,
    SubjectFilters,
    BodyFilters,
    SendApplicationLink,
    CustomMessage,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WorkflowLogs {
    Table,
    Id,
    WorkflowId,
    Status,
    EmailSubject,
    EmailFrom,
    ActionTaken,
    ErrorMessage,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProcessedEmails {
    Table,
    Id,
    ProviderMessageId,
    AgentId,
    ProcessedAt,
}
