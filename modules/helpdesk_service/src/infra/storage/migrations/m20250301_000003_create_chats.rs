use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chats::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chats::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Chats::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Chats::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Pair uniqueness is not enforced; the caller looks for an existing chat first
        manager
            .create_table(
                Table::create()
                    .table(ChatMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMembers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMembers::ChatId).string().not_null())
                    .col(ColumnDef::new(ChatMembers::ProfileId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_members_chat")
                            .from(ChatMembers::Table, ChatMembers::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_members_profile")
                            .from(ChatMembers::Table, ChatMembers::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_members_profile_id")
                    .table(ChatMembers::Table)
                    .col(ChatMembers::ProfileId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Messages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Messages::ChatId).string().not_null())
                    .col(ColumnDef::new(Messages::ProfileId).string().not_null())
                    .col(ColumnDef::new(Messages::Content).text().not_null())
                    .col(
                        ColumnDef::new(Messages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_chat")
                            .from(Messages::Table, Messages::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_chat_id_created_at")
                    .table(Messages::Table)
                    .col(Messages::ChatId)
                    .col(Messages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MessageReads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MessageReads::ChatId).string().not_null())
                    .col(ColumnDef::new(MessageReads::ProfileId).string().not_null())
                    .col(ColumnDef::new(MessageReads::LastReadMessageId).string())
                    .col(ColumnDef::new(MessageReads::LastReadAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MessageReads::UpdatedAt).timestamp_with_time_zone())
                    .primary_key(
                        Index::create()
                            .col(MessageReads::ChatId)
                            .col(MessageReads::ProfileId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_reads_chat")
                            .from(MessageReads::Table, MessageReads::ChatId)
                            .to(Chats::Table, Chats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_reads_profile")
                            .from(MessageReads::Table, MessageReads::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageReads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Chats::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Chats {
    Table,
    Id,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ChatMembers {
    Table,
    Id,
    ChatId,
    ProfileId,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    ChatId,
    ProfileId,
    Content,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MessageReads {
    Table,
    ChatId,
    ProfileId,
    LastReadMessageId,
    LastReadAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
