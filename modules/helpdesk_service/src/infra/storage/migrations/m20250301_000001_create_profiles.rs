use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::UserId).string())
                    .col(ColumnDef::new(Profiles::FullName).string())
                    .col(ColumnDef::new(Profiles::Role).string())
                    .col(ColumnDef::new(Profiles::AvatarUrl).string())
                    .col(ColumnDef::new(Profiles::Occupation).string())
                    .col(ColumnDef::new(Profiles::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Profiles::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // One profile per identity
        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_user_id")
                    .table(Profiles::Table)
                    .col(Profiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    UserId,
    FullName,
    Role,
    AvatarUrl,
    Occupation,
    CreatedAt,
    UpdatedAt,
}
