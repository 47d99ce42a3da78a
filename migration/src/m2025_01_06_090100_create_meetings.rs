//! Migration to create the meetings and meeting_participants tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Meetings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meetings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Meetings::Title).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Meetings::MeetingTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Meetings::Duration)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(Meetings::MeetingType)
                            .string_len(20)
                            .not_null()
                            .default("TEAM"),
                    )
                    .col(ColumnDef::new(Meetings::Status).string_len(20).null())
                    .col(
                        ColumnDef::new(Meetings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Meetings::UpdatedAt)
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
                    .name("idx_meetings_meeting_time")
                    .table(Meetings::Table)
                    .col(Meetings::MeetingTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MeetingParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeetingParticipants::MeetingId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MeetingParticipants::UserId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(MeetingParticipants::MeetingId)
                            .col(MeetingParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_participants_meeting_id")
                            .from(MeetingParticipants::Table, MeetingParticipants::MeetingId)
                            .to(Meetings::Table, Meetings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meeting_participants_user_id")
                            .from(MeetingParticipants::Table, MeetingParticipants::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meeting_participants_user_id")
                    .table(MeetingParticipants::Table)
                    .col(MeetingParticipants::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_meeting_participants_user_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MeetingParticipants::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_meetings_meeting_time").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Meetings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Meetings {
    Table,
    Id,
    Title,
    MeetingTime,
    Duration,
    MeetingType,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MeetingParticipants {
    Table,
    MeetingId,
    UserId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
