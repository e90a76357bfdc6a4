use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveIden)]
enum UserPoints {
    Table,
    Id,
    UserId,
    TotalPointsEarned,
    CurrentBalance,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PointTransactions {
    Table,
    Id,
    UserId,
    Points,
    TransactionType,
    OrderId,
    PromotionId,
    PromotionName,
    RedemptionId,
    Description,
    CreatedAt,
}

/// multiplier_bp: 10000 = 1.0x. applicable_days: weekday bitmask, bit 0 = Sunday.
#[derive(DeriveIden)]
enum Promotions {
    Table,
    Id,
    Name,
    Description,
    MultiplierBp,
    StartDate,
    EndDate,
    IsActive,
    ApplicableDays,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    Name,
    Description,
    RewardType,
    PointsCost,
    DiscountValue,
    MenuItemId,
    MinOrderValue,
    ValidFrom,
    ValidUntil,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RewardRedemptions {
    Table,
    Id,
    UserId,
    RewardId,
    PointsSpent,
    RewardSnapshot,
    RedeemedAt,
    UsedAt,
    OrderId,
}

#[derive(DeriveIden)]
enum CouponCodes {
    Table,
    Id,
    CouponCode,
    Description,
    DiscountType,
    DiscountValue,
    MinOrderValue,
    MaxUses,
    CurrentUses,
    IsActive,
    StartDate,
    EndDate,
    RestaurantId,
    CreatedAt,
}

/// Owned by the ordering side; created here only if absent.
#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    RestaurantId,
    TotalAmount,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MenuItems {
    Table,
    Id,
    RestaurantId,
    Name,
    Price,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn now_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(&mut id_col(Orders::Id))
                    .col(ColumnDef::new(Orders::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                    .col(&mut now_col(Orders::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MenuItems::Table)
                    .if_not_exists()
                    .col(&mut id_col(MenuItems::Id))
                    .col(ColumnDef::new(MenuItems::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(MenuItems::Name).string_len(255).not_null())
                    .col(ColumnDef::new(MenuItems::Price).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // One balance row per user
        manager
            .create_table(
                Table::create()
                    .table(UserPoints::Table)
                    .if_not_exists()
                    .col(&mut id_col(UserPoints::Id))
                    .col(
                        ColumnDef::new(UserPoints::UserId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(UserPoints::TotalPointsEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserPoints::CurrentBalance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(UserPoints::CurrentBalance).gte(0)),
                    )
                    .col(&mut now_col(UserPoints::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(&mut id_col(Promotions::Id))
                    .col(ColumnDef::new(Promotions::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Promotions::Description).text().null())
                    .col(
                        ColumnDef::new(Promotions::MultiplierBp)
                            .integer()
                            .not_null()
                            .default(10_000),
                    )
                    .col(
                        ColumnDef::new(Promotions::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Promotions::ApplicableDays).small_integer().null())
                    .col(&mut now_col(Promotions::CreatedAt))
                    .col(&mut now_col(Promotions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promotions_active_window")
                    .table(Promotions::Table)
                    .col(Promotions::IsActive)
                    .col(Promotions::StartDate)
                    .col(Promotions::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(&mut id_col(Rewards::Id))
                    .col(ColumnDef::new(Rewards::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Rewards::Description).text().null())
                    .col(ColumnDef::new(Rewards::RewardType).string_len(32).not_null())
                    .col(ColumnDef::new(Rewards::PointsCost).big_integer().not_null())
                    .col(ColumnDef::new(Rewards::DiscountValue).big_integer().null())
                    .col(ColumnDef::new(Rewards::MenuItemId).big_integer().null())
                    .col(
                        ColumnDef::new(Rewards::MinOrderValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rewards::ValidFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::ValidUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(&mut now_col(Rewards::CreatedAt))
                    .col(&mut now_col(Rewards::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardRedemptions::Table)
                    .if_not_exists()
                    .col(&mut id_col(RewardRedemptions::Id))
                    .col(
                        ColumnDef::new(RewardRedemptions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::RewardId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::PointsSpent)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::RewardSnapshot)
                            .json_binary()
                            .not_null(),
                    )
                    .col(&mut now_col(RewardRedemptions::RedeemedAt))
                    .col(
                        ColumnDef::new(RewardRedemptions::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(RewardRedemptions::OrderId).big_integer().null())
                    .to_owned(),
            )
            .await?;

        // History outlives catalog changes: no cascade.
        manager
            .alter_table(
                Table::alter()
                    .table(RewardRedemptions::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_reward_redemptions_reward")
                            .from_tbl(RewardRedemptions::Table)
                            .from_col(RewardRedemptions::RewardId)
                            .to_tbl(Rewards::Table)
                            .to_col(Rewards::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_redemptions_user")
                    .table(RewardRedemptions::Table)
                    .col(RewardRedemptions::UserId)
                    .col(RewardRedemptions::RedeemedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PointTransactions::Table)
                    .if_not_exists()
                    .col(&mut id_col(PointTransactions::Id))
                    .col(
                        ColumnDef::new(PointTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::Points)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PointTransactions::OrderId).big_integer().null())
                    .col(
                        ColumnDef::new(PointTransactions::PromotionId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::PromotionName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointTransactions::RedemptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(PointTransactions::Description).text().null())
                    .col(&mut now_col(PointTransactions::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_point_transactions_user_created")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::UserId)
                    .col(PointTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // At most one earned row per order. sea-query has no partial index builder.
        let conn = manager.get_connection();
        conn.execute(Statement::from_string(
            manager.get_database_backend(),
            r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_point_transactions_earned_order
ON point_transactions (order_id)
WHERE transaction_type = 'earned';
"#
            .to_string(),
        ))
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(CouponCodes::Table)
                    .if_not_exists()
                    .col(&mut id_col(CouponCodes::Id))
                    .col(
                        ColumnDef::new(CouponCodes::CouponCode)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CouponCodes::Description).text().null())
                    .col(
                        ColumnDef::new(CouponCodes::DiscountType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponCodes::DiscountValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponCodes::MinOrderValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CouponCodes::MaxUses).integer().null())
                    .col(
                        ColumnDef::new(CouponCodes::CurrentUses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CouponCodes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CouponCodes::StartDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CouponCodes::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(CouponCodes::RestaurantId).big_integer().null())
                    .col(&mut now_col(CouponCodes::CreatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // orders and menu_items belong to the ordering side and are left in place
        for table in [
            CouponCodes::Table.into_iden(),
            PointTransactions::Table.into_iden(),
            RewardRedemptions::Table.into_iden(),
            Rewards::Table.into_iden(),
            Promotions::Table.into_iden(),
            UserPoints::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
