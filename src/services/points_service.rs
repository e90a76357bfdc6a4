use crate::config::LoyaltyConfig;
use crate::entities::{
    PointTransactionType, point_transaction_entity as txs, user_points_entity as points,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    PointTransactionResponse, PointsAdjustmentRequest, PointsAdjustmentResponse,
    TransactionQuery, UserPointsResponse,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// Ledger entry to append alongside a balance change.
pub(crate) struct NewTransaction {
    pub user_id: i64,
    pub points: i64,
    pub transaction_type: PointTransactionType,
    pub order_id: Option<i64>,
    pub promotion_id: Option<i64>,
    pub promotion_name: Option<String>,
    pub redemption_id: Option<i64>,
    pub description: Option<String>,
}

impl NewTransaction {
    pub fn new(user_id: i64, points: i64, transaction_type: PointTransactionType) -> Self {
        Self {
            user_id,
            points,
            transaction_type,
            order_id: None,
            promotion_id: None,
            promotion_name: None,
            redemption_id: None,
            description: None,
        }
    }
}

/// Insert-if-absent of the zero balance row.
pub(crate) async fn ensure_points_row<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<(), DbErr> {
    let row = points::ActiveModel {
        user_id: Set(user_id),
        total_points_earned: Set(0),
        current_balance: Set(0),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    points::Entity::insert(row)
        .on_conflict(
            OnConflict::column(points::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Reads the balance row with FOR UPDATE so concurrent earn/redeem for the same
/// user serialize until the surrounding transaction ends.
pub(crate) async fn lock_points_row<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Option<points::Model>, DbErr> {
    points::Entity::find()
        .filter(points::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(conn)
        .await
}

/// Applies a signed delta to a locked row. Only positive earned/bonus deltas
/// raise the lifetime total.
pub(crate) async fn apply_points_delta<C: ConnectionTrait>(
    conn: &C,
    row: points::Model,
    delta: i64,
    counts_as_earning: bool,
    now: DateTime<Utc>,
) -> AppResult<points::Model> {
    let new_balance = row
        .current_balance
        .checked_add(delta)
        .ok_or_else(|| AppError::InternalError("Points balance overflow".to_string()))?;
    if new_balance < 0 {
        return Err(AppError::InsufficientPoints {
            required: -delta,
            available: row.current_balance,
        });
    }
    let total_earned = if counts_as_earning && delta > 0 {
        row.total_points_earned
            .checked_add(delta)
            .ok_or_else(|| AppError::InternalError("Lifetime points overflow".to_string()))?
    } else {
        row.total_points_earned
    };

    let mut am = row.into_active_model();
    am.current_balance = Set(new_balance);
    am.total_points_earned = Set(total_earned);
    am.updated_at = Set(now);
    Ok(am.update(conn).await?)
}

pub(crate) async fn append_transaction<C: ConnectionTrait>(
    conn: &C,
    entry: NewTransaction,
    now: DateTime<Utc>,
) -> Result<txs::Model, DbErr> {
    txs::ActiveModel {
        user_id: Set(entry.user_id),
        points: Set(entry.points),
        transaction_type: Set(entry.transaction_type),
        order_id: Set(entry.order_id),
        promotion_id: Set(entry.promotion_id),
        promotion_name: Set(entry.promotion_name),
        redemption_id: Set(entry.redemption_id),
        description: Set(entry.description),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// Points ledger: balances and the append-only transaction log.
#[derive(Clone)]
pub struct PointsService {
    pool: DatabaseConnection,
    config: LoyaltyConfig,
}

impl PointsService {
    pub fn new(pool: DatabaseConnection, config: LoyaltyConfig) -> Self {
        Self { pool, config }
    }

    /// Creates the zero balance row if missing and returns the current state.
    pub async fn ensure(&self, user_id: i64) -> AppResult<UserPointsResponse> {
        ensure_points_row(&self.pool, user_id).await?;
        self.get_balance(user_id).await
    }

    pub async fn get_balance(&self, user_id: i64) -> AppResult<UserPointsResponse> {
        let row = points::Entity::find()
            .filter(points::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Points record not found".to_string()))?;
        Ok(row.into())
    }

    /// Newest first.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        query: &TransactionQuery,
    ) -> AppResult<Vec<PointTransactionResponse>> {
        let limit = query
            .limit
            .unwrap_or(self.config.transactions_default_limit)
            .clamp(1, self.config.transactions_max_limit);

        let mut select = txs::Entity::find().filter(txs::Column::UserId.eq(user_id));
        if let Some(raw) = query.transaction_type.as_deref() {
            let kind: PointTransactionType = raw.parse().map_err(AppError::ValidationError)?;
            select = select.filter(txs::Column::TransactionType.eq(kind));
        }

        let rows = select
            .order_by_desc(txs::Column::CreatedAt)
            .order_by_desc(txs::Column::Id)
            .limit(limit)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Administrative bonus or correction. The balance can never go below zero.
    pub async fn adjust(
        &self,
        request: PointsAdjustmentRequest,
    ) -> AppResult<PointsAdjustmentResponse> {
        let kind = request
            .transaction_type
            .unwrap_or(PointTransactionType::Adjustment);
        match kind {
            PointTransactionType::Adjustment | PointTransactionType::Bonus => {}
            other => {
                return Err(AppError::ValidationError(format!(
                    "Manual changes must be bonus or adjustment, got {other}"
                )));
            }
        }
        if request.points == 0 {
            return Err(AppError::ValidationError(
                "Points must not be zero".to_string(),
            ));
        }
        if kind == PointTransactionType::Bonus && request.points < 0 {
            return Err(AppError::ValidationError(
                "Bonus points must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        ensure_points_row(&txn, request.user_id).await?;
        let row = lock_points_row(&txn, request.user_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Points row vanished after insert".into()))?;

        let updated = apply_points_delta(
            &txn,
            row,
            request.points,
            kind == PointTransactionType::Bonus,
            now,
        )
        .await?;

        let mut entry = NewTransaction::new(request.user_id, request.points, kind);
        entry.description = request.description.or_else(|| Some(format!("Manual {kind}")));
        let tx = append_transaction(&txn, entry, now).await?;

        txn.commit().await?;

        log::info!(
            "Points {kind} applied: user={} points={} balance={}",
            request.user_id,
            request.points,
            updated.current_balance
        );

        Ok(PointsAdjustmentResponse {
            transaction: tx.into(),
            balance: updated.into(),
        })
    }
}
