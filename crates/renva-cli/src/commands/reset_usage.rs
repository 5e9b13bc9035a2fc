use clap::Args;
use renva_entities::subscriptions;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::info;

/// Zero `current_usage` on every active, open-ended subscription.
/// Run from cron at billing-period boundaries.
#[derive(Args)]
pub struct ResetUsageCommand {
    /// Database connection URL
    #[arg(long, env = "RENVA_DATABASE_URL")]
    pub database_url: String,
}

impl ResetUsageCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let db = renva_database::establish_connection(&self.database_url).await?;

        let result = subscriptions::Entity::update_many()
            .col_expr(subscriptions::Column::CurrentUsage, Expr::value(0))
            .filter(subscriptions::Column::Status.eq("active"))
            .filter(subscriptions::Column::EndDate.is_null())
            .exec(db.as_ref())
            .await?;

        info!("Reset usage on {} subscriptions", result.rows_affected);
        println!("Reset usage on {} subscriptions", result.rows_affected);

        Ok(())
    }
}
