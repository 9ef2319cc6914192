use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use uuid::Uuid;

use crate::models::{AutomationRule, MailboxAccount};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url.to_string(),
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

// Mailbox account database operations
pub mod mailbox_accounts {
    use super::*;

    /// List accounts eligible for catch-up: google provider, both tokens
    /// present, not disconnected, and a stored cursor from a completed
    /// initial sync. Optionally narrowed to one address (lowercased).
    pub async fn list_eligible(
        conn: &mut AsyncPgConnection,
        email_filter: Option<&str>,
    ) -> anyhow::Result<Vec<MailboxAccount>> {
        use crate::schema::mailbox_accounts::dsl::*;

        let mut query = mailbox_accounts
            .filter(provider.eq("google"))
            .filter(access_token.is_not_null())
            .filter(refresh_token.is_not_null())
            .filter(disconnected_at.is_null())
            .filter(last_synced_cursor.is_not_null())
            .order_by(created_at.asc())
            .into_boxed();

        if let Some(filter) = email_filter {
            query = query.filter(email.eq(filter.to_lowercase()));
        }

        let accounts = query.load::<MailboxAccount>(conn).await?;

        Ok(accounts)
    }

    pub async fn get_by_email(
        conn: &mut AsyncPgConnection,
        address: &str,
    ) -> anyhow::Result<Option<MailboxAccount>> {
        use crate::schema::mailbox_accounts::dsl::*;

        let account = mailbox_accounts
            .filter(email.eq(address.to_lowercase()))
            .first::<MailboxAccount>(conn)
            .await
            .optional()?;

        Ok(account)
    }

    pub async fn get_by_id(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
    ) -> anyhow::Result<MailboxAccount> {
        use crate::schema::mailbox_accounts::dsl::*;

        let account = mailbox_accounts
            .filter(id.eq(account_id))
            .first::<MailboxAccount>(conn)
            .await?;

        Ok(account)
    }

    pub async fn update_last_synced_cursor(
        conn: &mut AsyncPgConnection,
        account_id: Uuid,
        cursor: &str,
    ) -> anyhow::Result<()> {
        use crate::schema::mailbox_accounts::dsl::*;

        diesel::update(mailbox_accounts.filter(id.eq(account_id)))
            .set(last_synced_cursor.eq(cursor))
            .execute(conn)
            .await?;

        Ok(())
    }
}

// Automation rule database operations
pub mod automation_rules {
    use super::*;

    pub async fn list_active_for_account(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
    ) -> anyhow::Result<Vec<AutomationRule>> {
        use crate::schema::automation_rules::dsl::*;

        let rules = automation_rules
            .filter(account_id.eq(owner_id))
            .filter(is_active.eq(true))
            .order_by(created_at.asc())
            .load::<AutomationRule>(conn)
            .await?;

        Ok(rules)
    }
}
