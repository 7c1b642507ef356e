//! Account linking
//!
//! Every committed member gets a user account keyed by email: created on
//! first sight, linked otherwise. An account already bound to a different
//! organization unit keeps its unit; the import pipeline never moves an
//! account across tenants. The member-to-account pointer is always
//! refreshed, which only ever strengthens the member side of the link.

use crate::db::{members, users};
use crate::models::Member;
use crate::parser::RowMap;
use crate::validator::norm_email;
use anyhow::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// Creates or links user accounts for committed members
#[derive(Clone)]
pub struct AccountLinker {
    pool: SqlitePool,
}

impl AccountLinker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Link a committed member to a user account
    pub async fn link(&self, member: &Member, row: &RowMap) -> Result<()> {
        let target_email = row
            .get("company_email")
            .map(|e| norm_email(e))
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| norm_email(&member.email));

        let account = match users::find_by_email(&self.pool, &target_email).await? {
            Some(account) => {
                if let Some(unit) = account.organization_unit_id {
                    if unit != member.organization_unit_id {
                        // Account belongs to another unit; link the member
                        // side only, never reassign the account
                        debug!(
                            email = %target_email,
                            account_unit = unit,
                            member_unit = member.organization_unit_id,
                            "account kept in its current unit"
                        );
                    }
                }
                if account.member_id.is_none() {
                    users::set_member_id(&self.pool, account.id, member.id).await?;
                }
                account
            }
            None => {
                let account = users::UserAccount {
                    id: Uuid::new_v4(),
                    email: target_email,
                    member_id: Some(member.id),
                    organization_unit_id: Some(member.organization_unit_id),
                };
                users::insert_user(&self.pool, &account, &random_credential_hash()).await?;
                account
            }
        };

        // Last committed link wins on the member side
        members::set_member_user(&self.pool, member.id, account.id).await?;

        Ok(())
    }
}

/// Hash of a freshly generated random credential. The account owner
/// resets it through the normal password-reset flow.
fn random_credential_hash() -> String {
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("{:x}", Sha256::digest(password.as_bytes()))
}
