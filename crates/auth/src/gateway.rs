//! Durable fact mutations (role grants, relations) pushed to the policy store.

use std::sync::Arc;

use crate::error::AuthzError;
use crate::fact::{BulkFact, Fact};
use crate::policy::PolicyClient;
use crate::value::ToValue;

const AUDIT: &str = "gitclub::audit";

#[derive(Clone)]
pub struct FactGateway {
    policy: Arc<dyn PolicyClient>,
}

impl FactGateway {
    pub fn new(policy: Arc<dyn PolicyClient>) -> Self {
        Self { policy }
    }

    /// Insert a single fact. All arguments must be bound.
    pub async fn tell(&self, predicate: &str, args: &[&(dyn ToValue + Sync)]) -> Result<(), AuthzError> {
        let fact = Fact::new(
            predicate,
            args.iter().map(|a| a.to_arg().encode(false)).collect(),
        );
        tracing::info!(target: AUDIT, %fact, "tell");
        self.policy.bulk(&[], std::slice::from_ref(&fact)).await?;
        Ok(())
    }

    /// Submit deletions and insertions as one batch.
    ///
    /// Delete patterns may contain unbound arguments; insert facts may not.
    /// The batch is a single remote call so the store applies it all or not
    /// at all. No retry here.
    pub async fn bulk_update(
        &self,
        delete: &[BulkFact],
        insert: &[BulkFact],
    ) -> Result<(), AuthzError> {
        let delete_facts: Vec<Fact> = delete.iter().map(|f| f.encode(true)).collect();
        let insert_facts: Vec<Fact> = insert.iter().map(|f| f.encode(false)).collect();

        tracing::info!(
            target: AUDIT,
            delete = ?delete_facts.iter().map(ToString::to_string).collect::<Vec<_>>(),
            insert = ?insert_facts.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "bulk update"
        );

        self.policy.bulk(&delete_facts, &insert_facts).await?;
        Ok(())
    }
}

impl core::fmt::Debug for FactGateway {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FactGateway").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PolicyCall, RecordingPolicy};
    use crate::value::Value;

    #[tokio::test]
    async fn overlapping_delete_and_insert_go_out_as_one_batch() {
        let policy = Arc::new(RecordingPolicy::default());
        let gateway = FactGateway::new(policy.clone());

        let user = Value::new("User", "4");
        let repo = Value::new("Repository", "2");
        let delete = [BulkFact::new("has_role")
            .arg(&user)
            .arg(&None::<String>)
            .arg(&repo)];
        let insert = [BulkFact::new("has_role").arg(&user).arg("maintainer").arg(&repo)];

        gateway.bulk_update(&delete, &insert).await.unwrap();

        let calls = policy.calls();
        assert_eq!(calls.len(), 1);
        let PolicyCall::Bulk { delete, tell } = &calls[0] else {
            panic!("expected a bulk call");
        };
        assert_eq!(delete.len(), 1);
        assert!(delete[0].args[1].is_empty());
        assert_eq!(tell[0].args[1], Value::string("maintainer"));
    }

    #[tokio::test]
    async fn bulk_update_propagates_remote_failures() {
        let gateway = FactGateway::new(Arc::new(RecordingPolicy::failing()));
        let err = gateway
            .bulk_update(&[], &[BulkFact::new("is_closed").arg(&Value::new("Issue", "1"))])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn tell_inserts_a_single_bound_fact() {
        let policy = Arc::new(RecordingPolicy::default());
        let gateway = FactGateway::new(policy.clone());
        let repo = Value::new("Repository", "2");
        let org = Value::new("Organization", "1");

        gateway
            .tell("has_relation", &[&repo, &"organization", &org])
            .await
            .unwrap();

        assert_eq!(
            policy.calls(),
            vec![PolicyCall::Bulk {
                delete: vec![],
                tell: vec![Fact::new(
                    "has_relation",
                    vec![repo, Value::string("organization"), org]
                )],
            }]
        );
    }
}
