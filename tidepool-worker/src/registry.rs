//! Handler registry
//!
//! Maps each job type to its typed handler. Dispatch decodes the raw
//! payload into the handler's input type, invokes it, and serializes the
//! output, so the runtime only ever sees JSON in and JSON out. The
//! registry is populated during startup and read-only afterwards.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::context::HandlerContext;
use crate::error::JobError;
use tidepool_core::domain::job::JobType;

/// A typed job handler.
#[async_trait]
pub trait Handler: Send + Sync {
    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    async fn handle(
        &self,
        input: Self::Input,
        ctx: &HandlerContext,
    ) -> Result<Self::Output, JobError>;
}

/// Object-safe adapter over [`Handler`] used inside the registry.
#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn dispatch(
        &self,
        payload: serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<serde_json::Value, JobError>;
}

struct TypedHandler<H> {
    job_type: JobType,
    inner: H,
}

#[async_trait]
impl<H: Handler> ErasedHandler for TypedHandler<H> {
    async fn dispatch(
        &self,
        payload: serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<serde_json::Value, JobError> {
        let input: H::Input = serde_json::from_value(payload).map_err(|e| {
            JobError::InvalidInput(format!(
                "payload does not match the {} input schema: {e}",
                self.job_type
            ))
        })?;

        let output = self.inner.handle(input, ctx).await?;

        serde_json::to_value(output).map_err(|e| {
            JobError::Internal(format!(
                "handler for {} produced an unserializable output: {e}",
                self.job_type
            ))
        })
    }
}

/// Registry of handlers keyed by job type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Box<dyn ErasedHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a job type. Idempotent: the last writer
    /// wins.
    pub fn register<H>(&mut self, job_type: JobType, handler: H)
    where
        H: Handler + 'static,
    {
        let replaced = self
            .handlers
            .insert(job_type, Box::new(TypedHandler {
                job_type,
                inner: handler,
            }))
            .is_some();
        debug!(%job_type, replaced, "registered job handler");
    }

    /// Decodes, runs, and encodes one job through its registered handler.
    pub async fn dispatch(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
        ctx: &HandlerContext,
    ) -> Result<serde_json::Value, JobError> {
        let handler = self
            .handlers
            .get(&job_type)
            .ok_or(JobError::UnknownJobType(job_type))?;
        handler.dispatch(payload, ctx).await
    }

    pub fn is_registered(&self, job_type: JobType) -> bool {
        self.handlers.contains_key(&job_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{context_with, MemoryStorage, MockApi, MockEngine};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Deserialize)]
    struct EchoInput {
        message: String,
    }

    #[derive(Debug, Serialize)]
    struct EchoOutput {
        message: String,
    }

    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler for EchoHandler {
        type Input = EchoInput;
        type Output = EchoOutput;

        async fn handle(
            &self,
            input: Self::Input,
            _ctx: &HandlerContext,
        ) -> Result<Self::Output, JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EchoOutput {
                message: input.message,
            })
        }
    }

    fn test_context(dir: &std::path::Path) -> HandlerContext {
        context_with(
            dir,
            Arc::new(MockApi::default()),
            Arc::new(MockEngine::default()),
            Arc::new(MemoryStorage::default()),
        )
    }

    #[tokio::test]
    async fn test_dispatch_decodes_and_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let mut registry = HandlerRegistry::new();
        registry.register(
            JobType::Test,
            EchoHandler {
                calls: Arc::new(AtomicUsize::new(0)),
            },
        );

        let output = registry
            .dispatch(
                JobType::Test,
                serde_json::json!({"message": "hello"}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(output, serde_json::json!({"message": "hello"}));
    }

    #[tokio::test]
    async fn test_unregistered_type_never_reaches_a_handler() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(
            JobType::Test,
            EchoHandler {
                calls: calls.clone(),
            },
        );

        let err = registry
            .dispatch(
                JobType::RegionalAssessment,
                serde_json::json!({"message": "hello"}),
                &ctx,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::UnknownJobType(JobType::RegionalAssessment)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_payload_schema_mismatch_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(
            JobType::Test,
            EchoHandler {
                calls: calls.clone(),
            },
        );

        let err = registry
            .dispatch(JobType::Test, serde_json::json!({"wrong": 1}), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut registry = HandlerRegistry::new();
        registry.register(JobType::Test, EchoHandler { calls: first.clone() });
        registry.register(
            JobType::Test,
            EchoHandler {
                calls: second.clone(),
            },
        );
        assert_eq!(registry.len(), 1);

        registry
            .dispatch(JobType::Test, serde_json::json!({"message": "x"}), &ctx)
            .await
            .unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
