// Transform pipeline for CSS assets.
//
// Steps run in registration order and may mutate the asset's document or
// attach artifacts such as the CSS-module mapping. The pipeline run is
// the asset lifecycle's only await point; dropping the future cancels an
// in-flight step.

use crate::css::CssAsset;
use crate::utils::{CinderError, Logger, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// One transform step.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Unique name for this step, used in logs and failure messages.
    fn name(&self) -> &str;

    /// Mutate the asset. Returning an error fails the asset's build;
    /// there is no partial rollback.
    async fn transform(&self, asset: &mut CssAsset) -> Result<()>;
}

/// Ordered list of transform steps.
#[derive(Default)]
pub struct TransformPipeline {
    steps: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn register(&mut self, step: Arc<dyn Transform>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step against the asset, in registration order. Fails on
    /// the first erroring step.
    pub async fn run(&self, asset: &mut CssAsset) -> Result<()> {
        for step in &self.steps {
            Logger::running_transform(step.name());
            step.transform(asset).await.map_err(|err| {
                CinderError::transform(step.name(), err.to_string())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStep;

    #[async_trait]
    impl Transform for FailingStep {
        fn name(&self) -> &str {
            "failing"
        }

        async fn transform(&self, _asset: &mut CssAsset) -> Result<()> {
            Err(CinderError::Other("boom".to_string()))
        }
    }

    struct AppendStep;

    #[async_trait]
    impl Transform for AppendStep {
        fn name(&self) -> &str {
            "append"
        }

        async fn transform(&self, asset: &mut CssAsset) -> Result<()> {
            asset.parse()?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_step_failure_carries_step_name() {
        let mut pipeline = TransformPipeline::new();
        pipeline.register(Arc::new(FailingStep));

        let mut asset = CssAsset::new("/site/style.css", ".a{color:red}");
        let err = pipeline.run(&mut asset).await.unwrap_err();
        match err {
            CinderError::Transform { step, message } => {
                assert_eq!(step, "failing");
                assert!(message.contains("boom"));
            }
            other => panic!("expected transform error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_registration_order() {
        let mut pipeline = TransformPipeline::new();
        pipeline.register(Arc::new(AppendStep));
        pipeline.register(Arc::new(FailingStep));

        let mut asset = CssAsset::new("/site/style.css", ".a{color:red}");
        let err = pipeline.run(&mut asset).await.unwrap_err();
        assert!(matches!(err, CinderError::Transform { step, .. } if step == "failing"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_a_no_op() {
        let pipeline = TransformPipeline::new();
        let mut asset = CssAsset::new("/site/style.css", ".a{color:red}");
        pipeline.run(&mut asset).await.unwrap();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.len(), 0);
    }
}
