use crate::pipeline::{Envelope, PipelineError, Transform};
use tank_domain::domain::Reading;

/// Pure validation of a `Reading`.
///
/// Rules:
/// - asset id must not be blank.
/// - present levels must be finite.
pub fn validate_reading(env: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
    let r = &env.payload;

    if r.asset_id.trim().is_empty() {
        return Err(PipelineError::Transform(format!(
            "reading at {} from {} has a blank asset id",
            r.timestamp, env.origin
        )));
    }

    for (name, level) in [("level_percent", r.level_percent), ("level_absolute", r.level_absolute)] {
        if level.is_some_and(|v| !v.is_finite()) {
            return Err(PipelineError::Transform(format!(
                "{name} of asset '{}' is not finite",
                r.asset_id
            )));
        }
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<Reading, Reading> for ReadingValidation {
    async fn apply(&self, input: Envelope<Reading>) -> Result<Envelope<Reading>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("reading_validation_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
