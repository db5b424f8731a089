use crate::pipeline::{Envelope, PipelineError, Transform};
use energy_client::domain::NewReading;

/// Pure validation of a `NewReading`, with the same rules as HTTP ingest.
pub fn validate_reading(env: Envelope<NewReading>) -> Result<Envelope<NewReading>, PipelineError> {
    let Envelope {
        payload,
        received_at,
    } = env;

    payload
        .validate()
        .map(|payload| Envelope {
            payload,
            received_at,
        })
        .map_err(|e| PipelineError::Transform(e.to_string()))
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<NewReading, NewReading> for ReadingValidation {
    async fn apply(
        &self,
        input: Envelope<NewReading>,
    ) -> Result<Envelope<NewReading>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_reading_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
