//! Simulated household sensors posting to the readings endpoint.

use anyhow::Result;
use energy_service::observability;
use rand::Rng;
use serde::Serialize;
use std::{env, time::Duration};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const DEFAULT_API: &str = "http://localhost:5000/api/readings";
const SEND_PROBABILITY: f64 = 0.7;
const BATCH_INTERVAL: Duration = Duration::from_secs(5);

/// (device, min watts, max watts)
const DEVICES: &[(&str, f64, f64)] = &[
    ("fridge", 90.0, 150.0),
    ("light_living", 5.0, 20.0),
    ("ac", 800.0, 2000.0),
    ("washer", 500.0, 1200.0),
    ("tv", 30.0, 120.0),
];

#[derive(Debug, Serialize)]
struct Payload {
    device: &'static str,
    watts: f64,
    timestamp: String,
}

fn next_batch() -> Result<Vec<Payload>> {
    let mut rng = rand::rng();
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;

    let mut batch = Vec::with_capacity(DEVICES.len());
    for &(device, min_w, max_w) in DEVICES {
        if !rng.random_bool(SEND_PROBABILITY) {
            continue;
        }
        let watts = (rng.random_range(min_w..max_w) * 100.0).round() / 100.0;
        batch.push(Payload {
            device,
            watts,
            timestamp: timestamp.clone(),
        });
    }
    Ok(batch)
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let api = env::args().nth(1).unwrap_or_else(|| DEFAULT_API.to_string());
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    tracing::info!(%api, "sensor simulator started");
    let mut ticker = tokio::time::interval(BATCH_INTERVAL);

    loop {
        ticker.tick().await;

        for payload in next_batch()? {
            match client.post(&api).json(&payload).send().await {
                Ok(resp) => tracing::info!(
                    device = payload.device,
                    watts = payload.watts,
                    status = %resp.status(),
                    "sent"
                ),
                Err(e) => tracing::warn!(device = payload.device, error = %e, "send failed"),
            }
        }
    }
}
