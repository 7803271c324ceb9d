use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use super::{MonitorContext, PercentSink, TranslationMonitor};
use crate::artifact::ArtifactRef;
use crate::config::MonitorConfig;
use crate::error::Result;

/// Placeholder progress for backends without a status channel.
///
/// Every tick adds a random increment in `[min_increment, max_increment)`.
/// Once the total reaches 100 the configured result path is returned. The
/// numbers say nothing about real backend progress.
pub struct SimulatedMonitor {
    tick: Duration,
    min_increment: f64,
    max_increment: f64,
    result_path: String,
    rng: Mutex<StdRng>,
}

impl SimulatedMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let min_increment = config.min_increment.max(0.0);
        let mut max_increment = config.max_increment.max(min_increment);
        if max_increment <= 0.0 {
            max_increment = 1.0;
        }

        Self {
            tick: Duration::from_millis(config.tick_interval_ms),
            min_increment,
            max_increment,
            result_path: config.result_path,
            rng: Mutex::new(rng),
        }
    }

    fn next_increment(&self) -> f64 {
        if self.max_increment <= self.min_increment {
            return self.max_increment;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(self.min_increment..self.max_increment)
    }
}

#[async_trait]
impl TranslationMonitor for SimulatedMonitor {
    async fn monitor(&self, job: &MonitorContext, report: PercentSink) -> Result<ArtifactRef> {
        info!("Simulating translation progress for job {}", job.job_id);
        let mut progress = 0.0_f64;

        loop {
            sleep(self.tick).await;
            progress += self.next_increment();
            if progress >= 100.0 {
                break;
            }
            debug!("Job {} simulated progress {:.1}%", job.job_id, progress);
            report(progress.floor() as u8);
        }

        Ok(ArtifactRef::new(self.result_path.clone())
            .with_caption(&job.source.code, &job.source.display_name)
            .with_caption(&job.target.code, &job.target.display_name))
    }
}
