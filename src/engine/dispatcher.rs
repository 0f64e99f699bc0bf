use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::AppResult;
use crate::metrics::{AttackResult, LogRecord, duration_ms};

use super::EngineContext;

/// Fixed pool of workers sharing one tick stream.
#[derive(Debug)]
pub struct Dispatcher {
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn `workers` tasks. Each tick is consumed by exactly one worker and
    /// closing the tick channel is the only way to stop them.
    #[must_use]
    pub fn start(
        workers: usize,
        ticks: &async_channel::Receiver<Instant>,
        context: &Arc<EngineContext>,
    ) -> Self {
        let workers = (0..workers.max(1))
            .map(|_| {
                let ticks = ticks.clone();
                let context = context.clone();
                tokio::spawn(async move {
                    run_worker(&context, &ticks).await;
                })
            })
            .collect();
        Self { workers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait until every worker has drained its last request.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker task panicked.
    pub async fn wait(self) -> AppResult<()> {
        for worker in self.workers {
            worker.await?;
        }
        Ok(())
    }
}

async fn run_worker(context: &EngineContext, ticks: &async_channel::Receiver<Instant>) {
    while ticks.recv().await.is_ok() {
        let Some(template) = context.pool.next_template() else {
            break;
        };
        context.stats.record_sent();
        let started = Instant::now();
        let outcome = context.transport.execute(template).await;
        let finished = Instant::now();

        let result = match &outcome {
            Ok(status) => AttackResult::response(*status, started, finished),
            Err(err) => AttackResult::failed(err.class(), started, finished),
        };
        context.stats.record_result(&result);

        if let Some(log) = context.log.as_ref() {
            log.send(LogRecord {
                offset: started.saturating_duration_since(context.started),
                elapsed: result.elapsed(),
                status: result.status,
                in_flight: context.stats.in_flight(),
                rate: context.target.get(),
            });
        }

        if context.echo {
            let latency_ms = duration_ms(result.elapsed());
            match outcome {
                Ok(status) => debug!(
                    method = %template.method,
                    url = %template.url,
                    status,
                    latency_ms,
                    "request completed"
                ),
                Err(err) => debug!(
                    method = %template.method,
                    url = %template.url,
                    status = 0,
                    latency_ms,
                    error = %err,
                    "request failed"
                ),
            }
        }
    }
}
