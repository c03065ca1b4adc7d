use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{error, info};

use super::Synchronizer;
use crate::store::StoreError;
use crate::survey::SurveyRecord;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("the table writer has stopped")]
    Closed,
}

struct Job {
    record: SurveyRecord,
    reply: oneshot::Sender<Result<(), StoreError>>,
}

/// Cloneable handle for submitting records to the single table writer.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<Job>,
}

impl SyncHandle {
    /// Queue `record` and wait until it has been written (or has failed).
    pub async fn append(&self, record: SurveyRecord) -> Result<(), SubmitError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Job { record, reply })
            .await
            .map_err(|_| SubmitError::Closed)?;
        done.await.map_err(|_| SubmitError::Closed)??;
        Ok(())
    }
}

/// Start the writer task. It owns `sync` and applies queued appends one at a
/// time, so appends from this process never overlap. The task ends once every
/// [`SyncHandle`] is dropped.
pub fn spawn(sync: Synchronizer, capacity: usize) -> (SyncHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
    let worker = tokio::spawn(async move {
        info!(path = sync.path(), "table writer started");
        while let Some(job) = rx.recv().await {
            let result = sync.append_record(&job.record).await;
            if let Err(e) = &result {
                error!(name = %job.record.name, error = ?e, "append failed");
            }
            // submitter may have gone away; nothing to report to then
            let _ = job.reply.send(result);
        }
        info!("table writer stopped");
    });
    (SyncHandle { tx }, worker)
}
