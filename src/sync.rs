//! Background task sync for the terminal view.
//!
//! Backend calls block, so the TUI hands each [`SyncRequest`] to a worker
//! thread and polls for the answer on its event loop. Results for a view
//! that has already exited are simply dropped with the channel.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use tracing::{debug, warn};

use crate::api::{ApiError, TimelineBackend};
use crate::timeline::SyncRequest;

pub struct SyncWorker {
    requests: Sender<SyncRequest>,
    results: Receiver<Result<(), ApiError>>,
}

impl SyncWorker {
    /// Start the worker thread. It exits once the worker is dropped.
    pub fn spawn<B>(backend: B) -> Self
    where
        B: TimelineBackend + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<SyncRequest>();
        let (result_tx, result_rx) = mpsc::channel();

        thread::spawn(move || {
            for request in request_rx {
                debug!(
                    task = %request.task_id,
                    completed = request.completed,
                    "sending task progress"
                );
                let result = backend.set_task_completed(
                    &request.graduate_id,
                    &request.task_id,
                    request.completed,
                );
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        SyncWorker {
            requests: request_tx,
            results: result_rx,
        }
    }

    /// Queue a request for the worker.
    ///
    /// If the worker has died the request fails immediately, so the caller
    /// can roll back.
    pub fn dispatch(&self, request: SyncRequest) -> Result<(), ApiError> {
        self.requests.send(request).map_err(|_| {
            warn!("sync worker is gone");
            ApiError::Transport("sync worker stopped".to_string())
        })
    }

    /// The next finished result, if any.
    pub fn try_result(&self) -> Option<Result<(), ApiError>> {
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ApiError::Transport(
                "sync worker stopped".to_string(),
            ))),
        }
    }
}
