use std::future::Future;
use thiserror::Error;

/// A background task that did not return normally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskFailure(pub String);

/// Run `fut` as its own task and turn a panic inside it into a [`TaskFailure`].
pub async fn run_isolated<F, T>(fut: F) -> Result<T, TaskFailure>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_cancelled() => Err(TaskFailure("task cancelled".to_string())),
        Err(e) => {
            let payload = e.into_panic();
            let msg = if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_owned()
            } else {
                "<unknown>".to_owned()
            };
            Err(TaskFailure(msg))
        }
    }
}
