//! Fan-out join used by stages and the template compiler.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Runs every future concurrently and waits for all of them to settle.
///
/// Results come back in input order. If any future fails, the error that
/// arrived first is returned, but only after the others have finished; later
/// errors are dropped.
pub async fn join_settled<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<_> = futures
        .into_iter()
        .enumerate()
        .map(|(index, fut)| async move { (index, fut.await) })
        .collect();

    let mut slots: Vec<Option<T>> = Vec::with_capacity(pending.len());
    slots.resize_with(pending.len(), || None);
    let mut first_error = None;

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let delays = [30u64, 10, 20];
        let results = join_settled(delays.iter().map(|&ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(ms)
        }))
        .await
        .unwrap();

        assert_eq!(results, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_first_error_wins_after_all_settle() {
        let finished = AtomicUsize::new(0);
        let finished = &finished;

        let result = join_settled((0..3u64).map(|i| async move {
            tokio::time::sleep(Duration::from_millis(10 * (3 - i))).await;
            finished.fetch_add(1, Ordering::SeqCst);
            if i == 0 {
                Err(format!("slow failure {i}"))
            } else if i == 2 {
                Err(format!("fast failure {i}"))
            } else {
                Ok(i)
            }
        }))
        .await;

        assert_eq!(result.unwrap_err(), "fast failure 2");
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<u8> = join_settled(Vec::<futures::future::Ready<Result<u8, ()>>>::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
