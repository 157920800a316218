//! Bounded parallel fan-out for batch requests.
//!
//! Providers without a native batch path get their requests spread
//! over a fixed number of concurrent workers. Results always come back
//! in input order regardless of completion order. Cancellation is
//! cooperative: dropping the returned future stops new work from
//! starting while in-flight requests run to completion on their own.

use futures::stream::{self, StreamExt as _};
use std::future::Future;

/// Runs `task` over every input with at most `width` in flight,
/// returning outputs in input order.
pub async fn ordered_fan_out<I, O, F, Fut>(inputs: Vec<I>, width: usize, task: F) -> Vec<O>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = O>,
{
    let mut indexed: Vec<(usize, O)> = stream::iter(inputs.into_iter().enumerate())
        .map(|(index, input)| {
            let fut = task(input);
            async move { (index, fut.await) }
        })
        .buffer_unordered(width.max(1))
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn preserves_input_order() {
        let inputs: Vec<u64> = (0..20).collect();
        let outputs = ordered_fan_out(inputs.clone(), 3, |n| async move {
            // Later inputs finish first.
            tokio::time::sleep(std::time::Duration::from_millis(20 - n)).await;
            n * 2
        })
        .await;

        let expected: Vec<u64> = inputs.iter().map(|n| n * 2).collect();
        assert_eq!(outputs, expected);
    }

    #[tokio::test]
    async fn caps_concurrency_at_width() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = ordered_fan_out((0..32).collect::<Vec<u32>>(), 3, |n| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n
            }
        })
        .await;

        assert_eq!(outputs.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_width_still_makes_progress() {
        let outputs = ordered_fan_out(vec![1, 2, 3], 0, |n| async move { n }).await;
        assert_eq!(outputs, vec![1, 2, 3]);
    }
}
