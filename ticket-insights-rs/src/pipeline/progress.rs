use std::sync::atomic::{AtomicUsize, Ordering};

/// Completion counter shared by concurrently running units of work
#[derive(Debug)]
pub struct ProgressCounter {
    label: &'static str,
    total: usize,
    completed: AtomicUsize,
}

impl ProgressCounter {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Record one finished unit and return the new count
    pub fn tick(&self) -> usize {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;

        // Log roughly every tenth of the batch, and the last one
        let step = (self.total / 10).max(1);
        if done == self.total || done % step == 0 {
            log::info!("Progress: {}/{} {}", done, self.total, self.label);
        } else {
            log::debug!("Progress: {}/{} {}", done, self.total, self.label);
        }
        done
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_ticks() {
        let counter = Arc::new(ProgressCounter::new("tickets", 50));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    counter.tick();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.completed(), 50);
    }
}
