use tokio::sync::watch;

/// Publishes whether any transport call is currently in flight.
pub struct LoadingGauge {
    tx: watch::Sender<usize>,
}

impl LoadingGauge {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Mark a request as started; the returned guard marks it finished on drop.
    pub fn start(&self) -> LoadingGuard<'_> {
        self.tx.send_modify(|count| *count += 1);
        LoadingGuard { gauge: self }
    }

    pub fn in_flight(&self) -> usize {
        *self.tx.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.tx.subscribe()
    }
}

impl Default for LoadingGauge {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LoadingGuard<'a> {
    gauge: &'a LoadingGauge,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.gauge
            .tx
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
