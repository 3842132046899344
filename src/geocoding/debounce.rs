use crate::domain::GeoPoint;
use crate::geocoding::{AddressCache, Geocoder, GeocodingError, ResolvedAddress};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, trace};

/// The address resolved for the latest coordinate of a quiet period.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressUpdate {
    pub point: GeoPoint,
    pub address: ResolvedAddress,
}

/// Turns a burst of coordinate changes into at most one reverse geocoding
/// lookup per quiet period, always for the most recent coordinate.
///
/// All state lives on the spawned task. Dropping every handle stops it once
/// the last pending coordinate has been resolved.
#[derive(Debug, Clone)]
pub struct DebouncedAddressResolver {
    tx: UnboundedSender<GeoPoint>,
}

impl DebouncedAddressResolver {
    pub fn spawn<G: Geocoder + 'static>(geocoder: Arc<G>, window: Duration, updates: Sender<AddressUpdate>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(geocoder, window, updates);

        (DebouncedAddressResolver { tx }, tokio::spawn(debouncer.run(rx)))
    }

    /// Records a new coordinate. Never blocks, may be called for every map movement.
    pub fn on_coordinate_changed(&self, point: GeoPoint) -> Result<(), SendError<GeoPoint>> {
        self.tx.send(point)
    }
}

struct Lookup {
    cycle: u64,
    point: GeoPoint,
    result: Result<String, GeocodingError>,
}

struct Debouncer<G: Geocoder> {
    geocoder: Arc<G>,
    cache: AddressCache,
    window: Duration,
    pending: Option<GeoPoint>,
    last_event: Instant,
    /// Increases with every coordinate, lookups of older cycles are stale.
    cycle: u64,
    in_flight: Option<JoinHandle<()>>,
    updates: Sender<AddressUpdate>,
}

impl<G: Geocoder + 'static> Debouncer<G> {
    fn new(geocoder: Arc<G>, window: Duration, updates: Sender<AddressUpdate>) -> Self {
        Debouncer {
            geocoder,
            cache: AddressCache::new(),
            window,
            pending: None,
            last_event: Instant::now(),
            cycle: 0,
            in_flight: None,
            updates,
        }
    }

    #[instrument(skip_all, fields(window = ?self.window))]
    async fn run(mut self, mut rx: UnboundedReceiver<GeoPoint>) {
        let (done_tx, mut done_rx) = mpsc::channel::<Lookup>(1);

        loop {
            // Only the check for the latest event is ever armed, older ones are superseded.
            let deadline = self.last_event + self.window;

            tokio::select! {
                event = rx.recv() => match event {
                    Some(point) => self.record(point),
                    None => break,
                },
                _ = sleep_until(deadline), if self.pending.is_some() => self.fire(&done_tx).await,
                Some(lookup) = done_rx.recv() => self.settle(lookup).await,
            }
        }

        self.drain(&done_tx, &mut done_rx).await;
        debug!("⏱️ Debounced address resolution stopped");
    }

    /// Resolves the coordinate still waiting for its quiet period, the last one the owner sent.
    ///
    /// Results of superseded lookups may still sit in `done_rx`, so it keeps
    /// receiving until the lookup of the current cycle has settled.
    async fn drain(&mut self, done_tx: &Sender<Lookup>, done_rx: &mut Receiver<Lookup>) {
        if self.pending.is_some() {
            self.fire(done_tx).await;
        }

        while self.in_flight.is_some() {
            match done_rx.recv().await {
                Some(lookup) => self.settle(lookup).await,
                None => break,
            }
        }
    }

    fn record(&mut self, point: GeoPoint) {
        trace!(%point, "⏱️ Coordinate changed");
        self.pending = Some(point);
        self.last_event = Instant::now();
        self.cycle += 1;
        self.cancel_in_flight();
    }

    async fn fire(&mut self, done_tx: &Sender<Lookup>) {
        let Some(point) = self.pending.take() else {
            return;
        };
        self.cancel_in_flight();

        if let Some(address) = self.cache.lookup(point) {
            debug!(%point, "⏱️ Address served from cache");
            self.publish(AddressUpdate { point, address }).await;
            return;
        }

        debug!(%point, cycle = self.cycle, "⏱️ Quiet period over, looking up address...");
        let geocoder = self.geocoder.clone();
        let done_tx = done_tx.clone();
        let cycle = self.cycle;
        self.in_flight = Some(tokio::spawn(async move {
            let result = geocoder.reverse(point).await;
            let _ = done_tx.send(Lookup { cycle, point, result }).await;
        }));
    }

    async fn settle(&mut self, lookup: Lookup) {
        if lookup.cycle != self.cycle {
            debug!(point = %lookup.point, "⏱️ Dropping address of a superseded coordinate");
            return;
        }

        self.in_flight = None;
        let address = self.cache.settle(lookup.point, lookup.result);
        info!(point = %lookup.point, "⏱️ Looking up address... OK, '{}'", address.text);
        self.publish(AddressUpdate { point: lookup.point, address }).await;
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            if !task.is_finished() {
                debug!("⏱️ Cancelling in-flight address lookup");
            }
            task.abort();
        }
    }

    async fn publish(&self, update: AddressUpdate) {
        if self.updates.send(update).await.is_err() {
            debug!("⏱️ Nobody listens to address updates anymore");
        }
    }
}
