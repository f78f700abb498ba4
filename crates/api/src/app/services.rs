use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use forgeroute_events::{EventBus, EventEnvelope, InMemoryEventBus};
use forgeroute_infra::RoutingConfig;
use forgeroute_infra::event_bus::{BusStockAlertSink, BusTransitionSink};
use forgeroute_infra::geocoding::NominatimGeocoder;
use forgeroute_infra::postgres::{self, PostgresInventoryLedger, PostgresOrderStore, PostgresSellerDirectory};
use forgeroute_inventory::{InMemoryInventoryLedger, InventoryLedger, StockAlertSink};
use forgeroute_routing::{
    Geocoder, InMemoryOrderStore, InMemorySellerDirectory, NoopGeocoder, OrderStore, RoutingEngine, RoutingSettings,
    SellerDirectory,
};

type EnvelopeBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Everything the HTTP handlers need, shared behind an `Arc`.
///
/// The engine, seller directory and ledger are the same instances the
/// expiry sweeper works against.
#[derive(Clone)]
pub struct AppServices {
    engine: Arc<RoutingEngine>,
    sellers: Arc<dyn SellerDirectory>,
    ledger: Arc<dyn InventoryLedger>,
    realtime_tx: broadcast::Sender<EventEnvelope<JsonValue>>,
}

impl AppServices {
    pub fn engine(&self) -> Arc<RoutingEngine> {
        self.engine.clone()
    }

    pub fn sellers(&self) -> Arc<dyn SellerDirectory> {
        self.sellers.clone()
    }

    pub fn ledger(&self) -> Arc<dyn InventoryLedger> {
        self.ledger.clone()
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<EventEnvelope<JsonValue>> {
        &self.realtime_tx
    }

    /// In-memory wiring (dev/test). Must be called inside a tokio runtime.
    pub fn in_memory(settings: RoutingSettings, geocoder: Arc<dyn Geocoder>) -> Self {
        let (bus, realtime_tx) = event_bus();
        let alerts: Arc<dyn StockAlertSink> = Arc::new(BusStockAlertSink::new(bus.clone()));

        let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
        let sellers: Arc<dyn SellerDirectory> = Arc::new(InMemorySellerDirectory::new());
        let ledger: Arc<dyn InventoryLedger> = Arc::new(InMemoryInventoryLedger::with_alert_sink(alerts));

        Self::wire(orders, sellers, ledger, settings, geocoder, bus, realtime_tx)
    }

    fn wire(
        orders: Arc<dyn OrderStore>,
        sellers: Arc<dyn SellerDirectory>,
        ledger: Arc<dyn InventoryLedger>,
        settings: RoutingSettings,
        geocoder: Arc<dyn Geocoder>,
        bus: Arc<EnvelopeBus>,
        realtime_tx: broadcast::Sender<EventEnvelope<JsonValue>>,
    ) -> Self {
        let engine = RoutingEngine::new(orders, sellers.clone(), ledger.clone(), settings)
            .with_geocoder(geocoder)
            .with_transition_sink(Arc::new(BusTransitionSink::new(bus)));

        Self {
            engine: Arc::new(engine),
            sellers,
            ledger,
            realtime_tx,
        }
    }
}

/// Build services from configuration: Postgres-backed when
/// `use_persistent_stores` is set, in-memory otherwise.
pub async fn build_services(config: &RoutingConfig) -> anyhow::Result<AppServices> {
    let settings = config.routing_settings();
    let geocoder: Arc<dyn Geocoder> = if config.geocoder.url.is_empty() {
        Arc::new(NoopGeocoder)
    } else {
        Arc::new(NominatimGeocoder::new(config.geocoder.clone()))
    };

    if !config.use_persistent_stores {
        tracing::info!("using in-memory stores");
        return Ok(AppServices::in_memory(settings, geocoder));
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let pool = postgres::connect(database_url).await?;
    let runtime = tokio::runtime::Handle::current();
    tracing::info!("using Postgres stores");

    let (bus, realtime_tx) = event_bus();
    let alerts: Arc<dyn StockAlertSink> = Arc::new(BusStockAlertSink::new(bus.clone()));
    let orders: Arc<dyn OrderStore> = Arc::new(PostgresOrderStore::new(pool.clone(), runtime.clone()));
    let sellers: Arc<dyn SellerDirectory> = Arc::new(PostgresSellerDirectory::new(pool.clone(), runtime.clone()));
    let ledger: Arc<dyn InventoryLedger> =
        Arc::new(PostgresInventoryLedger::new(pool, runtime).with_alert_sink(alerts));

    Ok(AppServices::wire(orders, sellers, ledger, settings, geocoder, bus, realtime_tx))
}

/// In-memory bus plus a background forwarder onto the SSE broadcast channel.
fn event_bus() -> (Arc<EnvelopeBus>, broadcast::Sender<EventEnvelope<JsonValue>>) {
    let bus: Arc<EnvelopeBus> = Arc::new(InMemoryEventBus::new());
    let (realtime_tx, _realtime_rx) = broadcast::channel::<EventEnvelope<JsonValue>>(256);

    let sub = bus.subscribe();
    let tx = realtime_tx.clone();
    tokio::task::spawn_blocking(move || {
        while let Ok(envelope) = sub.recv() {
            // Lossy: no subscribers is fine.
            let _ = tx.send(envelope);
        }
    });

    (bus, realtime_tx)
}

/// Server-sent events for every published envelope.
pub fn transition_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(envelope) => {
            let data = serde_json::json!({
                "event_id": envelope.event_id().to_string(),
                "aggregate_id": envelope.aggregate_id().to_string(),
                "aggregate_type": envelope.aggregate_type(),
                "sequence_number": envelope.sequence_number(),
                "occurred_at": envelope.occurred_at(),
                "payload": envelope.payload(),
            });
            Some(Ok(SseEvent::default()
                .event(envelope.event_type().to_string())
                .data(data.to_string())))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
