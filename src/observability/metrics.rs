use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub delivery_quotes_total: IntCounterVec,
    pub quote_latency_seconds: HistogramVec,
    pub courier_assignments_total: IntCounterVec,
    pub active_routes: IntGauge,
    pub busy_couriers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let delivery_quotes_total = IntCounterVec::new(
            Opts::new("delivery_quotes_total", "Delivery quotes by outcome"),
            &["outcome"],
        )
        .expect("valid delivery_quotes_total metric");

        let quote_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "quote_latency_seconds",
                "Latency of geocode, zone resolution and pricing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid quote_latency_seconds metric");

        let courier_assignments_total = IntCounterVec::new(
            Opts::new("courier_assignments_total", "Courier assignments by outcome"),
            &["outcome"],
        )
        .expect("valid courier_assignments_total metric");

        let active_routes = IntGauge::new(
            "active_routes",
            "Routes that are pending, assigned or in progress",
        )
        .expect("valid active_routes metric");

        let busy_couriers = IntGauge::new("busy_couriers", "Couriers currently holding a route")
            .expect("valid busy_couriers metric");

        registry
            .register(Box::new(delivery_quotes_total.clone()))
            .expect("register delivery_quotes_total");
        registry
            .register(Box::new(quote_latency_seconds.clone()))
            .expect("register quote_latency_seconds");
        registry
            .register(Box::new(courier_assignments_total.clone()))
            .expect("register courier_assignments_total");
        registry
            .register(Box::new(active_routes.clone()))
            .expect("register active_routes");
        registry
            .register(Box::new(busy_couriers.clone()))
            .expect("register busy_couriers");

        Self {
            registry,
            delivery_quotes_total,
            quote_latency_seconds,
            courier_assignments_total,
            active_routes,
            busy_couriers,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
