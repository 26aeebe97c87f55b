use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Business counters exposed at `/metrics`.
pub struct ApiMetrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub check_ins: IntCounter,
    /// Labelled by `outcome`: `paid` or `failed`.
    pub checkouts: IntCounterVec,
    pub payment_failures: IntCounter,
    pub room_service_charges: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("hearth".to_string()), None)?;

        let bookings_created = IntCounter::new("bookings_created_total", "Bookings created")?;
        let check_ins = IntCounter::new("check_ins_total", "Guests checked in")?;
        let checkouts = IntCounterVec::new(
            Opts::new("checkouts_total", "Checkout attempts by outcome"),
            &["outcome"],
        )?;
        let payment_failures = IntCounter::new("payment_failures_total", "Checkouts refused by payment")?;
        let room_service_charges = IntCounter::new("room_service_charges_total", "Room-service charges posted")?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(check_ins.clone()))?;
        registry.register(Box::new(checkouts.clone()))?;
        registry.register(Box::new(payment_failures.clone()))?;
        registry.register(Box::new(room_service_charges.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            check_ins,
            checkouts,
            payment_failures,
            room_service_charges,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_prefixed_counters() {
        let metrics = ApiMetrics::new().unwrap();
        metrics.checkouts.with_label_values(&["paid"]).inc();
        metrics.check_ins.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("hearth_checkouts_total{outcome=\"paid\"} 1"));
        assert!(text.contains("hearth_check_ins_total 1"));
    }
}
