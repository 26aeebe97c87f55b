use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-hotel billing rules handed to the services at construction.
#[derive(Debug, Clone)]
pub struct HotelSettings {
    pub default_tax_rate: Decimal,
    pub tax_rates: HashMap<Uuid, Decimal>,
    pub currency: String,
    pub overbooking_horizon_days: u32,
}

impl Default for HotelSettings {
    fn default() -> Self {
        Self {
            default_tax_rate: Decimal::new(10, 2),
            tax_rates: HashMap::new(),
            currency: "USD".to_string(),
            overbooking_horizon_days: 14,
        }
    }
}

impl HotelSettings {
    pub fn tax_rate_for(&self, hotel_id: Uuid) -> Decimal {
        self.tax_rates
            .get(&hotel_id)
            .copied()
            .unwrap_or(self.default_tax_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_over_default() {
        let hotel = Uuid::new_v4();
        let mut settings = HotelSettings::default();
        settings.tax_rates.insert(hotel, Decimal::new(125, 3));

        assert_eq!(settings.tax_rate_for(hotel), Decimal::new(125, 3));
        assert_eq!(settings.tax_rate_for(Uuid::new_v4()), Decimal::new(10, 2));
    }
}
