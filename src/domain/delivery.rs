//! Delivery date estimation.
//!
//! An order ships within a lead time of 5 to 7 business days. Weekends are
//! skipped when counting, so the estimate always lands on a weekday.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::Rng;

pub const MIN_LEAD_DAYS: u32 = 5;
pub const MAX_LEAD_DAYS: u32 = 7;

/// Source of the business-day lead time for a new order.
pub trait LeadTime: Send + Sync {
    fn business_days(&self) -> u32;
}

/// Uniformly random lead time in `MIN_LEAD_DAYS..=MAX_LEAD_DAYS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLeadTime;

impl LeadTime for RandomLeadTime {
    fn business_days(&self) -> u32 {
        rand::thread_rng().gen_range(MIN_LEAD_DAYS..=MAX_LEAD_DAYS)
    }
}

/// Constant lead time, for tests and predictable environments.
#[derive(Debug, Clone, Copy)]
pub struct FixedLeadTime(pub u32);

impl LeadTime for FixedLeadTime {
    fn business_days(&self) -> u32 {
        self.0
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advances day by day from `order_date`, counting only weekdays, until
/// `business_days` have been counted.
pub fn add_business_days(order_date: NaiveDate, business_days: u32) -> NaiveDate {
    let mut date = order_date;
    let mut counted = 0;
    while counted < business_days {
        date = date + Days::new(1);
        if !is_weekend(date) {
            counted += 1;
        }
    }
    date
}

pub struct DeliveryEstimator {
    lead_time: Box<dyn LeadTime>,
}

impl DeliveryEstimator {
    pub fn new(lead_time: impl LeadTime + 'static) -> Self {
        Self {
            lead_time: Box::new(lead_time),
        }
    }

    pub fn estimate(&self, order_date: NaiveDate) -> NaiveDate {
        add_business_days(order_date, self.lead_time.business_days())
    }
}

impl Default for DeliveryEstimator {
    fn default() -> Self {
        Self::new(RandomLeadTime)
    }
}
