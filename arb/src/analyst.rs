//! Maintains the live price grid and a sorted index of the best cross-exchange route per coin.
//!
//! Grounded on `original_source/core/services/Analytics/Analyst.py`: per-coin locking around
//! every grid mutation and recompute, the same buy-cheapest/sell-best-benefit recompute, and
//! the same ROI formula. The sorted index is the twin `BTreeMap`/`HashMap` structure design
//! note §9 calls for in place of the source's `ValueSortedDict`.

use arb_data::subscriber::PriceSubscriber;
use arb_instrument::{CoinId, ExchangeId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::error;

use crate::dto::Deal;

#[derive(Debug, Clone, Copy)]
pub struct AnalystConfig {
    /// Fixed cost-of-time divisor applied to ROI to produce `benefit`. An original-source
    /// constant, not presently configurable upstream of this struct.
    pub procedure_time: f64,
    pub buy_commission: f64,
    pub sell_commission: f64,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            procedure_time: 1.0,
            buy_commission: 0.01,
            sell_commission: 0.01,
        }
    }
}

/// Total ordering wrapper over `f64` benefit values so they can key a `BTreeMap`. Benefits are
/// never `NaN` in practice (guarded in `recompute`), so `partial_cmp` is safe to unwrap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedBenefit(f64);

impl Eq for OrderedBenefit {}
impl PartialOrd for OrderedBenefit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedBenefit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

struct SortedIndex {
    by_benefit: BTreeMap<(OrderedBenefit, CoinId), (ExchangeId, ExchangeId)>,
    by_coin: HashMap<CoinId, OrderedBenefit>,
}

impl SortedIndex {
    fn new() -> Self {
        Self {
            by_benefit: BTreeMap::new(),
            by_coin: HashMap::new(),
        }
    }

    fn upsert(&mut self, coin_id: CoinId, departure: ExchangeId, destination: ExchangeId, benefit: f64) {
        self.remove(coin_id);
        let key = OrderedBenefit(benefit);
        self.by_coin.insert(coin_id, key);
        self.by_benefit.insert((key, coin_id), (departure, destination));
    }

    fn remove(&mut self, coin_id: CoinId) {
        if let Some(old) = self.by_coin.remove(&coin_id) {
            self.by_benefit.remove(&(old, coin_id));
        }
    }

    fn peek_best(&self) -> Option<(CoinId, ExchangeId, ExchangeId, f64)> {
        self.by_benefit
            .iter()
            .next_back()
            .map(|(&(benefit, coin_id), &(departure, destination))| {
                (coin_id, departure, destination, benefit.0)
            })
    }
}

/// Per-coin lock guarding both the price grid entry and the sorted index entry for that coin,
/// so a recompute always observes a consistent read of everything it needs.
struct CoinState {
    prices: HashMap<ExchangeId, f64>,
}

pub struct Analyst {
    config: AnalystConfig,
    locks: Mutex<HashMap<CoinId, Arc<Mutex<CoinState>>>>,
    sorted: Mutex<SortedIndex>,
}

impl Analyst {
    pub fn config(&self) -> AnalystConfig {
        self.config
    }

    pub fn new(config: AnalystConfig) -> Self {
        Self {
            config,
            locks: Mutex::new(HashMap::new()),
            sorted: Mutex::new(SortedIndex::new()),
        }
    }

    fn coin_lock(&self, coin_id: CoinId) -> Arc<Mutex<CoinState>> {
        self.locks
            .lock()
            .entry(coin_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(CoinState {
                    prices: HashMap::new(),
                }))
            })
            .clone()
    }

    /// Applies one price update and recomputes that coin's best route. `price <= 0` removes
    /// `exchange` from the grid instead of recording it.
    pub fn on_price_update(&self, exchange: ExchangeId, coin_id: CoinId, price: f64) {
        let lock = self.coin_lock(coin_id);
        let mut state = lock.lock();

        if price > 0.0 {
            state.prices.insert(exchange, price);
        } else {
            state.prices.remove(&exchange);
        }

        self.recompute(coin_id, &state.prices);
    }

    fn recompute(&self, coin_id: CoinId, prices: &HashMap<ExchangeId, f64>) {
        let mut sorted = self.sorted.lock();

        if prices.len() < 2 {
            sorted.remove(coin_id);
            return;
        }

        let buy_exchange = match prices.iter().min_by(|a, b| a.1.total_cmp(b.1)) {
            Some((&exchange, _)) => exchange,
            None => {
                sorted.remove(coin_id);
                return;
            }
        };
        let buy_price = prices[&buy_exchange];

        let mut best: Option<(ExchangeId, f64)> = None;
        for (&exchange, &sell_price) in prices {
            if exchange == buy_exchange {
                continue;
            }
            let Some(benefit) = self.benefit(buy_price, sell_price) else {
                continue;
            };
            if best.map_or(true, |(_, current)| benefit >= current) {
                best = Some((exchange, benefit));
            }
        }

        match best {
            Some((sell_exchange, benefit)) => {
                sorted.upsert(coin_id, buy_exchange, sell_exchange, benefit);
            }
            None => {
                error!(?coin_id, "could not determine a sell exchange");
                sorted.remove(coin_id);
            }
        }
    }

    fn roi(&self, buy_price: f64, sell_price: f64) -> Option<f64> {
        if buy_price == 0.0 {
            return None;
        }
        let roi = (sell_price * (1.0 - self.config.sell_commission) * (1.0 - self.config.buy_commission)
            / buy_price)
            - 1.0;
        Some(roi)
    }

    /// `roi / procedure_time`, or `None` if `procedure_time` is non-positive (treated as "no
    /// value", never infinity).
    fn benefit(&self, buy_price: f64, sell_price: f64) -> Option<f64> {
        if self.config.procedure_time <= 0.0 {
            return None;
        }
        self.roi(buy_price, sell_price)
            .map(|roi| roi / self.config.procedure_time)
    }

    /// The globally best deal across every tracked coin, or `None` if nothing is tracked.
    pub fn best_deal(&self) -> Option<Deal> {
        self.sorted
            .lock()
            .peek_best()
            .map(|(coin_id, departure, destination, benefit)| Deal {
                coin_id,
                departure,
                destination,
                benefit,
            })
    }

    /// Holding `buy_exchange` fixed, the best seller for `coin_id` - used when the asking
    /// exchange isn't the departure of the global best deal.
    pub fn all_benefits(&self, buy_exchange: ExchangeId, coin_id: CoinId) -> Option<Deal> {
        let lock = self.coin_lock(coin_id);
        let state = lock.lock();
        let buy_price = *state.prices.get(&buy_exchange)?;

        let mut best: Option<(ExchangeId, f64)> = None;
        for (&exchange, &sell_price) in &state.prices {
            if exchange == buy_exchange {
                continue;
            }
            let Some(benefit) = self.benefit(buy_price, sell_price) else {
                continue;
            };
            if best.map_or(true, |(_, current)| benefit >= current) {
                best = Some((exchange, benefit));
            }
        }

        best.map(|(destination, benefit)| Deal {
            coin_id,
            departure: buy_exchange,
            destination,
            benefit,
        })
    }
}

#[async_trait]
impl PriceSubscriber for Analyst {
    async fn on_price_update(&self, exchange: ExchangeId, coin_id: CoinId, price: f64) {
        Analyst::on_price_update(self, exchange, coin_id, price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_two_exchanges_stays_out_of_the_sorted_index() {
        let analyst = Analyst::new(AnalystConfig::default());
        analyst.on_price_update(ExchangeId::Okx, CoinId(1), 10.0);
        assert!(analyst.best_deal().is_none());
    }

    #[test]
    fn best_deal_picks_cheapest_buy_and_best_benefit_sell() {
        let analyst = Analyst::new(AnalystConfig::default());
        analyst.on_price_update(ExchangeId::Okx, CoinId(1), 10.0);
        analyst.on_price_update(ExchangeId::Bitget, CoinId(1), 12.0);

        let deal = analyst.best_deal().unwrap();
        assert_eq!(deal.departure, ExchangeId::Okx);
        assert_eq!(deal.destination, ExchangeId::Bitget);
    }

    #[test]
    fn non_positive_price_removes_the_exchange() {
        let analyst = Analyst::new(AnalystConfig::default());
        analyst.on_price_update(ExchangeId::Okx, CoinId(1), 10.0);
        analyst.on_price_update(ExchangeId::Bitget, CoinId(1), 12.0);
        analyst.on_price_update(ExchangeId::Bitget, CoinId(1), 0.0);
        assert!(analyst.best_deal().is_none());
    }

    #[test]
    fn zero_procedure_time_yields_no_value_never_infinity() {
        let analyst = Analyst::new(AnalystConfig {
            procedure_time: 0.0,
            ..Default::default()
        });
        assert_eq!(analyst.benefit(10.0, 12.0), None);
    }
}
