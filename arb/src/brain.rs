//! Turns one exchange's balance update into a recommended trade, transfer or wait.
//!
//! Grounded on `original_source/core/services/Analytics/Brain.py`: the same three-way dispatch
//! on whether the asset is USDT, a tracked coin, or unknown, and the same profit-vs-fee
//! arithmetic in each branch (kept intact even where the USDT branch's self-transfer fee lookup
//! looks redundant - it mirrors the source exactly).

use arb_instrument::{CoinId, ExchangeId};
use tracing::{info, warn};

use crate::dto::{Asset, Recommendation};
use crate::mapper::Mapper;

/// Slippage/cost cushion subtracted from every profit check, matching the original's default.
pub const DEFAULT_ADDITIVE: f64 = 2.0;

pub struct Brain<'a> {
    mapper: &'a Mapper,
    additive: f64,
}

impl<'a> Brain<'a> {
    pub fn new(mapper: &'a Mapper, additive: f64) -> Self {
        Self { mapper, additive }
    }

    pub fn analyse(
        &self,
        analyst: &crate::analyst::Analyst,
        exchange: ExchangeId,
        asset: Asset,
    ) -> Recommendation {
        match self.mapper.usdt() {
            Ok(usdt) if asset.coin_id == usdt => self.usdt_analyse(analyst, exchange, asset),
            _ if self.mapper.analyzed_coins().contains(&asset.coin_id) => {
                self.other_analyse(analyst, exchange, asset)
            }
            _ => {
                warn!(coin_id = ?asset.coin_id, "coin not found in coin list");
                Recommendation::Trade {
                    sell_coin: asset.coin_id,
                    buy_coin: self.mapper.usdt().unwrap_or(asset.coin_id),
                }
            }
        }
    }

    fn usdt_analyse(
        &self,
        analyst: &crate::analyst::Analyst,
        exchange: ExchangeId,
        asset: Asset,
    ) -> Recommendation {
        let Some(deal) = analyst.best_deal() else {
            info!("no deals available");
            return Recommendation::Wait { seconds: 10 };
        };

        let coin_id = asset.coin_id;

        let Some(deal_fee) = self.mapper.fee(&deal, None) else {
            info!(coin_id = ?deal.coin_id, "coin not found in commission list for deal");
            return Recommendation::Wait { seconds: 10 };
        };

        if exchange == deal.departure {
            let Some(usdt_fee) = self
                .mapper
                .best_coin_transfer(exchange, deal.departure, coin_id)
                .and_then(arb_instrument::Coin::known_fee)
            else {
                info!(?coin_id, "coin not found in commission list for usdt transfer");
                return Recommendation::Wait { seconds: 10 };
            };

            let profit = (asset.amount - usdt_fee) * (1.0 + deal.benefit) - self.additive;
            if profit >= deal_fee {
                return Recommendation::Transfer {
                    coin_id,
                    departure: exchange,
                    destination: deal.destination,
                };
            }
        } else {
            let profit = asset.amount * (1.0 + deal.benefit) - self.additive;
            if profit >= deal_fee {
                return Recommendation::Trade {
                    buy_coin: deal.coin_id,
                    sell_coin: coin_id,
                };
            }
        }

        Recommendation::Wait { seconds: 10 }
    }

    fn other_analyse(
        &self,
        analyst: &crate::analyst::Analyst,
        current_exchange: ExchangeId,
        asset: Asset,
    ) -> Recommendation {
        let sell = || Recommendation::Trade {
            buy_coin: self.mapper.usdt().unwrap_or(asset.coin_id),
            sell_coin: asset.coin_id,
        };

        let Some(deal) = analyst.all_benefits(current_exchange, asset.coin_id) else {
            info!("no deals available");
            return sell();
        };

        let Some(deal_fee) = self.mapper.fee(&deal, None) else {
            info!(coin_id = ?asset.coin_id, "coin not found in commission list");
            return sell();
        };

        let profit = asset.amount * (1.0 + deal.benefit) - self.additive;
        if profit >= deal_fee {
            return Recommendation::Transfer {
                coin_id: asset.coin_id,
                departure: current_exchange,
                destination: deal.destination,
            };
        }

        sell()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyst::{Analyst, AnalystConfig};
    use arb_instrument::Coin;
    use std::collections::HashMap;

    fn coin(address: &str, fee: f64) -> Coin {
        Coin::try_new(address, "USDC", "polygon", fee, 1.0).unwrap()
    }

    fn mapper_with_usdt_and_coin() -> Mapper {
        let mut mapper = Mapper::new();
        let mut okx = HashMap::new();
        okx.insert("USDT".to_string(), vec![coin("0xusdt", 0.5)]);
        okx.insert("COIN".to_string(), vec![coin("0xcoin", 0.3)]);
        mapper.ingest(ExchangeId::Okx, okx);

        let mut bitget = HashMap::new();
        bitget.insert("COIN".to_string(), vec![coin("0xcoin", 0.3)]);
        mapper.ingest(ExchangeId::Bitget, bitget);

        mapper.build_best_transfer();
        mapper
    }

    #[test]
    fn unknown_coin_recommends_selling_to_usdt() {
        let mapper = Mapper::new();
        let brain = Brain::new(&mapper, 2.0);
        let analyst = Analyst::new(AnalystConfig::default());
        let asset = Asset::new(CoinId(999), 100.0);

        let recommendation = brain.analyse(&analyst, ExchangeId::Okx, asset);
        assert!(matches!(recommendation, Recommendation::Trade { .. }));
    }

    #[test]
    fn no_deal_waits() {
        let mapper = mapper_with_usdt_and_coin();
        let usdt = mapper.usdt().unwrap();
        let brain = Brain::new(&mapper, 2.0);
        let analyst = Analyst::new(AnalystConfig::default());

        let recommendation = brain.analyse(&analyst, ExchangeId::Okx, Asset::new(usdt, 100.0));
        assert_eq!(recommendation, Recommendation::Wait { seconds: 10 });
    }
}
