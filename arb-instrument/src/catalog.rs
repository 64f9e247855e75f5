use crate::coin::{Coin, CoinId};
use crate::exchange::ExchangeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chains that are never admitted into a [`Catalog`], regardless of what an exchange reports.
///
/// `ETH`/`ERC20` are excluded because ERC20 withdrawal fees are volatile enough to make any
/// cached fee stale within minutes; `Aptos` is excluded because none of the connected
/// exchanges support withdrawal tag validation for it yet.
pub const BLACKLISTED_CHAINS: &[&str] = &["aptos", "eth", "erc20"];

pub fn is_blacklisted_chain(network: &str) -> bool {
    let lower = network.to_ascii_lowercase();
    BLACKLISTED_CHAINS.contains(&lower.as_str())
}

/// One exchange's coin catalog: every withdrawable `(ticker, network)` variant, indexed by
/// the stable [`CoinId`] the [`crate::catalog`] ingestion process assigned to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    name_to_id: HashMap<String, CoinId>,
    coins_by_id: HashMap<CoinId, Vec<Coin>>,
    address_index: HashMap<String, (String, String)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: CoinId, coin: Coin) {
        let name = name.into();
        if !coin.address.is_empty() {
            self.address_index
                .insert(coin.address.clone(), (name.clone(), coin.network.clone()));
        }
        self.name_to_id.insert(name, id);
        self.coins_by_id.entry(id).or_default().push(coin);
    }

    pub fn id_for_name(&self, name: &str) -> Option<CoinId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_for_id(&self, id: CoinId) -> Option<&str> {
        self.name_to_id
            .iter()
            .find(|&(_, &candidate)| candidate == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn variants(&self, id: CoinId) -> &[Coin] {
        self.coins_by_id.get(&id).map_or(&[], |v| v.as_slice())
    }

    pub fn ids(&self) -> impl Iterator<Item = CoinId> + '_ {
        self.coins_by_id.keys().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.name_to_id.keys().map(String::as_str)
    }

    pub fn lookup_by_address(&self, address: &str) -> Option<&(String, String)> {
        self.address_index.get(address)
    }

    pub fn len(&self) -> usize {
        self.coins_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins_by_id.is_empty()
    }
}

/// Intersect two sets of `Coin` variants by address, returning pairs grouped by the shared
/// address. Iteration is biased towards `first`'s order so that, given equal fees, the
/// departure exchange's own variant is the one later selected as the cheapest.
pub fn intersect_by_address<'a>(
    first: &'a [Coin],
    second: &'a [Coin],
) -> Vec<(&'a Coin, &'a Coin)> {
    let mut out = Vec::new();
    for a in first {
        if let Some(b) = second.iter().find(|b| b.address == a.address) {
            out.push((a, b));
        }
    }
    out
}

/// `(departure, destination, coin_id) -> cheapest Coin variant reachable on both exchanges`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestTransferTable {
    table: HashMap<(ExchangeId, ExchangeId, CoinId), Coin>,
}

impl BestTransferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        departure: ExchangeId,
        destination: ExchangeId,
        coin_id: CoinId,
        coin: Coin,
    ) {
        self.table.insert((departure, destination, coin_id), coin);
    }

    pub fn get(
        &self,
        departure: ExchangeId,
        destination: ExchangeId,
        coin_id: CoinId,
    ) -> Option<&Coin> {
        self.table.get(&(departure, destination, coin_id))
    }

    /// Build the table for every ordered exchange pair from their catalogs, taking the
    /// cheapest of each pair of same-address variants (departure's variant wins ties).
    pub fn build(catalogs: &[(ExchangeId, &Catalog)]) -> Self {
        let mut table = Self::new();

        for &(departure_id, departure) in catalogs {
            for &(destination_id, destination) in catalogs {
                if departure_id == destination_id {
                    continue;
                }

                for coin_id in departure.ids() {
                    let departure_variants = departure.variants(coin_id);
                    let destination_variants = destination.variants(coin_id);
                    if destination_variants.is_empty() {
                        continue;
                    }

                    let cheapest = intersect_by_address(departure_variants, destination_variants)
                        .into_iter()
                        .min_by(|(a, _), (b, _)| a.cmp(b));

                    if let Some((departure_coin, _destination_coin)) = cheapest {
                        table.insert(
                            departure_id,
                            destination_id,
                            coin_id,
                            departure_coin.clone(),
                        );
                    }
                }
            }
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;

    fn c(address: &str, fee: f64) -> Coin {
        Coin::try_new(address, "USDC", "polygon", fee, 1.0).unwrap()
    }

    #[test]
    fn blacklists_known_chains_case_insensitively() {
        assert!(is_blacklisted_chain("ERC20"));
        assert!(is_blacklisted_chain("eth"));
        assert!(is_blacklisted_chain("Aptos"));
        assert!(!is_blacklisted_chain("polygon"));
    }

    #[test]
    fn best_transfer_picks_cheapest_shared_variant() {
        let id = CoinId(1);
        let mut okx = Catalog::new();
        okx.insert("USDC", id, c("0xabc", 0.5));
        okx.insert("USDC", id, c("0xdef", 0.2));

        let mut bitget = Catalog::new();
        bitget.insert("USDC", id, c("0xabc", 1.0));
        bitget.insert("USDC", id, c("0xdef", 0.2));

        let table = BestTransferTable::build(&[
            (ExchangeId::Okx, &okx),
            (ExchangeId::Bitget, &bitget),
        ]);

        let best = table.get(ExchangeId::Okx, ExchangeId::Bitget, id).unwrap();
        assert_eq!(best.address, "0xdef");
    }

    #[test]
    fn no_shared_address_yields_no_entry() {
        let id = CoinId(1);
        let mut a = Catalog::new();
        a.insert("USDC", id, c("0x1", 0.5));
        let mut b = Catalog::new();
        b.insert("USDC", id, c("0x2", 0.5));

        let table = BestTransferTable::build(&[(ExchangeId::Okx, &a), (ExchangeId::Bitget, &b)]);
        assert!(table.get(ExchangeId::Okx, ExchangeId::Bitget, id).is_none());
    }
}
