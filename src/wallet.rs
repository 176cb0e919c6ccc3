// Wallet, utxo, and transaction-builder state behind the boundary, plus the
// coin-selection capability the C bridge instantiates.

use std::fmt;

/// Coin-selection strategy: picks total input value to fund `target` from
/// candidate utxo values.
/// Constraints: pure function of its inputs; never mutates wallet state.
pub trait CoinSelection: fmt::Debug {
    /// Total value selected; 0 when the candidates cannot cover the target.
    fn select(&self, utxos: &[u64], target: u64) -> u64;

    /// Strategy label. Static by contract: the C bridge hands this out as
    /// borrowed data that is never freed.
    fn name(&self) -> &'static str;
}

/// Default strategy: take the largest candidates first, skipping anything at
/// or below the dust floor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirst {
    pub dust_floor: u64,
}

impl CoinSelection for LargestFirst {
    fn select(&self, utxos: &[u64], target: u64) -> u64 {
        let mut candidates: Vec<u64> = utxos
            .iter()
            .copied()
            .filter(|&v| v > self.dust_floor)
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        let mut total = 0u64;
        for v in candidates {
            if total >= target {
                break;
            }
            total = total.saturating_add(v);
        }
        if total >= target { total } else { 0 }
    }

    fn name(&self) -> &'static str {
        "largest_first"
    }
}

/// Alternate strategy: take candidates in wallet order. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl CoinSelection for OldestFirst {
    fn select(&self, utxos: &[u64], target: u64) -> u64 {
        let mut total = 0u64;
        for &v in utxos {
            if total >= target {
                break;
            }
            total = total.saturating_add(v);
        }
        if total >= target { total } else { 0 }
    }

    fn name(&self) -> &'static str {
        "oldest_first"
    }
}

#[derive(Debug)]
pub struct Wallet {
    name: String,
    utxos: Vec<u64>,
}

impl Wallet {
    pub fn new(name: &str) -> Self {
        Wallet {
            name: name.to_string(),
            utxos: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_utxo(&mut self, value: u64) {
        self.utxos.push(value);
    }

    pub fn utxos(&self) -> &[u64] {
        &self.utxos
    }

    pub fn utxo_count(&self) -> usize {
        self.utxos.len()
    }
}

/// A single tracked output: spendable value plus the keychain slot it was
/// derived from.
#[derive(Debug)]
pub struct LocalUtxo {
    // Boxed so the pointer handed across the boundary stays valid if the
    // utxo itself is moved.
    value: Box<u64>,
    keychain: u32,
}

impl LocalUtxo {
    pub fn new(value: u64, keychain: u32) -> Self {
        LocalUtxo {
            value: Box::new(value),
            keychain,
        }
    }

    pub fn value(&self) -> u64 {
        *self.value
    }

    pub fn value_mut(&mut self) -> &mut u64 {
        &mut self.value
    }

    /// Replaces the value allocation; the previous one is released here,
    /// exactly once.
    pub fn replace_value(&mut self, value: u64) {
        self.value = Box::new(value);
    }

    pub fn keychain(&self) -> u32 {
        self.keychain
    }
}

#[derive(Debug)]
pub struct TxBuilder {
    // Candidate snapshot taken when the builder was derived from a wallet.
    utxos: Vec<u64>,
    target: u64,
    rbf: bool,
    selector: Box<dyn CoinSelection>,
}

impl TxBuilder {
    pub fn new(wallet: &Wallet) -> Self {
        TxBuilder {
            utxos: wallet.utxos().to_vec(),
            target: 0,
            rbf: false,
            selector: Box::new(LargestFirst::default()),
        }
    }

    pub fn enable_rbf(&mut self) -> &mut Self {
        self.rbf = true;
        self
    }

    pub fn disable_rbf(&mut self) -> &mut Self {
        self.rbf = false;
        self
    }

    pub fn rbf(&self) -> bool {
        self.rbf
    }

    pub fn set_target(&mut self, target: u64) -> &mut Self {
        self.target = target;
        self
    }

    pub fn set_selector(&mut self, selector: Box<dyn CoinSelection>) -> &mut Self {
        self.selector = selector;
        self
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    /// Run selection over the candidate snapshot.
    pub fn finish(&self) -> u64 {
        self.selector.select(&self.utxos, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_first_prefers_big_coins() {
        let sel = LargestFirst { dust_floor: 0 };
        assert_eq!(sel.select(&[100, 700, 300], 800), 1000);
        assert_eq!(sel.select(&[100, 700, 300], 700), 700);
        assert_eq!(sel.select(&[100, 200], 1000), 0, "insufficient funds");
    }

    #[test]
    fn largest_first_skips_dust() {
        let sel = LargestFirst { dust_floor: 100 };
        assert_eq!(sel.select(&[100, 700, 300], 900), 1000);
        assert_eq!(sel.select(&[100, 100, 100], 50), 0, "all candidates are dust");
    }

    #[test]
    fn oldest_first_keeps_wallet_order() {
        let sel = OldestFirst;
        assert_eq!(sel.select(&[100, 700, 300], 150), 800);
        assert_eq!(sel.select(&[], 1), 0);
        assert_eq!(sel.select(&[5], 0), 0, "zero target selects nothing");
    }

    #[test]
    fn builder_snapshots_wallet_and_dispatches() {
        let mut wallet = Wallet::new("test");
        wallet.add_utxo(700);
        wallet.add_utxo(300);

        let mut builder = TxBuilder::new(&wallet);
        builder.set_target(800);
        assert_eq!(builder.finish(), 1000);
        assert_eq!(builder.selector_name(), "largest_first");

        builder.set_selector(Box::new(OldestFirst));
        assert_eq!(builder.finish(), 1000);
        assert_eq!(builder.selector_name(), "oldest_first");

        // Utxos added after derivation are not part of the snapshot.
        wallet.add_utxo(10_000);
        assert_eq!(wallet.utxo_count(), 3);
        assert_eq!(builder.finish(), 1000);
    }

    #[test]
    fn utxo_value_replacement_keeps_keychain() {
        let mut utxo = LocalUtxo::new(10, 42);
        assert_eq!(utxo.value(), 10);
        *utxo.value_mut() *= 5;
        assert_eq!(utxo.value(), 50);
        utxo.replace_value(1000);
        assert_eq!(utxo.value(), 1000);
        assert_eq!(utxo.keychain(), 42);
    }
}
