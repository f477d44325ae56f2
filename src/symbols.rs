//! Symbol definitions and weight tables

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque symbol identifier
pub type SymbolId = u32;

/// One drawn round: a fixed-length sequence of symbols
pub type Outcome = Vec<SymbolId>;

/// A symbol definition with its draw weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDef {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Symbol name (e.g. "SEVEN", "CITATION")
    pub name: String,
    /// Draw weight (relative, must be >= 1)
    pub weight: u32,
}

impl SymbolDef {
    pub fn new(id: SymbolId, name: impl Into<String>, weight: u32) -> Self {
        Self {
            id,
            name: name.into(),
            weight,
        }
    }
}

/// Immutable weight snapshot for one configuration version.
///
/// Each symbol is drawn with probability `weight / total_weight`. The table
/// is validated once at construction; a constructed table always has a
/// strictly positive total weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightTable {
    config_id: u32,
    version: u64,
    symbols: Vec<SymbolDef>,
    citation_symbol: SymbolId,
    total_weight: u64,
}

impl WeightTable {
    /// Build a validated table. Fails with `InvalidConfiguration` when the
    /// alphabet is empty, a weight is zero, ids repeat, or the citation
    /// symbol is not a member of the alphabet.
    pub fn new(
        config_id: u32,
        version: u64,
        symbols: Vec<SymbolDef>,
        citation_symbol: SymbolId,
    ) -> Result<Self, EngineError> {
        if symbols.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "weight table has no symbols".into(),
            ));
        }
        let mut total: u64 = 0;
        for (i, sym) in symbols.iter().enumerate() {
            if sym.weight == 0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "symbol {} ({}) has zero weight",
                    sym.id, sym.name
                )));
            }
            if symbols[..i].iter().any(|s| s.id == sym.id) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "duplicate symbol id {}",
                    sym.id
                )));
            }
            total += u64::from(sym.weight);
        }
        if !symbols.iter().any(|s| s.id == citation_symbol) {
            return Err(EngineError::InvalidConfiguration(format!(
                "citation symbol {citation_symbol} is not in the alphabet"
            )));
        }

        Ok(Self {
            config_id,
            version,
            symbols,
            citation_symbol,
            total_weight: total,
        })
    }

    /// Stable configuration id (cache keying)
    pub fn config_id(&self) -> u32 {
        self.config_id
    }

    /// Configuration version (bumped on every admin edit)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The full alphabet
    pub fn symbols(&self) -> &[SymbolDef] {
        &self.symbols
    }

    /// The punitive marker symbol
    pub fn citation_symbol(&self) -> SymbolId {
        self.citation_symbol
    }

    /// Sum of all weights (always > 0)
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Alphabet size
    pub fn alphabet_size(&self) -> usize {
        self.symbols.len()
    }

    /// Draw probability of a single symbol (0.0 for unknown ids)
    pub fn probability_of(&self, id: SymbolId) -> f64 {
        self.symbols
            .iter()
            .find(|s| s.id == id)
            .map(|s| f64::from(s.weight) / self.total_weight as f64)
            .unwrap_or(0.0)
    }

    /// Draw one symbol by weighted roll
    pub(crate) fn sample(&self, rng: &mut impl Rng) -> SymbolId {
        let mut roll = rng.random_range(0..self.total_weight);
        for sym in &self.symbols {
            let w = u64::from(sym.weight);
            if roll < w {
                return sym.id;
            }
            roll -= w;
        }
        // roll < total_weight, so the loop always returns
        self.symbols[self.symbols.len() - 1].id
    }
}

/// Default reel icon set used by the portal's slot modes.
///
/// Nine regular icons plus the punitive CITATION marker (id 10).
pub fn standard_icons() -> Vec<SymbolDef> {
    vec![
        SymbolDef::new(1, "SEVEN", 40),
        SymbolDef::new(2, "DIAMOND", 60),
        SymbolDef::new(3, "BELL", 80),
        SymbolDef::new(4, "STAR", 100),
        SymbolDef::new(5, "CHERRY", 120),
        SymbolDef::new(6, "GRAPE", 120),
        SymbolDef::new(7, "LEMON", 140),
        SymbolDef::new(8, "CLOVER", 140),
        SymbolDef::new(9, "COIN", 100),
        SymbolDef::new(10, "CITATION", 100),
    ]
}

/// Citation symbol id within [`standard_icons`]
pub const STANDARD_CITATION: SymbolId = 10;
