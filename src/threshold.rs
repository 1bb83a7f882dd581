//! Threshold resolution and failure flagging.
//!
//! Override precedence is simple: a per-entity value wins over the global
//! default, and the whole-project override wins over the global default for
//! the totals row. An entity fails when either axis falls strictly below
//! its effective threshold.

use crate::aggregate::Counter;
use crate::config::{Config, Overrides};
use crate::model::{Entity, TotalAxis, Totals};

/// Apply effective thresholds to every entity; returns whether any failed.
pub fn evaluate<E: Entity>(
    entities: &mut [E],
    overrides: &Overrides,
    statement_default: f64,
    block_default: f64,
) -> bool {
    let mut any_failed = false;
    for entity in entities.iter_mut() {
        let statements = overrides
            .statements
            .get(entity.name())
            .copied()
            .unwrap_or(statement_default);
        let blocks = overrides
            .blocks
            .get(entity.name())
            .copied()
            .unwrap_or(block_default);
        entity.apply_thresholds(statements, blocks);
        any_failed |= entity.failed();
    }
    any_failed
}

/// Build the whole-project totals row, with the `total` overrides falling
/// back to the global thresholds.
pub fn evaluate_totals(statements: Counter, blocks: Counter, config: &Config) -> Totals {
    let statement_threshold = config.total.statements.unwrap_or(config.statement_threshold);
    let block_threshold = config.total.blocks.unwrap_or(config.block_threshold);
    Totals {
        statements: TotalAxis::new(statements, statement_threshold),
        blocks: TotalAxis::new(blocks, block_threshold),
    }
}
